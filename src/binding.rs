//! Struct validation for request handlers.
//!
//! The engine never validates anything by itself; handlers call [`validate_struct`] or [`validate_slice`] on
//! the values they decoded from the request and turn a [`ValidationError`] into whatever response they like.
//! Rules are declared with [`garde`]'s derive macro.
//!
//! ```
//! use garde::Validate;
//!
//! #[derive(Validate)]
//! struct NewUser {
//!     #[garde(length(min = 1))]
//!     name: String,
//! }
//!
//! let users = vec![NewUser { name: "alice".into() }, NewUser { name: String::new() }];
//! let err = grove::binding::validate_slice(&users).unwrap_err();
//! assert!(err.to_string().starts_with("[1]: "));
//! ```

use garde::{Report, Validate};
use std::fmt;

/// Validation failure returned to handlers.
#[derive(Debug)]
pub enum ValidationError {
    /// A single value broke one or more rules.
    Struct(Report),
    /// One or more elements of a sequence failed.
    Slice(SliceValidationError),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Struct(report) => {
                for (idx, (path, error)) in report.iter().enumerate() {
                    if idx > 0 {
                        f.write_str("; ")?;
                    }
                    let path = path.to_string();
                    if path.is_empty() {
                        write!(f, "{}", error)?;
                    } else {
                        write!(f, "{}: {}", path, error)?;
                    }
                }
                Ok(())
            }
            ValidationError::Slice(errors) => fmt::Display::fmt(errors, f),
        }
    }
}

impl std::error::Error for ValidationError {}

/// The failures of a sequence validation, keyed by the index of the failing element.
///
/// Displays as one `[index]: message` line per failing element, in element order.
#[derive(Debug, Default)]
pub struct SliceValidationError(Vec<(usize, ValidationError)>);

impl SliceValidationError {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(element index, error)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ValidationError)> {
        self.0.iter().map(|(idx, err)| (*idx, err))
    }
}

impl fmt::Display for SliceValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (line, (idx, err)) in self.0.iter().enumerate() {
            if line > 0 {
                f.write_str("\n")?;
            }
            write!(f, "[{}]: {}", idx, err)?;
        }
        Ok(())
    }
}

/// A pluggable validation capability.
pub trait StructValidator: Send + Sync {
    fn validate_struct<T>(&self, value: &T) -> Result<(), ValidationError>
    where
        T: Validate + ?Sized,
        T::Context: Default;

    /// Validates every element, collecting the failures of all of them.
    fn validate_slice<T>(&self, values: &[T]) -> Result<(), ValidationError>
    where
        T: Validate,
        T::Context: Default,
    {
        let mut failures = SliceValidationError::default();
        for (idx, value) in values.iter().enumerate() {
            if let Err(err) = self.validate_struct(value) {
                failures.0.push((idx, err));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Slice(failures))
        }
    }
}

/// The [`garde`]-backed validator used by [`validate_struct`] and [`validate_slice`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultValidator;

impl StructValidator for DefaultValidator {
    fn validate_struct<T>(&self, value: &T) -> Result<(), ValidationError>
    where
        T: Validate + ?Sized,
        T::Context: Default,
    {
        value.validate().map_err(ValidationError::Struct)
    }
}

/// Validates one value with the [`DefaultValidator`].
pub fn validate_struct<T>(value: &T) -> Result<(), ValidationError>
where
    T: Validate + ?Sized,
    T::Context: Default,
{
    DefaultValidator.validate_struct(value)
}

/// Validates every element of `values` with the [`DefaultValidator`].
pub fn validate_slice<T>(values: &[T]) -> Result<(), ValidationError>
where
    T: Validate,
    T::Context: Default,
{
    DefaultValidator.validate_slice(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Signup {
        #[garde(length(min = 1))]
        name: String,
        #[garde(range(min = 18))]
        age: u8,
    }

    fn signup(name: &str, age: u8) -> Signup {
        Signup {
            name: name.to_owned(),
            age,
        }
    }

    #[test]
    fn valid_struct_passes() {
        assert!(validate_struct(&signup("alice", 30)).is_ok());
    }

    #[test]
    fn invalid_struct_reports_field() {
        let err = validate_struct(&signup("", 30)).unwrap_err();

        assert!(matches!(err, ValidationError::Struct(_)));
        assert!(err.to_string().starts_with("name: "));
    }

    #[test]
    fn slice_errors_list_failing_indices_in_order() {
        let batch = vec![
            signup("alice", 30),
            signup("", 30),
            signup("bob", 40),
            signup("carol", 12),
        ];

        let err = validate_slice(&batch).unwrap_err();
        let rendered = err.to_string();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[1]: name: "));
        assert!(lines[1].starts_with("[3]: age: "));

        match err {
            ValidationError::Slice(errors) => {
                assert_eq!(errors.iter().map(|(idx, _)| idx).collect::<Vec<_>>(), vec![1, 3]);
            }
            other => panic!("expected slice error, got {}", other),
        }
    }

    #[test]
    fn all_valid_slice_passes() {
        assert!(validate_slice(&[signup("a", 18), signup("b", 99)]).is_ok());
        assert!(validate_slice::<Signup>(&[]).is_ok());
    }
}
