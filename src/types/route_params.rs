use std::fmt;

/// Represents the route parameters extracted while resolving a request path.
///
/// Parameters keep the order in which they appear in the route pattern, so for the pattern
/// `/users/:userName/books/:bookName` the first entry is always `userName`.
///
/// # Examples
///
/// ```
/// use grove::RouteParams;
///
/// let mut params = RouteParams::new();
/// params.set("userName", "alice");
/// params.set("bookName", "HarryPotter");
///
/// assert_eq!(params.get("userName"), Some("alice"));
/// assert_eq!(params.iter().map(|(name, _)| name).collect::<Vec<_>>(), ["userName", "bookName"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(Vec<(String, String)>);

impl RouteParams {
    /// Creates an empty set of route parameters.
    pub fn new() -> RouteParams {
        RouteParams(Vec::new())
    }

    /// Creates an empty set of route parameters with the given capacity.
    pub fn with_capacity(capacity: usize) -> RouteParams {
        RouteParams(Vec::with_capacity(capacity))
    }

    /// Sets a parameter, replacing the value of an existing parameter with the same name.
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, param_name: N, param_val: V) {
        let param_name = param_name.into();
        let param_val = param_val.into();

        match self.0.iter_mut().find(|(name, _)| *name == param_name) {
            Some(entry) => entry.1 = param_val,
            None => self.0.push((param_name, param_val)),
        }
    }

    /// Returns the value of the parameter with the given name.
    pub fn get<N: AsRef<str>>(&self, param_name: N) -> Option<&str> {
        let param_name = param_name.as_ref();
        self.0
            .iter()
            .find(|(name, _)| name == param_name)
            .map(|(_, val)| val.as_str())
    }

    /// Checks if a parameter with the given name exists.
    pub fn has<N: AsRef<str>>(&self, param_name: N) -> bool {
        self.get(param_name).is_some()
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, val)| (name.as_str(), val.as_str()))
    }

    pub(crate) fn push(&mut self, param_name: &str, param_val: String) {
        self.0.push((param_name.to_owned(), param_val));
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

impl fmt::Display for RouteParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, (name, val)) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, val)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::RouteParams;

    #[test]
    fn set_replaces_existing_value() {
        let mut params = RouteParams::new();
        params.set("id", "1");
        params.set("id", "2");

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some("2"));
    }

    #[test]
    fn truncate_drops_trailing_bindings() {
        let mut params = RouteParams::with_capacity(2);
        params.push("a", "1".into());
        params.push("b", "2".into());
        params.truncate(1);

        assert!(params.has("a"));
        assert!(!params.has("b"));
        assert_eq!(params.to_string(), "{a: 1}");
    }
}
