//! Response body encoders used by [`Context::render`](../struct.Context.html#method.render).

use bytes::BytesMut;
use http::header::HeaderValue;
use serde::Serialize;

/// A payload that knows its content type and how to serialize itself into a response body.
///
/// Implementations append to `buf` only on success, so a failed render leaves the response untouched.
pub trait Render {
    fn content_type(&self) -> HeaderValue;

    fn render(&self, buf: &mut BytesMut) -> crate::Result<()>;
}

/// Serializes the wrapped value as JSON.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> Render for Json<T> {
    fn content_type(&self) -> HeaderValue {
        HeaderValue::from_static("application/json; charset=utf-8")
    }

    fn render(&self, buf: &mut BytesMut) -> crate::Result<()> {
        let encoded = serde_json::to_vec(&self.0)?;
        buf.extend_from_slice(&encoded);
        Ok(())
    }
}

/// Plain UTF-8 text.
#[derive(Debug, Clone)]
pub struct Text<S>(pub S);

impl<S: AsRef<str>> Render for Text<S> {
    fn content_type(&self) -> HeaderValue {
        HeaderValue::from_static("text/plain; charset=utf-8")
    }

    fn render(&self, buf: &mut BytesMut) -> crate::Result<()> {
        buf.extend_from_slice(self.0.as_ref().as_bytes());
        Ok(())
    }
}

/// An already rendered HTML document or fragment.
#[derive(Debug, Clone)]
pub struct Html<S>(pub S);

impl<S: AsRef<str>> Render for Html<S> {
    fn content_type(&self) -> HeaderValue {
        HeaderValue::from_static("text/html; charset=utf-8")
    }

    fn render(&self, buf: &mut BytesMut) -> crate::Result<()> {
        buf.extend_from_slice(self.0.as_ref().as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::{Error as _, Serializer};
    use std::collections::BTreeMap;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("not today"))
        }
    }

    #[test]
    fn json_appends_encoded_value() {
        let mut buf = BytesMut::new();
        let mut user = BTreeMap::new();
        user.insert("id", 42);

        Json(&user).render(&mut buf).unwrap();

        assert_eq!(&buf[..], br#"{"id":42}"#);
        assert_eq!(Json(&user).content_type(), "application/json; charset=utf-8");
    }

    #[test]
    fn failed_json_leaves_buffer_untouched() {
        let mut buf = BytesMut::from("kept");

        assert!(Json(Unserializable).render(&mut buf).is_err());
        assert_eq!(&buf[..], b"kept");
    }
}
