use std::io;
use thiserror::Error;

/// The error type used by the `grove` crate.
///
/// Registration problems (`InvalidPattern`, `WildcardNotLast`, `AmbiguousPattern`, `DuplicateRoute`,
/// `InvalidPrefix`) are reported by [`EngineBuilder::build`](./struct.EngineBuilder.html#method.build) and are meant
/// to stop the application at startup. A missing route or a wrong method is not an error, see
/// [`Resolution`](./enum.Resolution.html).
#[derive(Debug, Error)]
pub enum Error {
    /// The route pattern could not be parsed.
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },

    /// A wildcard segment appeared before the end of the pattern.
    #[error("wildcard must be the last segment of route pattern `{0}`")]
    WildcardNotLast(String),

    /// The pattern would make lookups ambiguous, e.g. `/users/:id` next to `/users/:name`.
    #[error("route pattern `{pattern}` conflicts with `{existing}` registered at the same position")]
    AmbiguousPattern { pattern: String, existing: String },

    /// The same pattern was registered twice for the same method.
    #[error("duplicate route: {method} {pattern}")]
    DuplicateRoute { method: String, pattern: String },

    /// A group prefix contained a parameter or wildcard segment.
    #[error("invalid group prefix `{0}`: prefixes may only contain literal segments")]
    InvalidPrefix(String),

    /// A payload could not be serialized into the response body.
    #[error("could not render response body: {0}")]
    Render(#[from] serde_json::Error),

    /// The request body could not be read.
    #[error("couldn't read request body: {0}")]
    Body(Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Io(#[from] io::Error),

    /// The configuration file is not valid TOML for [`EngineConfig`](./struct.EngineConfig.html).
    #[error("could not parse config: {0}")]
    Config(#[from] toml::de::Error),
}
