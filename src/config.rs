use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Engine settings, usually loaded from a TOML file.
///
/// Every field is optional in the file; missing fields keep their defaults.
///
/// ```toml
/// addr = "0.0.0.0:8080"
/// pool_capacity = 256
/// max_body_bytes = 1048576
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The address the demo binary and [`Engine::run`](./struct.Engine.html#method.run) callers listen on.
    pub addr: SocketAddr,
    /// The maximum number of idle request contexts kept for reuse.
    pub pool_capacity: usize,
    /// Requests with larger bodies are answered with `413 Payload Too Large`.
    pub max_body_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            pool_capacity: 1024,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> crate::Result<EngineConfig> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<EngineConfig> {
        let content = fs::read_to_string(path)?;
        EngineConfig::from_toml_str(&content)
    }
}
