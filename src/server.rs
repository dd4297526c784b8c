//! Common settings for an HTTP(S) server.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{section, Validate, ValidationError};

/// Address, TLS and timeout settings for an HTTP(S) server.
///
/// Mount it under a tagged section to namespace its variables: as
/// `server: section "HTTP"` the port binds from `HTTP_PORT`, the TLS flag from
/// `HTTP_USE_TLS` and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub use_tls: bool,
    pub cert_file: String,
    pub key_file: String,
    /// Read, write and idle timeout in seconds. Zero means no timeout.
    pub timeout: u64,
}

section! {
    ServerConfig {
        address: scalar "ADDRESS",
        port: scalar "PORT",
        use_tls: scalar "USE_TLS",
        cert_file: scalar "CERT_FILE",
        key_file: scalar "KEY_FILE",
        timeout: scalar "TIMEOUT",
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::new("port", "need to have port configured"));
        }

        if self.use_tls && (self.cert_file.is_empty() || self.key_file.is_empty()) {
            return Err(ValidationError::new(
                "use_tls",
                "set to use TLS but does not have 'cert_file' or 'key_file' configured",
            ));
        }

        Ok(())
    }
}

impl ServerConfig {
    /// The `address:port` string to listen on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// The configured timeout, or `None` when it is zero.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}
