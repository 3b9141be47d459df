use std::net::SocketAddr;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_address: SocketAddr,

    /// Upper bound for create/update/scale request bodies
    #[serde(default = "default_body_limit")]
    pub max_body_size_in_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_addr(),
            max_body_size_in_bytes: default_body_limit(),
        }
    }
}

impl ServerConfig {
    /// Validates HTTP listener configuration
    /// # Errors
    /// Returns `Error::Config` if the port is zero or the body limit is empty
    pub fn validate(&self) -> Result<()> {
        if self.listen_address.port() == 0 {
            return Err(Error::Config(ConfigError::Message(
                "listen_address must specify a non-zero port".into(),
            )));
        }

        if self.max_body_size_in_bytes == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_body_size_in_bytes must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8081))
}

fn default_body_limit() -> u64 {
    // 4 MiB, large enough for any hand-written manifest
    4 * 1024 * 1024
}
