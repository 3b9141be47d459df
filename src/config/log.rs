use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// Directory receiving `gateway.log`
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

impl LogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.log_dir.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "log_dir path cannot be empty".into(),
            )));
        }

        #[cfg(not(test))]
        {
            use std::fs;
            if !self.log_dir.exists() {
                fs::create_dir_all(&self.log_dir).map_err(|e| {
                    Error::Config(ConfigError::Message(format!(
                        "Failed to create log_dir directory at {}: {}",
                        self.log_dir.display(),
                        e
                    )))
                })?;
            }
        }

        Ok(())
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/tmp/deployment-gateway/logs")
}
