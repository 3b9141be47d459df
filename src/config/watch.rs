use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// One week; longer streams should reconnect
const MAX_STREAM_DURATION_IN_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for watch streams
///
/// Each client watch owns two bounded channels:
///
/// ```text
/// store ──(subscription buffer)──> StreamSession ──(frame buffer)──> SSE body
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Per-subscription buffer between the resource store and the session
    ///
    /// When a subscriber falls this far behind, the store closes the
    /// subscription rather than dropping events, and the client sees a
    /// `close` frame and can reconnect.
    ///
    /// **Default**: 100
    #[serde(default = "default_subscription_buffer_size")]
    pub subscription_buffer_size: usize,

    /// Frames buffered between the session and the HTTP body writer
    ///
    /// **Default**: 16
    #[serde(default = "default_frame_buffer_size")]
    pub frame_buffer_size: usize,

    /// Interval between SSE keep-alive comments; keeps idle connections
    /// from being reaped by proxies
    ///
    /// **Default**: 15 seconds
    #[serde(default = "default_keep_alive_interval_in_secs")]
    pub keep_alive_interval_in_secs: u64,

    /// Maximum lifetime of one watch stream. `0` disables the limit.
    ///
    /// Expiry ends the session exactly like a client disconnect.
    ///
    /// **Default**: 1800 seconds
    #[serde(default = "default_max_stream_duration_in_secs")]
    pub max_stream_duration_in_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            subscription_buffer_size: default_subscription_buffer_size(),
            frame_buffer_size: default_frame_buffer_size(),
            keep_alive_interval_in_secs: default_keep_alive_interval_in_secs(),
            max_stream_duration_in_secs: default_max_stream_duration_in_secs(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.subscription_buffer_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.subscription_buffer_size must be greater than 0".into(),
            )));
        }

        if self.frame_buffer_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.frame_buffer_size must be greater than 0".into(),
            )));
        }

        if self.keep_alive_interval_in_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.keep_alive_interval_in_secs must be at least 1".into(),
            )));
        }

        if self.max_stream_duration_in_secs > MAX_STREAM_DURATION_IN_SECS {
            return Err(Error::Config(ConfigError::Message(format!(
                "watch.max_stream_duration_in_secs ({}) exceeds the {} second limit, use 0 for unlimited",
                self.max_stream_duration_in_secs, MAX_STREAM_DURATION_IN_SECS
            ))));
        }

        if self.max_stream_duration_in_secs != 0
            && self.max_stream_duration_in_secs < self.keep_alive_interval_in_secs
        {
            return Err(Error::Config(ConfigError::Message(format!(
                "watch.max_stream_duration_in_secs ({}) must not be shorter than keep_alive_interval_in_secs ({})",
                self.max_stream_duration_in_secs, self.keep_alive_interval_in_secs
            ))));
        }

        Ok(())
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_interval_in_secs)
    }

    pub fn max_stream_duration(&self) -> Option<Duration> {
        match self.max_stream_duration_in_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn default_subscription_buffer_size() -> usize {
    100
}

fn default_frame_buffer_size() -> usize {
    16
}

fn default_keep_alive_interval_in_secs() -> u64 {
    15
}

fn default_max_stream_duration_in_secs() -> u64 {
    1800
}
