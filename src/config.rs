//! Session configuration.
//!
//! [`LidarConfig`] can be built in code, through
//! [`LidarBuilder`](crate::LidarBuilder), or loaded from JSON:
//!
//! ```
//! use x4lidar::config::{ChecksumPolicy, LidarConfig, OverrunPolicy};
//!
//! let config = LidarConfig::from_json_str(
//!     r#"{ "frame_queue_capacity": 32, "checksum_policy": "reject" }"#,
//! ).unwrap();
//!
//! assert_eq!(config.frame_queue_capacity, 32);
//! assert_eq!(config.checksum_policy, ChecksumPolicy::Reject);
//! assert_eq!(config.overrun_policy, OverrunPolicy::Split);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LidarError, Result};

/// Default baud rate of X4-class devices.
pub const DEFAULT_BAUD_RATE: u32 = 128_000;

/// Default number of ready frames buffered between reader and consumer.
pub const DEFAULT_FRAME_QUEUE_CAPACITY: usize = 8;

/// Default time `read_frame` waits for a ready frame.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default size of a single transport read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 512;

/// Default command queue capacity.
pub const DEFAULT_COMMAND_CHANNEL_CAPACITY: usize = 16;

/// What to do with bytes past the end of a frame within one chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrunPolicy {
    /// Complete the frame and re-feed the surplus as a new chunk.
    #[default]
    Split,
    /// Complete the frame and drop the surplus.
    Truncate,
}

/// How the wire checksum is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    /// Never computed.
    Ignore,
    /// Computed; mismatches are counted and logged but still delivered.
    #[default]
    Flag,
    /// Mismatching frames are dropped.
    Reject,
}

/// Configuration for a LIDAR session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LidarConfig {
    /// Serial baud rate (8N1, no flow control).
    pub baud_rate: u32,
    /// Ready frames buffered before the reader starts dropping.
    pub frame_queue_capacity: usize,
    /// How long `read_frame` waits, in milliseconds.
    pub read_timeout_ms: u64,
    /// Bytes requested per transport read.
    pub read_chunk_size: usize,
    /// Commands buffered for the writer task.
    pub command_channel_capacity: usize,
    pub overrun_policy: OverrunPolicy,
    pub checksum_policy: ChecksumPolicy,
}

impl Default for LidarConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            frame_queue_capacity: DEFAULT_FRAME_QUEUE_CAPACITY,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            command_channel_capacity: DEFAULT_COMMAND_CHANNEL_CAPACITY,
            overrun_policy: OverrunPolicy::default(),
            checksum_policy: ChecksumPolicy::default(),
        }
    }
}

impl LidarConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the session unusable.
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(LidarError::Config("baud_rate must be non-zero".to_string()));
        }
        if self.frame_queue_capacity == 0 {
            return Err(LidarError::Config(
                "frame_queue_capacity must be non-zero".to_string(),
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(LidarError::Config(
                "read_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.read_chunk_size == 0 {
            return Err(LidarError::Config(
                "read_chunk_size must be non-zero".to_string(),
            ));
        }
        if self.command_channel_capacity == 0 {
            return Err(LidarError::Config(
                "command_channel_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
