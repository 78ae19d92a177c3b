//! Error types for x4lidar.

use thiserror::Error;

/// Main error type for all LIDAR operations.
#[derive(Debug, Error)]
pub enum LidarError {
    /// I/O error on the serial link.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be opened or configured.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Frame does not start with the `0xAA 0x55` sync marker.
    #[error("invalid frame header")]
    InvalidHeader,

    /// Frame carries fewer than two samples, so angles cannot be interpolated.
    #[error("frame has {0} samples, at least 2 required")]
    EmptyFrame(u8),

    /// A frame was requested while the device is not scanning.
    #[error("device is not in scan mode")]
    NotScanning,

    /// No ready frame could be obtained before the read deadline.
    #[error("no frame available")]
    Unavailable,

    /// Wire checksum does not match the frame contents.
    #[error("checksum mismatch: frame carries {expected:#06x}, computed {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// Reader or writer task has shut down.
    #[error("connection closed")]
    ConnectionClosed,

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias using LidarError.
pub type Result<T> = std::result::Result<T, LidarError>;
