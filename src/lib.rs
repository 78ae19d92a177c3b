//! # x4lidar
//!
//! Async driver for X4-class spinning LIDARs on a serial link.
//!
//! The device streams scan frames in arbitrarily sized chunks. A reader task
//! reassembles them and queues complete frames; the consumer pulls frames,
//! decodes them into `(distance, angle)` samples, and drives the device with
//! single-opcode commands.
//!
//! ## Architecture
//!
//! ```text
//!              ┌────────────── Lidar ──────────────┐
//! serial RX ──►│ reader task ─► Reassembler ─► mpsc│──► read_frame() ─► decode()
//!              │                                   │
//! serial TX ◄──│ writer task ◄── CommandWriter ◄───│◄── start()/stop()/...
//!              └─────────────── ModeController ────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use x4lidar::{decode, Lidar, SamplePublisher};
//!
//! #[tokio::main]
//! async fn main() -> x4lidar::Result<()> {
//!     let lidar = Lidar::builder().open("/dev/ttyUSB0").await?;
//!     let viewer = SamplePublisher::localhost().await?;
//!
//!     lidar.start().await?;
//!     loop {
//!         let frame = lidar.read_frame().await?;
//!         if let Ok(samples) = decode(&frame) {
//!             viewer.publish(&samples).await?;
//!         }
//!     }
//! }
//! ```

pub mod codec;
pub mod config;
pub mod decoder;
pub mod error;
pub mod lidar;
pub mod mode;
pub mod protocol;
pub mod publish;
pub mod stats;
pub mod transport;
pub mod writer;

pub use config::{ChecksumPolicy, LidarConfig, OverrunPolicy};
pub use decoder::{decode, Sample};
pub use error::{LidarError, Result};
pub use lidar::{Lidar, LidarBuilder};
pub use mode::Mode;
pub use protocol::{Command, Frame};
pub use publish::SamplePublisher;
pub use stats::StatsSnapshot;
