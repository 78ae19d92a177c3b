//! Codec module - encodings for decoded samples.
//!
//! - [`RawCodec`] - packed little-endian `f32` distance/angle pairs, the
//!   datagram layout the desktop viewer reads
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (`to_vec_named`, so
//!   samples keep their field names)
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects.
//!
//! # Example
//!
//! ```
//! use x4lidar::codec::{MsgPackCodec, RawCodec};
//! use x4lidar::Sample;
//!
//! let samples = vec![Sample { distance_mm: 120.5, angle_deg: 42.0 }];
//!
//! let packed = RawCodec::encode(&samples);
//! assert_eq!(RawCodec::decode(&packed), samples);
//!
//! let encoded = MsgPackCodec::encode(&samples).unwrap();
//! let decoded: Vec<Sample> = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, samples);
//! ```

mod msgpack;
mod raw;

pub use msgpack::MsgPackCodec;
pub use raw::{RawCodec, DATAGRAM_PAIRS, DATAGRAM_SIZE, PAIR_SIZE};
