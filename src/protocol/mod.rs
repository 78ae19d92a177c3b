//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the device's scan-frame protocol:
//! - 10-byte header decoding and the XOR checksum
//! - Frame buffer for accumulating partial deliveries
//! - Reassembler handing complete frames to the consumer queue
//! - Frame struct with typed accessors

mod frame;
mod frame_buffer;
mod reassembler;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use frame_buffer::{FrameBuffer, Outcome, Step};
pub use reassembler::Reassembler;
pub use wire_format::{
    compute_checksum, frame_len, starts_with_sync, Command, FrameHeader, FRAME_CAPACITY,
    HEADER_SIZE, MAX_SAMPLES, SAMPLE_SIZE, SYNC,
};
