//! Frame buffer holding the reassembly state of one connection.
//!
//! The serial transport delivers bytes in whatever chunk sizes it likes. A
//! chunk that begins with the `0xAA 0x55` sync marker starts a new frame; a
//! chunk without it either continues a pending fragment or is discarded.
//!
//! [`FrameBuffer::on_bytes`] performs a single step and reports how many bytes
//! of the chunk it consumed. Under [`OverrunPolicy::Split`] a chunk carrying
//! more than one frame is consumed only up to the end of the first; the
//! caller feeds the remainder back in (see
//! [`Reassembler`](crate::protocol::Reassembler)).
//!
//! # Example
//!
//! ```
//! use x4lidar::protocol::{build_frame, FrameBuffer, Outcome};
//!
//! let wire = build_frame(0, 0x0140, 0x2D00, &[400, 800, 1200]);
//! let mut buffer = FrameBuffer::new();
//!
//! assert_eq!(buffer.on_bytes(&wire[..7]).outcome, Outcome::Fragment);
//! assert_eq!(buffer.on_bytes(&wire[7..]).outcome, Outcome::Ready);
//!
//! let frame = buffer.take_ready().unwrap();
//! assert_eq!(frame.wire_bytes(), &wire[..]);
//! ```

use bytes::{Bytes, BytesMut};

use super::frame::Frame;
use super::wire_format::{frame_len, starts_with_sync, FRAME_CAPACITY};
use crate::config::OverrunPolicy;

/// Bytes needed before the sample count (and so the frame length) is known.
const LENGTH_KNOWN_AT: usize = 4;

/// Result of one reassembly step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A complete frame is held and ready to be taken.
    Ready,
    /// A new header arrived but the frame is not complete yet.
    Fragment,
    /// A continuation was appended and the frame is still short.
    StillIncomplete,
    /// The chunk held more bytes than the frame needed. The frame is ready;
    /// the surplus was left unconsumed or dropped per [`OverrunPolicy`].
    Overrun,
    /// No header and no pending fragment: the buffer was cleared.
    Discarded,
    /// Zero-length chunk, nothing changed.
    Empty,
}

/// Outcome of a step and how much of the chunk it used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub outcome: Outcome,
    /// Bytes of the chunk accounted for (copied or deliberately dropped).
    pub consumed: usize,
}

impl Step {
    fn new(outcome: Outcome, consumed: usize) -> Self {
        Self { outcome, consumed }
    }
}

/// Reassembly state: raw bytes, expected length, accumulated offset, and the
/// fragment/ready flags.
///
/// `is_ready` and `is_fragment` are never both true.
pub struct FrameBuffer {
    /// Fixed-capacity frame region.
    region: BytesMut,
    /// Bytes written into `region` for the current frame.
    received: usize,
    /// Length of the current frame, 0 until the sample count has arrived.
    expected: usize,
    fragment: bool,
    ready: bool,
    overrun_policy: OverrunPolicy,
}

impl FrameBuffer {
    /// Create a frame buffer with the default overrun policy.
    pub fn new() -> Self {
        Self::with_policy(OverrunPolicy::default())
    }

    /// Create a frame buffer with an explicit overrun policy.
    pub fn with_policy(overrun_policy: OverrunPolicy) -> Self {
        Self {
            region: BytesMut::zeroed(FRAME_CAPACITY),
            received: 0,
            expected: 0,
            fragment: false,
            ready: false,
            overrun_policy,
        }
    }

    /// Process one chunk (or the remainder of one).
    ///
    /// Never fails; at worst the buffer is left not ready.
    pub fn on_bytes(&mut self, chunk: &[u8]) -> Step {
        if chunk.is_empty() {
            return Step::new(Outcome::Empty, 0);
        }

        if starts_with_sync(chunk) {
            return self.start_frame(chunk);
        }

        if self.fragment {
            return self.continue_frame(chunk);
        }

        self.clear();
        Step::new(Outcome::Discarded, chunk.len())
    }

    /// Take the ready frame, clearing the ready flag and the region.
    pub fn take_ready(&mut self) -> Option<Frame> {
        if !self.ready {
            return None;
        }
        let frame = Frame::from_region(Bytes::copy_from_slice(&self.region));
        self.clear();
        Some(frame)
    }

    /// Whether a complete frame is held.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether a partial frame is waiting for continuation bytes.
    #[inline]
    pub fn is_fragment(&self) -> bool {
        self.fragment
    }

    /// Bytes accumulated for the current frame.
    #[inline]
    pub fn received_bytes(&self) -> usize {
        self.received
    }

    /// Length of the current frame, 0 if not yet known.
    #[inline]
    pub fn expected_bytes(&self) -> usize {
        self.expected
    }

    #[inline]
    pub fn overrun_policy(&self) -> OverrunPolicy {
        self.overrun_policy
    }

    /// Zero the region and reset all reassembly state.
    pub fn clear(&mut self) {
        self.region.fill(0);
        self.received = 0;
        self.expected = 0;
        self.fragment = false;
        self.ready = false;
    }

    /// A header arrived: restart reassembly at offset 0.
    fn start_frame(&mut self, chunk: &[u8]) -> Step {
        self.clear();

        if chunk.len() < LENGTH_KNOWN_AT {
            self.copy_in(chunk);
            self.fragment = true;
            return Step::new(Outcome::Fragment, chunk.len());
        }

        self.expected = frame_len(chunk[LENGTH_KNOWN_AT - 1]);
        self.fill(chunk, Outcome::Fragment)
    }

    /// Append a continuation to the pending fragment.
    fn continue_frame(&mut self, chunk: &[u8]) -> Step {
        if self.expected != 0 {
            return self.fill(chunk, Outcome::StillIncomplete);
        }

        // Sample count still missing.
        let take = (LENGTH_KNOWN_AT - self.received).min(chunk.len());
        self.copy_in(&chunk[..take]);
        if self.received < LENGTH_KNOWN_AT {
            return Step::new(Outcome::StillIncomplete, take);
        }

        self.expected = frame_len(self.region[LENGTH_KNOWN_AT - 1]);
        let rest = self.fill(&chunk[take..], Outcome::StillIncomplete);
        Step::new(rest.outcome, take + rest.consumed)
    }

    /// Copy up to the expected length; report `short` if still incomplete.
    fn fill(&mut self, chunk: &[u8], short: Outcome) -> Step {
        let needed = self.expected - self.received;

        if chunk.len() < needed {
            self.copy_in(chunk);
            self.fragment = true;
            return Step::new(short, chunk.len());
        }

        self.copy_in(&chunk[..needed]);
        self.fragment = false;
        self.ready = true;

        if chunk.len() == needed {
            return Step::new(Outcome::Ready, needed);
        }

        let consumed = match self.overrun_policy {
            OverrunPolicy::Split => needed,
            OverrunPolicy::Truncate => chunk.len(),
        };
        Step::new(Outcome::Overrun, consumed)
    }

    fn copy_in(&mut self, bytes: &[u8]) {
        let end = self.received + bytes.len();
        debug_assert!(end <= FRAME_CAPACITY);
        self.region[self.received..end].copy_from_slice(bytes);
        self.received = end;
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        assert!(!(self.ready && self.fragment));
        assert!(self.received <= FRAME_CAPACITY);
        if self.expected != 0 {
            assert!(self.received <= self.expected);
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
