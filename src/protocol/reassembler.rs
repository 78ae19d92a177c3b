//! Delivery-side entry point of the reassembly pipeline.
//!
//! The [`Reassembler`] owns the [`FrameBuffer`] outright, so no lock guards
//! it. Completed frames are handed to the consumer through a bounded channel:
//!
//! ```text
//! transport chunks ─► Reassembler ─► FrameBuffer ─► mpsc::Sender<Frame> ─► read_frame()
//! ```
//!
//! A full channel drops the frame and counts it in
//! [`StatsSnapshot::frames_dropped`](crate::StatsSnapshot). The delivery
//! path never waits for the consumer.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::frame::Frame;
use super::frame_buffer::{FrameBuffer, Outcome};
use crate::config::{ChecksumPolicy, OverrunPolicy};
use crate::stats::Stats;

/// Reassembles chunks into frames and queues them for the consumer.
pub struct Reassembler {
    buffer: FrameBuffer,
    checksum_policy: ChecksumPolicy,
    ready_tx: mpsc::Sender<Frame>,
    stats: Arc<Stats>,
}

impl Reassembler {
    /// Create a reassembler feeding an existing channel.
    pub fn new(
        ready_tx: mpsc::Sender<Frame>,
        overrun_policy: OverrunPolicy,
        checksum_policy: ChecksumPolicy,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            buffer: FrameBuffer::with_policy(overrun_policy),
            checksum_policy,
            ready_tx,
            stats,
        }
    }

    /// Create a reassembler together with the receiving end of its queue.
    pub fn channel(
        capacity: usize,
        overrun_policy: OverrunPolicy,
        checksum_policy: ChecksumPolicy,
    ) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self::new(tx, overrun_policy, checksum_policy, Stats::new()),
            rx,
        )
    }

    /// Handle one inbound delivery.
    ///
    /// Returns the number of bytes consumed, which is always the whole chunk:
    /// bytes are either reassembled or deliberately dropped.
    pub fn on_bytes(&mut self, chunk: &[u8]) -> usize {
        self.stats.add_bytes(chunk.len());

        let mut offset = 0;
        while offset < chunk.len() {
            let step = self.buffer.on_bytes(&chunk[offset..]);
            offset += step.consumed;

            match step.outcome {
                Outcome::Discarded => {
                    self.stats.chunk_discarded();
                    tracing::trace!("Discarded {} bytes without frame header", step.consumed);
                }
                Outcome::Overrun => {
                    self.stats.overrun();
                    tracing::debug!(
                        "Frame ended at byte {} of a {}-byte chunk ({:?})",
                        offset,
                        chunk.len(),
                        self.buffer.overrun_policy()
                    );
                }
                _ => {}
            }

            if let Some(frame) = self.buffer.take_ready() {
                self.deliver(frame);
            }

            if step.consumed == 0 {
                break;
            }
        }

        chunk.len()
    }

    /// Reassembly state, for inspection.
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Shared counters.
    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    fn deliver(&self, frame: Frame) {
        if self.checksum_policy != ChecksumPolicy::Ignore && !frame.checksum_valid() {
            self.stats.checksum_failure();
            tracing::warn!(
                "Checksum mismatch: frame carries {:#06x}, computed {:#06x}",
                frame.checksum(),
                frame.computed_checksum()
            );
            if self.checksum_policy == ChecksumPolicy::Reject {
                return;
            }
        }

        match self.ready_tx.try_send(frame) {
            Ok(()) => self.stats.frame_delivered(),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.frame_dropped();
                tracing::warn!("Frame queue full, dropping frame");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.stats.frame_dropped();
                tracing::trace!("Frame queue closed, dropping frame");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{build_frame, HEADER_SIZE};

    fn reassembler(capacity: usize) -> (Reassembler, mpsc::Receiver<Frame>) {
        Reassembler::channel(capacity, OverrunPolicy::Split, ChecksumPolicy::Flag)
    }

    #[test]
    fn test_single_frame_delivered() {
        let (mut r, mut rx) = reassembler(4);
        let wire = build_frame(0, 0x0140, 0x2D00, &[400, 800, 1200]);

        assert_eq!(r.on_bytes(&wire), wire.len());

        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.wire_bytes(), &wire[..]);
        assert_eq!(r.stats().snapshot().frames_delivered, 1);
        assert_eq!(r.stats().snapshot().bytes_received, wire.len() as u64);
    }

    #[test]
    fn test_fragmented_frame_delivered_once() {
        let (mut r, mut rx) = reassembler(4);
        let wire = build_frame(0, 0x0140, 0x2D00, &[400, 800, 1200]);

        r.on_bytes(&wire[..HEADER_SIZE + 1]);
        assert!(rx.try_recv().is_err());

        r.on_bytes(&wire[HEADER_SIZE + 1..]);
        assert_eq!(rx.try_recv().unwrap().wire_bytes(), &wire[..]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_two_frames_in_one_chunk_split() {
        let (mut r, mut rx) = reassembler(4);
        let first = build_frame(0, 0x0100, 0x0200, &[1, 2]);
        let second = build_frame(0, 0x0300, 0x0400, &[3, 4, 5]);
        let mut chunk = first.clone();
        chunk.extend_from_slice(&second);

        r.on_bytes(&chunk);

        assert_eq!(rx.try_recv().unwrap().wire_bytes(), &first[..]);
        assert_eq!(rx.try_recv().unwrap().wire_bytes(), &second[..]);
        assert_eq!(r.stats().snapshot().overruns, 1);
    }

    #[test]
    fn test_frame_and_partial_next_frame() {
        let (mut r, mut rx) = reassembler(4);
        let first = build_frame(0, 0x0100, 0x0200, &[1, 2]);
        let second = build_frame(0, 0x0300, 0x0400, &[3, 4, 5]);
        let mut chunk = first.clone();
        chunk.extend_from_slice(&second[..6]);

        r.on_bytes(&chunk);
        assert_eq!(rx.try_recv().unwrap().wire_bytes(), &first[..]);
        assert!(r.buffer().is_fragment());

        r.on_bytes(&second[6..]);
        assert_eq!(rx.try_recv().unwrap().wire_bytes(), &second[..]);
    }

    #[test]
    fn test_truncate_drops_second_frame() {
        let (mut r, mut rx) =
            Reassembler::channel(4, OverrunPolicy::Truncate, ChecksumPolicy::Flag);
        let first = build_frame(0, 0x0100, 0x0200, &[1, 2]);
        let second = build_frame(0, 0x0300, 0x0400, &[3, 4, 5]);
        let mut chunk = first.clone();
        chunk.extend_from_slice(&second);

        r.on_bytes(&chunk);

        assert_eq!(rx.try_recv().unwrap().wire_bytes(), &first[..]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_queue_drops_and_counts() {
        let (mut r, mut rx) = reassembler(1);
        let wire = build_frame(0, 0, 0, &[1, 2]);

        r.on_bytes(&wire);
        r.on_bytes(&wire);
        r.on_bytes(&wire);

        let snap = r.stats().snapshot();
        assert_eq!(snap.frames_delivered, 1);
        assert_eq!(snap.frames_dropped, 2);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_garbage_counted() {
        let (mut r, mut rx) = reassembler(4);
        assert_eq!(r.on_bytes(&[0x01, 0x02, 0x03]), 3);
        assert!(rx.try_recv().is_err());
        assert_eq!(r.stats().snapshot().chunks_discarded, 1);
    }

    #[test]
    fn test_bad_checksum_flagged_but_delivered() {
        let (mut r, mut rx) = reassembler(4);
        let mut wire = build_frame(0, 0, 0, &[10, 20]);
        wire[HEADER_SIZE] ^= 0xFF;

        r.on_bytes(&wire);

        let frame = rx.try_recv().unwrap();
        assert!(!frame.checksum_valid());
        assert_eq!(r.stats().snapshot().checksum_failures, 1);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let (mut r, mut rx) = Reassembler::channel(4, OverrunPolicy::Split, ChecksumPolicy::Reject);
        let mut wire = build_frame(0, 0, 0, &[10, 20]);
        wire[HEADER_SIZE] ^= 0xFF;

        r.on_bytes(&wire);

        assert!(rx.try_recv().is_err());
        let snap = r.stats().snapshot();
        assert_eq!(snap.checksum_failures, 1);
        assert_eq!(snap.frames_delivered, 0);
    }

    #[test]
    fn test_bad_checksum_ignored() {
        let (mut r, mut rx) = Reassembler::channel(4, OverrunPolicy::Split, ChecksumPolicy::Ignore);
        let mut wire = build_frame(0, 0, 0, &[10, 20]);
        wire[HEADER_SIZE] ^= 0xFF;

        r.on_bytes(&wire);

        assert!(rx.try_recv().is_ok());
        assert_eq!(r.stats().snapshot().checksum_failures, 0);
    }

    #[test]
    fn test_closed_queue_counts_drop() {
        let (mut r, rx) = reassembler(4);
        drop(rx);
        r.on_bytes(&build_frame(0, 0, 0, &[1, 2]));
        assert_eq!(r.stats().snapshot().frames_dropped, 1);
    }
}
