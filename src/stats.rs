//! Session counters.
//!
//! Counters are lock-free and shared between the reader task and the session
//! handle. Loss on the delivery path shows up here rather than being silent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared atomic counters for one session.
#[derive(Debug, Default)]
pub struct Stats {
    bytes_received: AtomicU64,
    frames_delivered: AtomicU64,
    frames_dropped: AtomicU64,
    chunks_discarded: AtomicU64,
    overruns: AtomicU64,
    checksum_failures: AtomicU64,
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Raw bytes handed to the reassembler.
    pub bytes_received: u64,
    /// Frames placed on the ready queue.
    pub frames_delivered: u64,
    /// Frames lost because the ready queue was full or closed.
    pub frames_dropped: u64,
    /// Chunks discarded as garbage (no header, no pending fragment).
    pub chunks_discarded: u64,
    /// Chunks that carried bytes past the end of a frame.
    pub overruns: u64,
    /// Frames whose checksum did not match.
    pub checksum_failures: u64,
}

impl Stats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[inline]
    pub(crate) fn add_bytes(&self, n: usize) {
        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn frame_delivered(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn chunk_discarded(&self) {
        self.chunks_discarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn overrun(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn checksum_failure(&self) {
        self.checksum_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            chunks_discarded: self.chunks_discarded.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
        }
    }
}
