//! Frame struct with typed accessors.
//!
//! A [`Frame`] is always the full fixed-capacity region handed off by the
//! reassembler. Bytes past the semantic end of the frame are zero; readers
//! re-derive validity from the header fields.
//!
//! # Example
//!
//! ```
//! use x4lidar::protocol::{build_frame, Frame, FRAME_CAPACITY};
//!
//! let wire = build_frame(0x00, 0x0140, 0x2D00, &[400, 800, 1200]);
//! let frame = Frame::from_wire(&wire);
//!
//! assert_eq!(frame.as_bytes().len(), FRAME_CAPACITY);
//! assert_eq!(frame.sample_count(), 3);
//! assert!(frame.checksum_valid());
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{
    compute_checksum, frame_len, offset, read_u16, starts_with_sync, FrameHeader,
    FRAME_CAPACITY, HEADER_SIZE, SAMPLE_SIZE,
};

/// A reassembled scan frame.
///
/// Cloning is cheap: the region is shared through `bytes::Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    raw: Bytes,
}

impl Frame {
    /// Copy wire bytes into a zeroed fixed-capacity region.
    ///
    /// Bytes beyond `FRAME_CAPACITY` are dropped.
    pub fn from_wire(bytes: &[u8]) -> Self {
        let mut region = BytesMut::zeroed(FRAME_CAPACITY);
        let n = bytes.len().min(FRAME_CAPACITY);
        region[..n].copy_from_slice(&bytes[..n]);
        Self {
            raw: region.freeze(),
        }
    }

    /// Wrap an already-filled region.
    pub(crate) fn from_region(raw: Bytes) -> Self {
        debug_assert_eq!(raw.len(), FRAME_CAPACITY);
        Self { raw }
    }

    /// The full fixed-capacity region.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// The bytes covered by the header's sample count.
    #[inline]
    pub fn wire_bytes(&self) -> &[u8] {
        &self.raw[..self.wire_len()]
    }

    /// Frame length implied by the header.
    #[inline]
    pub fn wire_len(&self) -> usize {
        frame_len(self.sample_count())
    }

    /// Check the `0xAA 0x55` sync marker.
    #[inline]
    pub fn has_sync(&self) -> bool {
        starts_with_sync(&self.raw)
    }

    /// Decoded header, or `None` if the sync marker is missing.
    pub fn header(&self) -> Option<FrameHeader> {
        FrameHeader::decode(&self.raw)
    }

    /// Device-defined packet type.
    #[inline]
    pub fn packet_type(&self) -> u8 {
        self.raw[offset::PACKET_TYPE]
    }

    /// Number of distance samples.
    #[inline]
    pub fn sample_count(&self) -> u8 {
        self.raw[offset::SAMPLE_COUNT]
    }

    #[inline]
    pub fn start_angle_raw(&self) -> u16 {
        read_u16(&self.raw, offset::START_ANGLE)
    }

    #[inline]
    pub fn end_angle_raw(&self) -> u16 {
        read_u16(&self.raw, offset::END_ANGLE)
    }

    /// Checksum as carried on the wire.
    #[inline]
    pub fn checksum(&self) -> u16 {
        read_u16(&self.raw, offset::CHECKSUM)
    }

    /// Raw distance code of sample `index` (0-based).
    ///
    /// Returns `None` past the header's sample count.
    pub fn distance_code(&self, index: usize) -> Option<u16> {
        if index >= self.sample_count() as usize {
            return None;
        }
        Some(read_u16(&self.raw, HEADER_SIZE + index * SAMPLE_SIZE))
    }

    /// Iterate raw distance codes in wire order.
    pub fn distance_codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.raw[HEADER_SIZE..self.wire_len()]
            .chunks_exact(SAMPLE_SIZE)
            .map(|w| u16::from_le_bytes([w[0], w[1]]))
    }

    /// Checksum recomputed over the frame contents.
    pub fn computed_checksum(&self) -> u16 {
        compute_checksum(self.wire_bytes())
    }

    /// Whether the wire checksum matches the contents.
    pub fn checksum_valid(&self) -> bool {
        self.has_sync() && self.checksum() == self.computed_checksum()
    }
}

/// Build a complete wire frame with a correct checksum.
///
/// Useful for simulators and tests. At most 255 distance codes are used.
pub fn build_frame(
    packet_type: u8,
    start_angle_raw: u16,
    end_angle_raw: u16,
    distance_codes: &[u16],
) -> Vec<u8> {
    let codes = &distance_codes[..distance_codes.len().min(u8::MAX as usize)];
    let mut header = FrameHeader {
        packet_type,
        sample_count: codes.len() as u8,
        start_angle_raw,
        end_angle_raw,
        checksum: 0,
    };

    let mut buf = vec![0u8; header.frame_len()];
    header.encode_into(&mut buf);
    for (i, code) in codes.iter().enumerate() {
        let at = HEADER_SIZE + i * SAMPLE_SIZE;
        buf[at..at + SAMPLE_SIZE].copy_from_slice(&code.to_le_bytes());
    }

    header.checksum = compute_checksum(&buf);
    header.encode_into(&mut buf);
    buf
}
