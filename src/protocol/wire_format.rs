//! Wire format of the X4 serial protocol.
//!
//! Scan frames sent by the device:
//! ```text
//! ┌──────────┬──────┬──────┬──────────┬──────────┬──────────┬──────────────┐
//! │ Sync     │ Type │ N    │ FSA      │ LSA      │ Checksum │ Samples      │
//! │ AA 55    │ 1 B  │ 1 B  │ u16 LE   │ u16 LE   │ u16 LE   │ u16 LE × N   │
//! └──────────┴──────┴──────┴──────────┴──────────┴──────────┴──────────────┘
//! ```
//!
//! Commands sent to the device are fixed two-byte opcodes starting with `0xA5`.

/// Two-byte marker that starts every scan frame.
pub const SYNC: [u8; 2] = [0xAA, 0x55];

/// Size of the fixed frame header in bytes.
pub const HEADER_SIZE: usize = 10;

/// Size of one distance sample on the wire.
pub const SAMPLE_SIZE: usize = 2;

/// Largest sample count the header can express.
pub const MAX_SAMPLES: usize = u8::MAX as usize;

/// Capacity of a frame region; every frame the header can describe fits.
pub const FRAME_CAPACITY: usize = HEADER_SIZE + SAMPLE_SIZE * MAX_SAMPLES;

/// Byte offsets inside the header.
pub(crate) mod offset {
    pub const PACKET_TYPE: usize = 2;
    pub const SAMPLE_COUNT: usize = 3;
    pub const START_ANGLE: usize = 4;
    pub const END_ANGLE: usize = 6;
    pub const CHECKSUM: usize = 8;
}

/// Control commands understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Start continuous scanning.
    Start,
    /// Stop scanning.
    Stop,
    /// Request device information.
    Info,
    /// Request health status.
    Status,
    /// Soft reboot.
    Reboot,
}

impl Command {
    /// Two-byte opcode written to the transport.
    pub const fn opcode(self) -> [u8; 2] {
        match self {
            Command::Start => [0xA5, 0x60],
            Command::Stop => [0xA5, 0x65],
            Command::Info => [0xA5, 0x90],
            Command::Status => [0xA5, 0x91],
            Command::Reboot => [0xA5, 0x80],
        }
    }

    /// Name used in log output.
    pub const fn name(self) -> &'static str {
        match self {
            Command::Start => "start scan",
            Command::Stop => "stop scan",
            Command::Info => "device info",
            Command::Status => "health status",
            Command::Reboot => "reboot",
        }
    }
}

/// Check whether a byte slice begins with the frame sync marker.
#[inline]
pub fn starts_with_sync(buf: &[u8]) -> bool {
    buf.len() >= SYNC.len() && buf[..SYNC.len()] == SYNC
}

/// Total frame length implied by a sample count.
#[inline]
pub const fn frame_len(sample_count: u8) -> usize {
    HEADER_SIZE + SAMPLE_SIZE * sample_count as usize
}

/// Decoded scan frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Device-defined packet type (not interpreted).
    pub packet_type: u8,
    /// Number of distance samples following the header.
    pub sample_count: u8,
    /// Raw first-sample angle.
    pub start_angle_raw: u16,
    /// Raw last-sample angle.
    pub end_angle_raw: u16,
    /// Checksum carried on the wire.
    pub checksum: u16,
}

impl FrameHeader {
    /// Decode a header from bytes.
    ///
    /// Returns `None` if the buffer is too short or the sync marker is missing.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE || !starts_with_sync(buf) {
            return None;
        }
        Some(Self {
            packet_type: buf[offset::PACKET_TYPE],
            sample_count: buf[offset::SAMPLE_COUNT],
            start_angle_raw: read_u16(buf, offset::START_ANGLE),
            end_angle_raw: read_u16(buf, offset::END_ANGLE),
            checksum: read_u16(buf, offset::CHECKSUM),
        })
    }

    /// Encode the header into the first `HEADER_SIZE` bytes of `buf`.
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[..2].copy_from_slice(&SYNC);
        buf[offset::PACKET_TYPE] = self.packet_type;
        buf[offset::SAMPLE_COUNT] = self.sample_count;
        buf[offset::START_ANGLE..offset::START_ANGLE + 2]
            .copy_from_slice(&self.start_angle_raw.to_le_bytes());
        buf[offset::END_ANGLE..offset::END_ANGLE + 2]
            .copy_from_slice(&self.end_angle_raw.to_le_bytes());
        buf[offset::CHECKSUM..offset::CHECKSUM + 2].copy_from_slice(&self.checksum.to_le_bytes());
    }

    /// Total frame length this header describes.
    #[inline]
    pub fn frame_len(&self) -> usize {
        frame_len(self.sample_count)
    }
}

/// Read a little-endian u16 at `at`.
#[inline]
pub(crate) fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

/// Compute the frame checksum.
///
/// XOR of every little-endian 16-bit word of the frame except the checksum
/// word itself. `frame` must hold the complete frame (`frame_len` bytes).
pub fn compute_checksum(frame: &[u8]) -> u16 {
    frame
        .chunks_exact(2)
        .enumerate()
        .filter(|(i, _)| i * 2 != offset::CHECKSUM)
        .fold(0u16, |acc, (_, word)| acc ^ u16::from_le_bytes([word[0], word[1]]))
}
