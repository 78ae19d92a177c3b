//! Scan frame decoding.
//!
//! Turns one frame into `(distance_mm, angle_deg)` samples in wire order.
//!
//! - Angles are carried in the upper 15 bits of a 16-bit field in 1/64°
//!   units; the low bit is a check bit and is ignored.
//! - Sample angles are interpolated linearly between the first-sample angle
//!   (FSA) and last-sample angle (LSA). When LSA < FSA the sweep crossed 0°
//!   and LSA is unwrapped by +360° before interpolating.
//! - Each angle gets a distance-dependent correction for the offset between
//!   the laser and the sensor:
//!   `atan(21.8 * (155.3 - d) / (155.3 * d))` degrees, and 0 for `d == 0`.
//! - Emitted angles are normalized into `[0, 360)`.
//!
//! # Example
//!
//! ```
//! use x4lidar::decoder::decode;
//! use x4lidar::protocol::{build_frame, Frame};
//!
//! let frame = Frame::from_wire(&build_frame(0, 0x0140, 0x2D00, &[400, 800, 1200]));
//! let samples = decode(&frame).unwrap();
//!
//! assert_eq!(samples.len(), 3);
//! assert_eq!(samples[0].distance_mm, 100.0);
//! assert!(samples.iter().all(|s| (0.0..360.0).contains(&s.angle_deg)));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{LidarError, Result};
use crate::protocol::Frame;

/// Raw angle units per degree.
pub const ANGLE_UNITS_PER_DEGREE: f32 = 64.0;

/// Raw distance units per millimetre.
pub const DISTANCE_UNITS_PER_MM: f32 = 4.0;

const CORRECTION_GAIN: f32 = 21.8;
const CORRECTION_PIVOT_MM: f32 = 155.3;

/// One range measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Distance in millimetres; 0 means no return.
    pub distance_mm: f32,
    /// Corrected angle in degrees, in `[0, 360)`.
    pub angle_deg: f32,
}

/// Convert a raw angle field to degrees.
#[inline]
pub fn raw_angle_to_degrees(raw: u16) -> f32 {
    (raw >> 1) as f32 / ANGLE_UNITS_PER_DEGREE
}

/// Convert a raw distance code to millimetres.
#[inline]
pub fn raw_distance_to_mm(code: u16) -> f32 {
    code as f32 / DISTANCE_UNITS_PER_MM
}

/// Angular correction in degrees for a measured distance.
pub fn angle_correction(distance_mm: f32) -> f32 {
    if distance_mm <= 0.0 {
        return 0.0;
    }
    (CORRECTION_GAIN * (CORRECTION_PIVOT_MM - distance_mm) / (CORRECTION_PIVOT_MM * distance_mm))
        .atan()
        .to_degrees()
}

/// Reduce an angle into `[0, 360)`.
#[inline]
pub fn normalize_angle(deg: f32) -> f32 {
    let a = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Decode a frame into samples.
///
/// # Errors
///
/// - [`LidarError::InvalidHeader`] if the sync marker is missing.
/// - [`LidarError::EmptyFrame`] if the frame has fewer than two samples.
pub fn decode(frame: &Frame) -> Result<Vec<Sample>> {
    Ok(unwrapped_samples(frame)?
        .into_iter()
        .map(|s| Sample {
            distance_mm: s.distance_mm,
            angle_deg: normalize_angle(s.angle_deg),
        })
        .collect())
}

/// Decode a frame, first rejecting it if the wire checksum does not match.
pub fn decode_checked(frame: &Frame) -> Result<Vec<Sample>> {
    if !frame.has_sync() {
        return Err(LidarError::InvalidHeader);
    }
    let actual = frame.computed_checksum();
    if frame.checksum() != actual {
        return Err(LidarError::ChecksumMismatch {
            expected: frame.checksum(),
            actual,
        });
    }
    decode(frame)
}

/// Samples with corrected but not yet normalized angles.
fn unwrapped_samples(frame: &Frame) -> Result<Vec<Sample>> {
    if !frame.has_sync() {
        return Err(LidarError::InvalidHeader);
    }
    let n = frame.sample_count();
    if n < 2 {
        return Err(LidarError::EmptyFrame(n));
    }

    let start = normalize_angle(raw_angle_to_degrees(frame.start_angle_raw()));
    let mut end = normalize_angle(raw_angle_to_degrees(frame.end_angle_raw()));
    if end < start {
        end += 360.0;
    }

    let last = n as usize - 1;
    let step = (end - start) / last as f32;

    Ok(frame
        .distance_codes()
        .enumerate()
        .map(|(i, code)| {
            let distance_mm = raw_distance_to_mm(code);
            let base = match i {
                0 => start,
                i if i == last => end,
                i => start + step * i as f32,
            };
            Sample {
                distance_mm,
                angle_deg: base + angle_correction(distance_mm),
            }
        })
        .collect())
}
