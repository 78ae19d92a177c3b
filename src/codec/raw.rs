//! Raw codec - packed `f32` sample pairs.
//!
//! Each sample is written as two little-endian `f32` values, distance first,
//! then angle. Datagrams hold exactly [`DATAGRAM_PAIRS`] pairs; a short batch
//! is padded with zero-distance pairs, which receivers treat as no return.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::decoder::Sample;

/// Bytes per encoded sample.
pub const PAIR_SIZE: usize = 2 * std::mem::size_of::<f32>();

/// Samples per datagram.
pub const DATAGRAM_PAIRS: usize = 40;

/// Bytes per datagram (80 `f32` values).
pub const DATAGRAM_SIZE: usize = DATAGRAM_PAIRS * PAIR_SIZE;

/// Packed `f32` pair codec.
pub struct RawCodec;

impl RawCodec {
    /// Pack samples without padding.
    pub fn encode(samples: &[Sample]) -> Bytes {
        let mut buf = BytesMut::with_capacity(samples.len() * PAIR_SIZE);
        for sample in samples {
            Self::put_sample(&mut buf, sample);
        }
        buf.freeze()
    }

    /// Pack samples into fixed-size datagrams.
    ///
    /// An empty input yields no datagrams.
    pub fn encode_datagrams(samples: &[Sample]) -> Vec<Bytes> {
        samples
            .chunks(DATAGRAM_PAIRS)
            .map(|batch| {
                let mut buf = BytesMut::with_capacity(DATAGRAM_SIZE);
                for sample in batch {
                    Self::put_sample(&mut buf, sample);
                }
                buf.put_bytes(0, DATAGRAM_SIZE - buf.len());
                buf.freeze()
            })
            .collect()
    }

    /// Unpack every complete pair. A trailing partial pair is ignored.
    pub fn decode(mut data: &[u8]) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(data.len() / PAIR_SIZE);
        while data.remaining() >= PAIR_SIZE {
            samples.push(Sample {
                distance_mm: data.get_f32_le(),
                angle_deg: data.get_f32_le(),
            });
        }
        samples
    }

    /// Unpack a datagram, dropping zero-distance padding.
    pub fn decode_datagram(data: &[u8]) -> Vec<Sample> {
        Self::decode(data)
            .into_iter()
            .filter(|s| s.distance_mm != 0.0)
            .collect()
    }

    #[inline]
    fn put_sample(buf: &mut BytesMut, sample: &Sample) {
        buf.put_f32_le(sample.distance_mm);
        buf.put_f32_le(sample.angle_deg);
    }
}
