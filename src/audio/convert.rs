//! PCM sample conversion and the base64 wire framing.
//!
//! The wire format on both sides of the session is base64 text wrapping
//! raw 16-bit little-endian PCM. Conversion between i16 and normalized
//! f32 uses asymmetric scaling (32767 up, 32768 down) so the full
//! signed range is usable without overflow: -1.0 maps to exactly
//! -32768 and back.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::AudioError;

/// Convert 16-bit signed PCM samples to normalized floats in [-1, 1].
pub fn pcm_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| f32::from(s) / 32768.0).collect()
}

/// Convert normalized float samples back to 16-bit signed PCM.
///
/// Inputs are clamped to [-1, 1] first. Negative values scale by 32768
/// and positive values by 32767; together with [`pcm_to_f32`] this
/// round-trips every negative sample bit-exactly, including -32768.
pub fn f32_to_pcm(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let s = s.clamp(-1.0, 1.0);
            let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
            scaled.round() as i16
        })
        .collect()
}

/// Encode one block of PCM samples as a base64 wire frame.
pub fn encode_frame(samples: &[i16]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    STANDARD.encode(&bytes)
}

/// Decode a base64 wire frame back into PCM samples.
///
/// Fails on malformed base64 and on byte lengths that are not a
/// multiple of the 2-byte sample width.
pub fn decode_frame(frame: &str) -> Result<Vec<i16>, AudioError> {
    let bytes = STANDARD
        .decode(frame.trim())
        .map_err(|e| AudioError::Decode(e.to_string()))?;
    if bytes.len() % 2 != 0 {
        return Err(AudioError::Decode(format!(
            "odd byte length {} is not valid 16-bit PCM",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_samples_round_trip_exactly() {
        let samples: Vec<i16> = (-32768i32..=0).map(|s| s as i16).collect();
        assert_eq!(f32_to_pcm(&pcm_to_f32(&samples)), samples);
    }

    #[test]
    fn full_scale_negative_round_trips() {
        // -32768 / 32768 = -1.0, and -1.0 * 32768 = -32768. This is the
        // edge the asymmetric scaling exists to support.
        assert_eq!(pcm_to_f32(&[-32768]), vec![-1.0]);
        assert_eq!(f32_to_pcm(&[-1.0]), vec![-32768]);
    }

    #[test]
    fn small_positive_samples_round_trip_exactly() {
        let samples: Vec<i16> = (0..=16384).collect();
        assert_eq!(f32_to_pcm(&pcm_to_f32(&samples)), samples);
    }

    #[test]
    fn large_positive_samples_round_trip_within_one_step() {
        let samples: Vec<i16> = (16385..=32767).collect();
        let rt = f32_to_pcm(&pcm_to_f32(&samples));
        for (&orig, &back) in samples.iter().zip(&rt) {
            assert!(
                (i32::from(orig) - i32::from(back)).abs() <= 1,
                "{orig} came back as {back}"
            );
        }
    }

    #[test]
    fn out_of_range_floats_clamp() {
        assert_eq!(f32_to_pcm(&[2.0, -3.5]), vec![32767, -32768]);
    }

    #[test]
    fn conversion_preserves_length() {
        let samples = vec![0i16, 1, -1, 12345, -12345];
        assert_eq!(pcm_to_f32(&samples).len(), samples.len());
    }

    #[test]
    fn frame_round_trips_through_base64() {
        let samples = vec![0i16, 257, -257, 32767, -32768];
        let frame = encode_frame(&samples);
        assert_eq!(decode_frame(&frame).unwrap(), samples);
    }

    #[test]
    fn frame_carries_two_bytes_per_sample() {
        let samples = vec![1i16; 512];
        let frame = encode_frame(&samples);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&frame)
            .unwrap();
        assert_eq!(bytes.len(), 1024);
    }

    #[test]
    fn distinct_blocks_produce_distinct_frames() {
        let a = encode_frame(&[1i16; 256]);
        let b = encode_frame(&[2i16; 256]);
        let c = encode_frame(&[3i16; 256]);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(decode_frame(&a).unwrap().len(), 256);
        assert_eq!(decode_frame(&b).unwrap().len(), 256);
        assert_eq!(decode_frame(&c).unwrap().len(), 256);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_frame("not!!base64??").is_err());
    }

    #[test]
    fn decode_rejects_odd_byte_length() {
        let frame = STANDARD.encode([1u8, 2, 3]);
        assert!(decode_frame(&frame).is_err());
    }
}
