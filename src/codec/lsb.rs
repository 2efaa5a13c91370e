//! Least-significant-bit substitution
//!
//! The cover is quantized to 16-bit integers and its lowest `num_bits` bits are
//! replaced with the top `num_bits` bits of the secret. Extraction reads those
//! low bits back without needing the cover.
//!
//! # Algorithm
//!
//! 1. Cover: `c = clamp(round(cover * 32767))` as `i16`
//! 2. Secret: offset-binary 16-bit view `u = round((secret + 1) / 2 * 65535)`;
//!    its high byte is masked with `(0xFF << (8 - n)) & 0xFF` and shifted down
//!    into the low `n` bits, giving a code in `0..2^n`
//! 3. Stego: `(c & !((1 << n) - 1)) | code`, converted back with `/ 32767`
//! 4. Extract: `(stego_i16 & ((1 << n) - 1)) / ((1 << n) - 1)`
//!
//! The secret survives only to `n` bits of precision, and the extracted signal
//! lives in [0, 1] with negative secret samples below 0.5. Stego output is not
//! peak-normalized: rescaling would shift the integer grid and wipe the payload.
//!
//! # Example
//!
//! ```
//! use sonostego::codec::lsb;
//! use sonostego::SignalBuffer;
//!
//! let cover = SignalBuffer::new(vec![0.5, -0.25, 0.75, 0.0], 16000);
//! let secret = SignalBuffer::new(vec![1.0, -1.0, 0.6, -0.6], 16000);
//!
//! let stego = lsb::embed(&cover, &secret, 2)?;
//! let extracted = lsb::extract(&stego, 2)?;
//! assert_eq!(extracted.samples, lsb::quantize(&secret.samples, 2));
//! # Ok::<(), sonostego::StegoError>(())
//! ```

use super::params::validate_num_bits;
use super::{ensure_mono, prepare_pair};
use crate::error::Result;
use crate::signal::{Role, SignalBuffer};

/// Full-scale value used for float <-> 16-bit conversion
pub(crate) const I16_SCALE: f32 = 32767.0;

/// Quantize a normalized sample to 16 bits, clamping instead of wrapping
pub(crate) fn to_i16(x: f32) -> i16 {
    (x * I16_SCALE)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

pub(crate) fn from_i16(x: i16) -> f32 {
    x as f32 / I16_SCALE
}

/// Mask selecting the top `num_bits` bits of a byte
fn byte_mask(num_bits: u8) -> u8 {
    ((0xFFu16 << (8 - num_bits)) & 0xFF) as u8
}

/// Mask selecting the low `num_bits` bits of a sample
fn low_mask(num_bits: u8) -> u16 {
    (1u16 << num_bits) - 1
}

/// Top `num_bits` of the secret sample's offset-binary 16-bit view
fn secret_code(x: f32, num_bits: u8) -> u16 {
    let offset = ((x.clamp(-1.0, 1.0) + 1.0) * 0.5 * 65535.0).round() as u16;
    let high_byte = (offset >> 8) as u8;
    ((high_byte & byte_mask(num_bits)) >> (8 - num_bits)) as u16
}

/// The `num_bits` quantization of `secret` that [`extract`] recovers
///
/// Each sample maps to `code / (2^num_bits - 1)` in [0, 1]. `num_bits` must
/// already be in 1..=8.
pub fn quantize(secret: &[f32], num_bits: u8) -> Vec<f32> {
    let mask = low_mask(num_bits) as f32;
    secret
        .iter()
        .map(|&x| secret_code(x, num_bits) as f32 / mask)
        .collect()
}

/// Hide `secret` in the low bits of `cover`
///
/// The shorter buffer is zero-padded to the longer one first.
///
/// # Errors
///
/// Returns `StegoError::InvalidParameter` if `num_bits` is outside 1..=8 or the
/// buffers are not mono at one sample rate, and `StegoError::EmptySignal` if
/// either buffer is empty.
pub fn embed(cover: &SignalBuffer, secret: &SignalBuffer, num_bits: u8) -> Result<SignalBuffer> {
    validate_num_bits(num_bits)?;
    let (cover_samples, secret_samples) = prepare_pair(cover, secret)?;

    log::debug!(
        "LSB embed: {} samples, {} bits per sample",
        cover_samples.len(),
        num_bits
    );

    let clear = !low_mask(num_bits);
    let stego = cover_samples
        .iter()
        .zip(&secret_samples)
        .map(|(&c, &s)| {
            let bits = (to_i16(c) as u16 & clear) | secret_code(s, num_bits);
            from_i16(bits as i16)
        })
        .collect();

    Ok(SignalBuffer::new(stego, cover.sample_rate))
}

/// Read the hidden `num_bits` back out of `stego`
///
/// # Errors
///
/// Returns `StegoError::InvalidParameter` for an out-of-range `num_bits` or a
/// multi-channel buffer, `StegoError::EmptySignal` for an empty one.
pub fn extract(stego: &SignalBuffer, num_bits: u8) -> Result<SignalBuffer> {
    validate_num_bits(num_bits)?;
    stego.ensure_not_empty(Role::Stego)?;
    ensure_mono(stego, Role::Stego)?;

    log::debug!(
        "LSB extract: {} samples, {} bits per sample",
        stego.len(),
        num_bits
    );

    let mask = low_mask(num_bits);
    let samples = stego
        .samples
        .iter()
        .map(|&x| ((to_i16(x) as u16) & mask) as f32 / mask as f32)
        .collect();

    Ok(SignalBuffer::new(samples, stego.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_masks() {
        assert_eq!(byte_mask(1), 0x80);
        assert_eq!(byte_mask(2), 0xC0);
        assert_eq!(byte_mask(8), 0xFF);
        assert_eq!(low_mask(1), 0b1);
        assert_eq!(low_mask(3), 0b111);
        assert_eq!(low_mask(8), 0xFF);
    }

    #[test]
    fn test_secret_code_extremes() {
        assert_eq!(secret_code(-1.0, 2), 0);
        assert_eq!(secret_code(1.0, 2), 3);
        assert_eq!(secret_code(-0.01, 1), 0);
        assert_eq!(secret_code(0.01, 1), 1);
        // Out-of-range input clamps instead of wrapping
        assert_eq!(secret_code(7.5, 4), 15);
        assert_eq!(secret_code(-7.5, 4), 0);
    }

    #[test]
    fn test_to_i16_clamps() {
        assert_eq!(to_i16(1.0), 32767);
        assert_eq!(to_i16(2.0), i16::MAX);
        assert_eq!(to_i16(-2.0), i16::MIN);
        assert_eq!(to_i16(0.0), 0);
    }

    #[test]
    fn test_cover_high_bits_preserved() {
        let cover = SignalBuffer::new(vec![0.9, -0.9, 0.123, -0.456, 0.0], 8000);
        let secret = SignalBuffer::new(vec![0.3, -0.7, 1.0, -1.0, 0.5], 8000);

        for bits in 1..=8u8 {
            let stego = embed(&cover, &secret, bits).unwrap();
            let clear = !low_mask(bits);
            for (c, s) in cover.samples.iter().zip(&stego.samples) {
                assert_eq!(
                    to_i16(*c) as u16 & clear,
                    to_i16(*s) as u16 & clear,
                    "high bits changed at {} bits",
                    bits
                );
            }
        }
    }

    #[test]
    fn test_clipped_cover_keeps_top_bits() {
        let cover = SignalBuffer::new(vec![1.5, -1.5], 8000);
        let secret = SignalBuffer::new(vec![-1.0, 1.0], 8000);
        let stego = embed(&cover, &secret, 2).unwrap();

        assert!(stego.samples[0] > 0.99, "positive clip wrapped: {}", stego.samples[0]);
        assert!(stego.samples[1] < -0.99, "negative clip wrapped: {}", stego.samples[1]);
    }

    #[test]
    fn test_pads_shorter_secret() {
        let cover = SignalBuffer::new(vec![0.5; 10], 8000);
        let secret = SignalBuffer::new(vec![1.0; 4], 8000);
        let stego = embed(&cover, &secret, 1).unwrap();
        let extracted = extract(&stego, 1).unwrap();

        assert_eq!(stego.len(), 10);
        assert_eq!(&extracted.samples[..4], &[1.0; 4]);
        // Zero padding quantizes to the upper half code at 1 bit
        assert!(extracted.samples[4..].iter().all(|&x| x == 1.0));
    }

    #[test]
    fn test_invalid_bits_rejected() {
        let buffer = SignalBuffer::new(vec![0.0; 4], 8000);
        assert!(embed(&buffer, &buffer, 0).is_err());
        assert!(embed(&buffer, &buffer, 9).is_err());
        assert!(extract(&buffer, 9).is_err());
    }

    #[test]
    fn test_silent_cover() {
        let cover = SignalBuffer::silence(256, 8000);
        let secret = SignalBuffer::new(vec![0.25; 256], 8000);
        let stego = embed(&cover, &secret, 3).unwrap();
        assert_eq!(stego.len(), 256);
    }

    proptest! {
        #[test]
        fn prop_round_trip_matches_quantization(
            pairs in prop::collection::vec((-1.0f32..=1.0, -1.0f32..=1.0), 1..256),
            num_bits in 1u8..=8,
        ) {
            let (cover, secret): (Vec<f32>, Vec<f32>) = pairs.into_iter().unzip();
            let cover = SignalBuffer::new(cover, 16000);
            let secret = SignalBuffer::new(secret, 16000);

            let stego = embed(&cover, &secret, num_bits).unwrap();
            let extracted = extract(&stego, num_bits).unwrap();
            let expected = quantize(&secret.samples, num_bits);
            let tolerance = 1.0 / low_mask(num_bits) as f32;

            prop_assert_eq!(extracted.len(), expected.len());
            for (got, want) in extracted.samples.iter().zip(&expected) {
                prop_assert!((got - want).abs() < tolerance);
            }
        }
    }
}
