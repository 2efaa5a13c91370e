//! # sonostego
//!
//! Audio-in-audio steganography: hide one signal (the *secret*) inside another
//! (the *cover*) and recover it later.
//!
//! ## Methods
//!
//! - **LSB**: secret amplitude bits replace the low bits of the 16-bit cover
//!   (blind decode, lossy to `num_bits` of precision)
//! - **Frequency, additive**: `IFFT(FFT(cover) + alpha * FFT(secret))`
//!   (decode needs the cover, near-lossless)
//! - **Frequency, phase**: STFT phase modulation (blind, phase-only proxy)
//! - **Echo**: two-tap echo kernel mixed at low gain (lossy, correlation-level
//!   recovery)
//!
//! When the method of a stego signal is unknown, [`decode_blind`] runs every
//! blind extractor and picks the highest-variance output. It is a heuristic:
//! the per-method scores come back with the choice.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sonostego::{decode, encode, EmbeddingParameters, SignalBuffer};
//!
//! let cover = SignalBuffer::new(vec![0.0f32; 16000], 16000); // Your cover audio
//! let secret = SignalBuffer::new(vec![0.0f32; 16000], 16000); // Your secret audio
//!
//! let params = EmbeddingParameters::lsb(2);
//! let stego = encode(&cover, &secret, &params)?;
//! let extracted = decode(&stego, None, &params)?;
//! # Ok::<(), sonostego::StegoError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Loader (io) -> SignalBuffer -> codec (lsb | frequency | echo) -> SignalBuffer -> Saver (io)
//!                                      \-> selector (blind decode)
//! ```
//!
//! Every codec call is a pure function of its input buffers and parameters;
//! the [`stream`] module drives the same calls frame by frame.

#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod io;
pub mod selector;
pub mod signal;
pub mod stream;

// Re-export main types
pub use codec::{check_lengths, EmbeddingParameters, Method};
pub use config::{FrequencyMode, StegoConfig};
pub use error::{Result, StegoError};
pub use selector::{select_method, Candidate, Selection, SelectorConfig};
pub use signal::{NormalizationOutcome, Role, SignalBuffer};

use codec::{echo, frequency, lsb};
use rayon::prelude::*;

/// Hide `secret` in `cover`
///
/// The shorter buffer is zero-padded to the longer one first; use
/// [`encode_strict`] to reject unequal lengths instead. Both buffers must be
/// mono and share a sample rate.
///
/// # Errors
///
/// Returns `StegoError::InvalidParameter` for out-of-range parameters (checked
/// before anything else), mismatched rates or multi-channel input, and
/// `StegoError::EmptySignal` for empty buffers.
///
/// # Example
///
/// ```
/// use sonostego::{encode, EmbeddingParameters, SignalBuffer};
///
/// let cover = SignalBuffer::new(vec![0.5, -0.25, 0.125, 0.0], 8000);
/// let secret = SignalBuffer::new(vec![1.0, -1.0], 8000);
/// let stego = encode(&cover, &secret, &EmbeddingParameters::lsb(2))?;
/// assert_eq!(stego.len(), 4);
/// # Ok::<(), sonostego::StegoError>(())
/// ```
pub fn encode(
    cover: &SignalBuffer,
    secret: &SignalBuffer,
    params: &EmbeddingParameters,
) -> Result<SignalBuffer> {
    params.validate()?;
    log::debug!(
        "Encoding with {}: cover {} samples, secret {} samples",
        params.method(),
        cover.len(),
        secret.len()
    );

    match *params {
        EmbeddingParameters::Lsb { num_bits } => lsb::embed(cover, secret, num_bits),
        EmbeddingParameters::FrequencyAdditive { alpha } => {
            frequency::embed_additive(cover, secret, alpha)
        }
        EmbeddingParameters::FrequencyPhase {
            strength,
            frame_size,
            hop_size,
        } => frequency::embed_phase(cover, secret, strength, frame_size, hop_size),
        EmbeddingParameters::Echo {
            delay_seconds,
            decay,
            echo_gain,
        } => echo::embed(cover, secret, delay_seconds, decay, echo_gain),
    }
}

/// Like [`encode`], but fails with `StegoError::LengthMismatch` instead of
/// padding when cover and secret lengths differ
pub fn encode_strict(
    cover: &SignalBuffer,
    secret: &SignalBuffer,
    params: &EmbeddingParameters,
) -> Result<SignalBuffer> {
    params.validate()?;
    check_lengths(cover, secret)?;
    encode(cover, secret, params)
}

/// Recover the secret from `stego` with a known method
///
/// `cover` is required for [`EmbeddingParameters::FrequencyAdditive`] and
/// ignored otherwise.
///
/// # Errors
///
/// Returns `StegoError::NonBlindDecodeWithoutCover` when additive frequency
/// decoding is requested without a cover, plus the errors of [`encode`].
pub fn decode(
    stego: &SignalBuffer,
    cover: Option<&SignalBuffer>,
    params: &EmbeddingParameters,
) -> Result<SignalBuffer> {
    params.validate()?;
    log::debug!(
        "Decoding with {}: {} samples",
        params.method(),
        stego.len()
    );

    match *params {
        EmbeddingParameters::Lsb { num_bits } => lsb::extract(stego, num_bits),
        EmbeddingParameters::FrequencyAdditive { alpha } => {
            frequency::extract_additive(stego, cover, alpha)
        }
        EmbeddingParameters::FrequencyPhase {
            strength,
            frame_size,
            hop_size,
        } => frequency::extract_phase(stego, strength, frame_size, hop_size),
        EmbeddingParameters::Echo {
            delay_seconds,
            decay,
            ..
        } => echo::extract(stego, delay_seconds, decay),
    }
}

/// Recover a secret without knowing the method
///
/// See [`selector`] for how the candidate is chosen.
pub fn decode_blind(stego: &SignalBuffer, config: &SelectorConfig) -> Result<Selection> {
    select_method(stego, config)
}

fn ensure_channels(buffer: &SignalBuffer, role: Role) -> Result<()> {
    if buffer.channels == 0 {
        return Err(StegoError::invalid(
            "channels",
            format!("{} buffer has no channels", role),
        ));
    }
    Ok(())
}

/// [`encode`] every channel of `cover` independently, in parallel
///
/// Cover channel `i` carries secret channel `i % secret.channels`, so a mono
/// secret is hidden in every cover channel.
pub fn encode_channels(
    cover: &SignalBuffer,
    secret: &SignalBuffer,
    params: &EmbeddingParameters,
) -> Result<SignalBuffer> {
    params.validate()?;
    ensure_channels(cover, Role::Cover)?;
    ensure_channels(secret, Role::Secret)?;

    let cover_parts = cover.split_channels();
    let secret_parts = secret.split_channels();
    log::debug!(
        "Encoding {} cover channels with {} secret channels",
        cover_parts.len(),
        secret_parts.len()
    );

    let encoded = cover_parts
        .par_iter()
        .enumerate()
        .map(|(i, part)| encode(part, &secret_parts[i % secret_parts.len()], params))
        .collect::<Result<Vec<_>>>()?;

    SignalBuffer::merge_channels(encoded)
}

/// [`decode`] every channel of `stego` independently, in parallel
///
/// Stego channel `i` is paired with cover channel `i % cover.channels` when a
/// cover is given.
pub fn decode_channels(
    stego: &SignalBuffer,
    cover: Option<&SignalBuffer>,
    params: &EmbeddingParameters,
) -> Result<SignalBuffer> {
    params.validate()?;
    ensure_channels(stego, Role::Stego)?;
    if let Some(cover) = cover {
        ensure_channels(cover, Role::Cover)?;
    }

    let stego_parts = stego.split_channels();
    let cover_parts = cover.map(SignalBuffer::split_channels);

    let decoded = stego_parts
        .par_iter()
        .enumerate()
        .map(|(i, part)| {
            let cover = cover_parts.as_ref().map(|parts| &parts[i % parts.len()]);
            decode(part, cover, params)
        })
        .collect::<Result<Vec<_>>>()?;

    SignalBuffer::merge_channels(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| (i as f32 / len as f32) * 2.0 - 1.0).collect()
    }

    #[test]
    fn test_parameters_checked_before_signals() {
        let empty = SignalBuffer::silence(0, 8000);
        let err = encode(&empty, &empty, &EmbeddingParameters::lsb(0)).unwrap_err();
        assert!(matches!(err, StegoError::InvalidParameter { name: "num_bits", .. }));
    }

    #[test]
    fn test_encode_pads_and_strict_rejects() {
        let cover = SignalBuffer::new(ramp(100), 8000);
        let secret = SignalBuffer::new(ramp(60), 8000);
        let params = EmbeddingParameters::lsb(3);

        let stego = encode(&cover, &secret, &params).unwrap();
        assert_eq!(stego.len(), 100);

        assert!(matches!(
            encode_strict(&cover, &secret, &params),
            Err(StegoError::LengthMismatch { cover: 100, secret: 60 })
        ));
    }

    #[test]
    fn test_additive_decode_without_cover() {
        let stego = SignalBuffer::new(ramp(64), 8000);
        let err = decode(&stego, None, &EmbeddingParameters::frequency_additive(0.1)).unwrap_err();
        assert!(matches!(err, StegoError::NonBlindDecodeWithoutCover));
    }

    #[test]
    fn test_channels_encode_and_decode() {
        let left = ramp(256);
        let right: Vec<f32> = ramp(256).into_iter().map(|x| -x * 0.5).collect();
        let mut interleaved = Vec::with_capacity(512);
        for (l, r) in left.iter().zip(&right) {
            interleaved.push(*l);
            interleaved.push(*r);
        }
        let cover = SignalBuffer::with_channels(interleaved, 8000, 2);
        let secret = SignalBuffer::new(ramp(256).into_iter().map(|x| x * 0.8).collect(), 8000);
        let params = EmbeddingParameters::lsb(4);

        let stego = encode_channels(&cover, &secret, &params).unwrap();
        assert_eq!(stego.channels, 2);
        assert_eq!(stego.len(), 512);

        let extracted = decode_channels(&stego, None, &params).unwrap();
        let parts = extracted.split_channels();
        // A mono secret is carried by both channels
        assert_eq!(parts[0].samples, parts[1].samples);
        let expected = lsb::quantize(&secret.samples, 4);
        for (a, b) in parts[0].samples.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_channel_decode_pairs_covers() {
        let cover = SignalBuffer::with_channels(ramp(200), 8000, 2);
        let secret = SignalBuffer::with_channels(ramp(200).into_iter().rev().collect(), 8000, 2);
        let params = EmbeddingParameters::frequency_additive(0.5);

        let stego = encode_channels(&cover, &secret, &params).unwrap();
        let extracted = decode_channels(&stego, Some(&cover), &params).unwrap();
        assert_eq!(extracted.channels, 2);
        assert_eq!(extracted.len(), 200);

        assert!(matches!(
            decode_channels(&stego, None, &params),
            Err(StegoError::NonBlindDecodeWithoutCover)
        ));
    }
}
