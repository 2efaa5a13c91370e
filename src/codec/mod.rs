//! Steganographic codecs
//!
//! Each codec is a pure function from input buffers and parameters to a new
//! buffer; nothing is kept between calls.
//!
//! - [`lsb`]: bit substitution on 16-bit samples (blind decode)
//! - [`frequency`]: additive spectrum mixing (non-blind) and STFT phase
//!   modulation (blind)
//! - [`echo`]: two-tap echo kernel embedding with an approximate inverse
//!
//! [`stft`] and [`convolution`] hold the FFT plumbing shared by the
//! frequency and echo codecs.

pub mod convolution;
pub mod echo;
pub mod frequency;
pub mod lsb;
pub mod params;
pub mod stft;

pub use params::{EmbeddingParameters, Method};

use crate::error::{Result, StegoError};
use crate::signal::normalization::pad_to_match;
use crate::signal::{Role, SignalBuffer};

/// Codecs operate on one channel at a time
pub(crate) fn ensure_mono(buffer: &SignalBuffer, role: Role) -> Result<()> {
    if buffer.channels != 1 {
        return Err(StegoError::invalid(
            "channels",
            format!(
                "{} buffer has {} channels; split channels before calling a codec",
                role, buffer.channels
            ),
        ));
    }
    Ok(())
}

/// Validate a cover/secret pair and zero-pad the shorter one
///
/// Padding (never truncation) is the length policy. Callers that want a hard
/// failure instead use [`check_lengths`] first.
pub(crate) fn prepare_pair(
    cover: &SignalBuffer,
    secret: &SignalBuffer,
) -> Result<(Vec<f32>, Vec<f32>)> {
    prepare_pair_roles(cover, Role::Cover, secret, Role::Secret)
}

pub(crate) fn prepare_pair_roles(
    first: &SignalBuffer,
    first_role: Role,
    second: &SignalBuffer,
    second_role: Role,
) -> Result<(Vec<f32>, Vec<f32>)> {
    first.ensure_not_empty(first_role)?;
    second.ensure_not_empty(second_role)?;
    ensure_mono(first, first_role)?;
    ensure_mono(second, second_role)?;

    if first.sample_rate != second.sample_rate {
        return Err(StegoError::invalid(
            "sample_rate",
            format!(
                "{} is {} Hz but {} is {} Hz; resample first",
                first_role, first.sample_rate, second_role, second.sample_rate
            ),
        ));
    }

    let mut a = first.samples.clone();
    let mut b = second.samples.clone();
    if a.len() != b.len() {
        log::debug!(
            "Zero-padding {} ({} samples) and {} ({} samples) to a common length",
            first_role,
            a.len(),
            second_role,
            b.len()
        );
        pad_to_match(&mut a, &mut b);
    }
    Ok((a, b))
}

/// Fail with `LengthMismatch` unless cover and secret already have equal length
pub fn check_lengths(cover: &SignalBuffer, secret: &SignalBuffer) -> Result<()> {
    if cover.len() != secret.len() {
        return Err(StegoError::LengthMismatch {
            cover: cover.len(),
            secret: secret.len(),
        });
    }
    Ok(())
}
