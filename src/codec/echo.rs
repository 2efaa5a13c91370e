//! Echo hiding
//!
//! Embedding convolves the secret with a two-tap kernel (1 at lag 0, `decay`
//! at lag `delay_samples`), fits the result to the cover length and mixes it
//! in at `echo_gain` (0.1 by default).
//!
//! Extraction applies the complementary kernel `[1, 0, .., -decay]` and
//! divides by `1 + decay`. The two kernels are not an exact deconvolution
//! pair and the cover is still present in the stego signal, so the result is
//! a lossy estimate of the echoed secret. Judge it by correlation with the
//! original, never by sample equality. The estimate is not peak-normalized:
//! it keeps the level of the echo component, which stays small next to a
//! full-scale secret.
//!
//! The delay must be shorter than the signal it is applied to.

use super::convolution::fft_convolve;
use super::params::{validate_decay, validate_positive};
use super::{ensure_mono, prepare_pair};
use crate::error::{Result, StegoError};
use crate::signal::normalization::fit_length;
use crate::signal::{Role, SignalBuffer};

/// Convert a delay in seconds to whole samples for a signal of `len` samples
///
/// # Errors
///
/// Returns `StegoError::InvalidParameter` if the delay is not a finite
/// positive value, rounds to zero samples, or is not shorter than `len`.
pub fn delay_samples(delay_seconds: f32, sample_rate: u32, len: usize) -> Result<usize> {
    validate_positive("delay_seconds", delay_seconds)?;
    let samples = (delay_seconds as f64 * sample_rate as f64).round();
    if samples < 1.0 {
        return Err(StegoError::invalid(
            "delay_seconds",
            format!(
                "{} s at {} Hz is shorter than one sample",
                delay_seconds, sample_rate
            ),
        ));
    }
    if samples >= len as f64 {
        return Err(StegoError::invalid(
            "delay_seconds",
            format!(
                "{} s at {} Hz is {} samples, not shorter than the {}-sample signal",
                delay_seconds, sample_rate, samples, len
            ),
        ));
    }
    Ok(samples as usize)
}

/// Two-tap kernel of length `delay + 1`: `tap0` at 0, `tap1` at `delay`
fn two_tap_kernel(delay: usize, tap0: f32, tap1: f32) -> Result<Vec<f32>> {
    let len = delay
        .checked_add(1)
        .ok_or_else(|| StegoError::invalid("delay_seconds", "kernel length overflows"))?;
    let mut kernel = vec![0.0f32; len];
    kernel[0] = tap0;
    kernel[delay] = tap1;
    Ok(kernel)
}

/// Embed `secret` into `cover` as a delayed, attenuated echo
///
/// # Arguments
///
/// * `cover` - Mono cover signal
/// * `secret` - Mono secret at the cover's sample rate
/// * `delay_seconds` - Echo delay (> 0, at least one sample)
/// * `decay` - Weight of the delayed tap, in (0, 1)
/// * `echo_gain` - Amplitude of the echoed secret relative to the cover (> 0)
///
/// # Returns
///
/// Peak-normalized `cover + echo_gain * fit(secret * kernel)`, where `fit`
/// truncates or zero-pads the full convolution to the cover length.
///
/// # Errors
///
/// Returns `StegoError::InvalidParameter` for out-of-range parameters,
/// mismatched rates or multi-channel input; `StegoError::EmptySignal` for
/// empty input.
pub fn embed(
    cover: &SignalBuffer,
    secret: &SignalBuffer,
    delay_seconds: f32,
    decay: f32,
    echo_gain: f32,
) -> Result<SignalBuffer> {
    validate_positive("delay_seconds", delay_seconds)?;
    validate_decay(decay)?;
    validate_positive("echo_gain", echo_gain)?;
    let (cover_samples, secret_samples) = prepare_pair(cover, secret)?;
    let delay = delay_samples(delay_seconds, cover.sample_rate, cover_samples.len())?;

    log::debug!(
        "Echo embed: {} samples, delay={} samples, decay={}, gain={}",
        cover_samples.len(),
        delay,
        decay,
        echo_gain
    );

    let kernel = two_tap_kernel(delay, 1.0, decay)?;
    let mut echo = fft_convolve(&secret_samples, &kernel);
    fit_length(&mut echo, cover_samples.len());

    let samples = cover_samples
        .iter()
        .zip(&echo)
        .map(|(&c, &e)| c + echo_gain * e)
        .collect();

    let mut stego = SignalBuffer::new(samples, cover.sample_rate);
    stego.normalize();
    Ok(stego)
}

/// Estimate the echoed secret in `stego`
///
/// Lossy by construction; see the module documentation. For a stego signal
/// within [-1, 1] the estimate stays within [-1, 1].
///
/// # Errors
///
/// Returns `StegoError::InvalidParameter` for out-of-range parameters, a
/// delay not shorter than `stego` or multi-channel input,
/// `StegoError::EmptySignal` for an empty buffer.
pub fn extract(stego: &SignalBuffer, delay_seconds: f32, decay: f32) -> Result<SignalBuffer> {
    validate_positive("delay_seconds", delay_seconds)?;
    validate_decay(decay)?;
    stego.ensure_not_empty(Role::Stego)?;
    ensure_mono(stego, Role::Stego)?;
    let delay = delay_samples(delay_seconds, stego.sample_rate, stego.len())?;

    log::debug!(
        "Echo extract: {} samples, delay={} samples, decay={}",
        stego.len(),
        delay,
        decay
    );

    let kernel = two_tap_kernel(delay, 1.0, -decay)?;
    let mut estimate = fft_convolve(&stego.samples, &kernel);
    fit_length(&mut estimate, stego.len());

    let norm = 1.0 + decay;
    for x in estimate.iter_mut() {
        *x /= norm;
    }

    Ok(SignalBuffer::new(estimate, stego.sample_rate))
}
