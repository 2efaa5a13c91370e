//! Frequency-domain hiding
//!
//! Two incompatible designs live side by side and are selected explicitly:
//!
//! - **Additive** (non-blind): `stego = IFFT(FFT(cover) + alpha * FFT(secret))`.
//!   Decoding subtracts the cover spectrum, so it needs the cover. This is the
//!   only frequency mode that can recover the secret almost exactly.
//! - **Phase** (blind): the cover's STFT phase is shifted by
//!   `strength * angle(secret STFT)` while the cover magnitude is kept.
//!   Decoding reads `angle(stego STFT) / strength`. Magnitude is not
//!   recoverable, so the output is only a phase-derived proxy of the secret.
//!
//! All outputs are peak-normalized.
//!
//! # Additive decoding and normalization
//!
//! The stego signal was divided by its own peak `m` after mixing, and that gain
//! is not stored anywhere. Before subtracting the cover, the decoder rescales
//! the stego by the least-squares estimate `g = <c, c> / <y, c>`, which equals
//! `m` exactly when the secret is orthogonal to the cover.
//!
//! In general the decoder returns the secret with its projection on the cover
//! removed: `s - (<s, c> / <c, c>) c`, peak-normalized. For an orthogonal pair
//! that is the secret itself. Beyond that, the error is the `f32` round-off of
//! the stored stego amplified by `|c| / (alpha |s|)`, about 1e-6 relative (L2)
//! at `alpha = 0.1` for comparable cover and secret levels.

use super::params::{validate_frame, validate_positive};
use super::stft::Stft;
use super::{ensure_mono, prepare_pair, prepare_pair_roles};
use crate::error::{Result, StegoError};
use crate::signal::{Role, SignalBuffer};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Below this, `<stego, cover>` is treated as zero when estimating the gain
const EPSILON: f64 = 1e-12;

fn to_complex(samples: &[f32]) -> Vec<Complex<f64>> {
    samples
        .iter()
        .map(|&x| Complex::new(x as f64, 0.0))
        .collect()
}

fn spectrum(samples: &[f32], planner: &mut FftPlanner<f64>) -> Vec<Complex<f64>> {
    let mut buffer = to_complex(samples);
    planner.plan_fft_forward(buffer.len()).process(&mut buffer);
    buffer
}

/// Inverse FFT, real part, scaled by 1/N
fn real_inverse(mut bins: Vec<Complex<f64>>, planner: &mut FftPlanner<f64>) -> Vec<f32> {
    let n = bins.len();
    planner.plan_fft_inverse(n).process(&mut bins);
    let scale = 1.0 / n as f64;
    bins.iter().map(|c| (c.re * scale) as f32).collect()
}

/// Embed `secret` into `cover` by adding its weighted spectrum
///
/// # Arguments
///
/// * `cover` - Mono cover signal
/// * `secret` - Mono secret signal at the cover's sample rate
/// * `alpha` - Weight of the secret spectrum (> 0)
///
/// # Returns
///
/// Peak-normalized stego signal with the padded common length
///
/// # Errors
///
/// Returns `StegoError::InvalidParameter` for a non-positive `alpha`,
/// mismatched rates or multi-channel input, `StegoError::EmptySignal` for
/// empty input.
pub fn embed_additive(
    cover: &SignalBuffer,
    secret: &SignalBuffer,
    alpha: f32,
) -> Result<SignalBuffer> {
    validate_positive("alpha", alpha)?;
    let (cover_samples, secret_samples) = prepare_pair(cover, secret)?;

    log::debug!(
        "Additive frequency embed: {} samples, alpha={}",
        cover_samples.len(),
        alpha
    );

    let mut planner = FftPlanner::<f64>::new();
    let mut mixed = spectrum(&cover_samples, &mut planner);
    let secret_bins = spectrum(&secret_samples, &mut planner);
    for (c, s) in mixed.iter_mut().zip(&secret_bins) {
        *c += *s * alpha as f64;
    }

    let mut stego = SignalBuffer::new(real_inverse(mixed, &mut planner), cover.sample_rate);
    stego.normalize();
    Ok(stego)
}

/// Recover the secret from an additive stego signal using the cover
///
/// # Errors
///
/// Returns `StegoError::NonBlindDecodeWithoutCover` when `cover` is `None`;
/// this mode never falls back to blind decoding. Parameter and shape errors
/// are reported as in [`embed_additive`].
pub fn extract_additive(
    stego: &SignalBuffer,
    cover: Option<&SignalBuffer>,
    alpha: f32,
) -> Result<SignalBuffer> {
    validate_positive("alpha", alpha)?;
    let cover = cover.ok_or(StegoError::NonBlindDecodeWithoutCover)?;
    let (stego_samples, cover_samples) =
        prepare_pair_roles(stego, Role::Stego, cover, Role::Cover)?;

    let gain = estimate_gain(&stego_samples, &cover_samples);
    log::debug!(
        "Additive frequency extract: {} samples, alpha={}, stego gain={:.6}",
        stego_samples.len(),
        alpha,
        gain
    );

    let mut planner = FftPlanner::<f64>::new();
    let mut bins: Vec<Complex<f64>> = stego_samples
        .iter()
        .map(|&y| Complex::new(y as f64 * gain, 0.0))
        .collect();
    planner.plan_fft_forward(bins.len()).process(&mut bins);
    let cover_bins = spectrum(&cover_samples, &mut planner);
    let inv_alpha = 1.0 / alpha as f64;
    for (y, c) in bins.iter_mut().zip(&cover_bins) {
        *y = (*y - *c) * inv_alpha;
    }

    let mut extracted = SignalBuffer::new(real_inverse(bins, &mut planner), stego.sample_rate);
    extracted.normalize();
    Ok(extracted)
}

/// Least-squares estimate of the normalization gain undone before subtraction
///
/// Exact for a secret orthogonal to the cover; a correlated secret loses its
/// projection on the cover (see the module documentation).
fn estimate_gain(stego: &[f32], cover: &[f32]) -> f64 {
    let (mut cc, mut yc) = (0.0f64, 0.0f64);
    for (&y, &c) in stego.iter().zip(cover) {
        cc += c as f64 * c as f64;
        yc += y as f64 * c as f64;
    }

    let gain = cc / yc;
    if yc.abs() <= EPSILON || !gain.is_finite() || gain <= 0.0 {
        1.0
    } else {
        gain
    }
}

/// Embed `secret` into the STFT phase of `cover`
///
/// The cover magnitude is kept; each bin's phase becomes
/// `angle(cover) + strength * angle(secret)`. Output has the cover's
/// (padded) length and is peak-normalized.
///
/// # Errors
///
/// Returns `StegoError::InvalidParameter` for a non-positive `strength` or an
/// invalid frame/hop, plus the shape errors of [`embed_additive`].
pub fn embed_phase(
    cover: &SignalBuffer,
    secret: &SignalBuffer,
    strength: f32,
    frame_size: usize,
    hop_size: usize,
) -> Result<SignalBuffer> {
    validate_positive("strength", strength)?;
    validate_frame(frame_size, hop_size)?;
    let (cover_samples, secret_samples) = prepare_pair(cover, secret)?;

    log::debug!(
        "Phase frequency embed: {} samples, strength={}, frame={}, hop={}",
        cover_samples.len(),
        strength,
        frame_size,
        hop_size
    );

    let stft = Stft::new(frame_size, hop_size)?;
    let cover_spec = stft.forward(&cover_samples);
    let secret_spec = stft.forward(&secret_samples);
    let strength = strength as f64;

    let stego_spec = cover_spec.map_polar(|t, k, mag, phase| {
        let secret_phase = secret_spec.frames[t][k].arg();
        (mag, phase + strength * secret_phase)
    });

    let mut stego = SignalBuffer::new(
        stft.inverse(&stego_spec, cover_samples.len()),
        cover.sample_rate,
    );
    stego.normalize();
    Ok(stego)
}

/// Per-frame, per-bin estimate of the secret phase: `angle(stego) / strength`
///
/// # Errors
///
/// Same parameter and shape checks as [`extract_phase`].
pub fn phase_estimate(
    stego: &SignalBuffer,
    strength: f32,
    frame_size: usize,
    hop_size: usize,
) -> Result<Vec<Vec<f32>>> {
    validate_positive("strength", strength)?;
    stego.ensure_not_empty(Role::Stego)?;
    ensure_mono(stego, Role::Stego)?;

    let stft = Stft::new(frame_size, hop_size)?;
    let spec = stft.forward(&stego.samples);
    let inv = 1.0 / strength as f64;

    Ok(spec
        .frames
        .iter()
        .map(|frame| frame.iter().map(|c| (c.arg() * inv) as f32).collect())
        .collect())
}

/// Blind phase-mode extraction
///
/// Resynthesizes a signal whose STFT phase is `angle(stego) / strength`, using
/// the stego magnitude as the envelope because the secret magnitude is lost.
/// The result is lossy and only tracks the secret's phase structure.
///
/// # Errors
///
/// Returns `StegoError::InvalidParameter` for a non-positive `strength`, an
/// invalid frame/hop or multi-channel input, `StegoError::EmptySignal` for an
/// empty buffer.
pub fn extract_phase(
    stego: &SignalBuffer,
    strength: f32,
    frame_size: usize,
    hop_size: usize,
) -> Result<SignalBuffer> {
    validate_positive("strength", strength)?;
    validate_frame(frame_size, hop_size)?;
    stego.ensure_not_empty(Role::Stego)?;
    ensure_mono(stego, Role::Stego)?;

    log::debug!(
        "Phase frequency extract: {} samples, strength={}, frame={}, hop={}",
        stego.len(),
        strength,
        frame_size,
        hop_size
    );

    let stft = Stft::new(frame_size, hop_size)?;
    let spec = stft.forward(&stego.samples);
    let inv = 1.0 / strength as f64;
    let estimate = spec.map_polar(|_, _, mag, phase| (mag, phase * inv));

    let mut extracted =
        SignalBuffer::new(stft.inverse(&estimate, stego.len()), stego.sample_rate);
    extracted.normalize();
    Ok(extracted)
}
