//! Peak normalization and length alignment
//!
//! Every transform that can change amplitude ends with [`normalize_peak`]:
//! samples are divided by `max(|x|)` so the loudest sample sits at 1.0.
//! A silent buffer has nothing to divide by; it is left as zeros and the
//! caller gets [`NormalizationOutcome::Silent`] back instead of an error.
//! NaN or infinite samples are left alone and reported as
//! [`NormalizationOutcome::NonFinite`].
//!
//! # Example
//!
//! ```
//! use sonostego::signal::normalization::{normalize_peak, NormalizationOutcome};
//!
//! let mut samples = vec![0.25f32, -0.5, 0.125];
//! let outcome = normalize_peak(&mut samples);
//!
//! assert_eq!(samples, vec![0.5, -1.0, 0.25]);
//! assert_eq!(outcome, NormalizationOutcome::Scaled { peak: 0.5 });
//! ```

use super::buffer::SignalBuffer;

/// Result of a peak normalization pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizationOutcome {
    /// Samples were divided by `peak`
    Scaled {
        /// Maximum absolute value before scaling
        peak: f32,
    },
    /// Buffer was all zeros (or empty); samples left untouched
    Silent,
    /// Buffer holds NaN or infinite samples; samples left untouched
    NonFinite {
        /// Number of offending samples
        count: usize,
    },
}

impl NormalizationOutcome {
    /// `true` when normalization was skipped
    pub fn is_silent(&self) -> bool {
        matches!(self, NormalizationOutcome::Silent)
    }
}

/// Normalize samples in place so the maximum absolute value is 1.0
pub fn normalize_peak(samples: &mut [f32]) -> NormalizationOutcome {
    let count = samples.iter().filter(|x| !x.is_finite()).count();
    if count > 0 {
        log::warn!(
            "Signal of {} samples has {} non-finite samples, skipping normalization",
            samples.len(),
            count
        );
        return NormalizationOutcome::NonFinite { count };
    }

    let peak = samples.iter().map(|&x| x.abs()).fold(0.0f32, f32::max);
    if peak <= 0.0 {
        log::warn!(
            "Signal of {} samples is silent, skipping normalization",
            samples.len()
        );
        return NormalizationOutcome::Silent;
    }

    for sample in samples.iter_mut() {
        *sample /= peak;
    }

    NormalizationOutcome::Scaled { peak }
}

impl SignalBuffer {
    /// Peak-normalize this buffer in place
    pub fn normalize(&mut self) -> NormalizationOutcome {
        normalize_peak(&mut self.samples)
    }

    /// Peak-normalized copy of this buffer
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

/// Zero-pad `samples` at the end up to `len` (never truncates)
pub fn pad_to_length(samples: &mut Vec<f32>, len: usize) {
    if samples.len() < len {
        samples.resize(len, 0.0);
    }
}

/// Truncate or zero-pad `samples` to exactly `len`
pub fn fit_length(samples: &mut Vec<f32>, len: usize) {
    samples.resize(len, 0.0);
}

/// Zero-pad the shorter of two sample vectors so both have the same length
///
/// Returns the common length.
pub fn pad_to_match(a: &mut Vec<f32>, b: &mut Vec<f32>) -> usize {
    let len = a.len().max(b.len());
    pad_to_length(a, len);
    pad_to_length(b, len);
    len
}

/// Population variance of `samples` (0.0 for an empty slice)
pub fn variance(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&x| x as f64).sum::<f64>() / n;
    samples
        .iter()
        .map(|&x| {
            let d = x as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n
}

/// Pearson correlation coefficient over the common prefix of `a` and `b`
///
/// Returns 0.0 when either side has zero variance.
pub fn correlation(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let mean_a = a.iter().map(|&x| x as f64).sum::<f64>() / n as f64;
    let mean_b = b.iter().map(|&x| x as f64).sum::<f64>() / n as f64;

    let mut cov = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}
