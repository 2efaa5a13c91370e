//! Linear-interpolation resampling
//!
//! Cover and secret must share a sample rate before they are combined. This is
//! the loader's job; the crate offers a simple linear resampler for it.

use super::buffer::SignalBuffer;
use crate::error::{Result, StegoError};

/// Resample mono samples from `from_rate` to `to_rate`
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}

impl SignalBuffer {
    /// Resample every channel to `target_rate`
    ///
    /// # Errors
    ///
    /// Returns `StegoError::InvalidParameter` if either rate is zero.
    pub fn resampled(&self, target_rate: u32) -> Result<SignalBuffer> {
        if self.sample_rate == 0 || target_rate == 0 {
            return Err(StegoError::invalid(
                "sample_rate",
                format!("cannot resample {} Hz -> {} Hz", self.sample_rate, target_rate),
            ));
        }
        if self.sample_rate == target_rate {
            return Ok(self.clone());
        }

        log::debug!(
            "Resampling {} frames from {} Hz to {} Hz",
            self.frames(),
            self.sample_rate,
            target_rate
        );

        let parts = self
            .split_channels()
            .into_iter()
            .map(|ch| {
                SignalBuffer::new(
                    resample_linear(&ch.samples, self.sample_rate, target_rate),
                    target_rate,
                )
            })
            .collect();
        SignalBuffer::merge_channels(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_identity_same_rate() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_linear(&samples, 16000, 16000), samples);
    }

    #[test]
    fn test_upsample_interpolates() {
        let resampled = resample_linear(&[0.0, 0.5, 1.0], 8000, 16000);
        assert_eq!(resampled.len(), 6);
        assert_eq!(resampled[0], 0.0);
        assert!((resampled[1] - 0.25).abs() < 1e-6);
        assert_eq!(resampled[2], 0.5);
    }

    #[test]
    fn test_downsample_halves_length() {
        let resampled = resample_linear(&vec![0.5; 3200], 16000, 8000);
        assert_eq!(resampled.len(), 1600);
        assert!(resampled.iter().all(|&x| (x - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_stereo_buffer_resample() {
        let stereo = SignalBuffer::with_channels(vec![0.0, 1.0, 0.5, 1.0], 8000, 2);
        let out = stereo.resampled(16000).unwrap();
        assert_eq!(out.channels, 2);
        assert_eq!(out.sample_rate, 16000);
        assert_eq!(out.frames(), 4);
        assert!(stereo.resampled(0).is_err());
    }
}
