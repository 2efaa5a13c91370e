//! Framed FFT (STFT) and its overlap-add inverse
//!
//! Frames are centered: the signal is zero-padded by `frame_size / 2` on both
//! sides before framing, and each frame is weighted with a periodic Hann
//! window. The inverse divides the overlap-added frames by the summed squared
//! window, so `inverse(forward(x))` returns `x` when the spectrum is left
//! unchanged.

use crate::error::Result;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use super::params::validate_frame;

/// Window sums below this are treated as uncovered samples
const EPSILON: f64 = 1e-10;

/// Complex spectrogram: one full FFT frame per hop
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// `frames[t][k]` is bin `k` of frame `t`
    pub frames: Vec<Vec<Complex<f64>>>,
}

impl Spectrogram {
    /// Number of frames
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Apply `f(magnitude, phase) -> (magnitude, phase)` to every bin
    pub fn map_polar<F>(&self, mut f: F) -> Spectrogram
    where
        F: FnMut(usize, usize, f64, f64) -> (f64, f64),
    {
        let frames = self
            .frames
            .iter()
            .enumerate()
            .map(|(t, frame)| {
                frame
                    .iter()
                    .enumerate()
                    .map(|(k, c)| {
                        let (mag, phase) = f(t, k, c.norm(), c.arg());
                        Complex::from_polar(mag, phase)
                    })
                    .collect()
            })
            .collect();
        Spectrogram { frames }
    }
}

/// Short-time Fourier transform with a fixed frame and hop
pub struct Stft {
    frame_size: usize,
    hop_size: usize,
    window: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for Stft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stft")
            .field("frame_size", &self.frame_size)
            .field("hop_size", &self.hop_size)
            .finish()
    }
}

impl Stft {
    /// Plan forward and inverse FFTs for `frame_size` with hop `hop_size`
    ///
    /// # Errors
    ///
    /// Returns `StegoError::InvalidParameter` if `frame_size < 2` or
    /// `hop_size` is outside `1..=frame_size`.
    pub fn new(frame_size: usize, hop_size: usize) -> Result<Self> {
        validate_frame(frame_size, hop_size)?;

        let mut planner = FftPlanner::<f64>::new();
        let window = (0..frame_size)
            .map(|i| {
                let t = 2.0 * std::f64::consts::PI * i as f64 / frame_size as f64;
                0.5 * (1.0 - t.cos())
            })
            .collect();

        Ok(Self {
            frame_size,
            hop_size,
            window,
            forward: planner.plan_fft_forward(frame_size),
            inverse: planner.plan_fft_inverse(frame_size),
        })
    }

    /// Frame size in samples
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Hop size in samples
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    fn left_pad(&self) -> usize {
        self.frame_size / 2
    }

    /// Frames needed to cover `len` samples after centering
    pub fn num_frames(&self, len: usize) -> usize {
        let padded = len + 2 * self.left_pad();
        if padded <= self.frame_size {
            1
        } else {
            1 + (padded - self.frame_size).div_ceil(self.hop_size)
        }
    }

    /// Windowed FFT of every frame of `samples`
    pub fn forward(&self, samples: &[f32]) -> Spectrogram {
        let n_frames = self.num_frames(samples.len());
        let left = self.left_pad();

        log::debug!(
            "STFT forward: {} samples -> {} frames (frame={}, hop={})",
            samples.len(),
            n_frames,
            self.frame_size,
            self.hop_size
        );

        let frames = (0..n_frames)
            .map(|t| {
                let start = t * self.hop_size;
                let mut buffer: Vec<Complex<f64>> = (0..self.frame_size)
                    .map(|i| {
                        let x = (start + i)
                            .checked_sub(left)
                            .and_then(|idx| samples.get(idx))
                            .copied()
                            .unwrap_or(0.0);
                        Complex::new(x as f64 * self.window[i], 0.0)
                    })
                    .collect();
                self.forward.process(&mut buffer);
                buffer
            })
            .collect();

        Spectrogram { frames }
    }

    /// Overlap-add resynthesis, trimmed to `length` samples
    ///
    /// Only the real part of each inverse frame is kept.
    pub fn inverse(&self, spectrogram: &Spectrogram, length: usize) -> Vec<f32> {
        let left = self.left_pad();
        let padded_len = (spectrogram.num_frames().saturating_sub(1)) * self.hop_size
            + self.frame_size;
        let mut output = vec![0.0f64; padded_len.max(length + left)];
        let mut window_sum = vec![0.0f64; output.len()];
        let scale = 1.0 / self.frame_size as f64;

        for (t, frame) in spectrogram.frames.iter().enumerate() {
            let mut buffer = frame.clone();
            buffer.resize(self.frame_size, Complex::new(0.0, 0.0));
            self.inverse.process(&mut buffer);

            let start = t * self.hop_size;
            for (i, c) in buffer.iter().enumerate() {
                let w = self.window[i];
                output[start + i] += c.re * scale * w;
                window_sum[start + i] += w * w;
            }
        }

        (left..left + length)
            .map(|p| {
                if window_sum[p] > EPSILON {
                    (output[p] / window_sum[p]) as f32
                } else {
                    0.0
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chirp(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / 16000.0;
                (2.0 * std::f32::consts::PI * (200.0 + 900.0 * t) * t).sin() * 0.8
            })
            .collect()
    }

    #[test]
    fn test_frame_count() {
        let stft = Stft::new(2048, 512).unwrap();
        assert_eq!(stft.num_frames(0), 1);
        assert_eq!(stft.num_frames(1), 2);
        assert_eq!(stft.num_frames(512), 2);
        assert_eq!(stft.num_frames(513), 3);
    }

    #[test]
    fn test_perfect_reconstruction() {
        let stft = Stft::new(1024, 256).unwrap();
        let signal = chirp(5000);

        let spectrum = stft.forward(&signal);
        let rebuilt = stft.inverse(&spectrum, signal.len());

        assert_eq!(rebuilt.len(), signal.len());
        for (i, (a, b)) in signal.iter().zip(&rebuilt).enumerate() {
            assert!((a - b).abs() < 1e-5, "sample {}: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn test_short_signal_reconstruction() {
        let stft = Stft::new(2048, 512).unwrap();
        let signal = chirp(100);
        let rebuilt = stft.inverse(&stft.forward(&signal), signal.len());
        for (a, b) in signal.iter().zip(&rebuilt) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_map_polar_identity() {
        let stft = Stft::new(256, 64).unwrap();
        let signal = chirp(1000);
        let spectrum = stft.forward(&signal);
        let same = spectrum.map_polar(|_, _, mag, phase| (mag, phase));
        let rebuilt = stft.inverse(&same, signal.len());
        for (a, b) in signal.iter().zip(&rebuilt) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_invalid_frame() {
        assert!(Stft::new(1, 1).is_err());
        assert!(Stft::new(256, 0).is_err());
        assert!(Stft::new(256, 512).is_err());
    }
}
