//! Normalized sample buffers and their roles

use crate::error::{Result, StegoError};
use std::fmt;

/// What a buffer is used for in an encode/decode call
///
/// All roles share the same [`SignalBuffer`] type; the role only shows up in
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Host signal that carries the hidden audio
    Cover,
    /// Audio to hide
    Secret,
    /// Cover with the secret embedded
    Stego,
    /// Secret estimate recovered from a stego signal
    Extracted,
}

impl Role {
    /// Lowercase name used in log lines and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Cover => "cover",
            Role::Secret => "secret",
            Role::Stego => "stego",
            Role::Extracted => "extracted",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Floating-point samples plus sample rate and channel count
///
/// Samples are interleaved when `channels > 1`. Codecs operate on mono
/// buffers; use [`split_channels`](Self::split_channels) and
/// [`merge_channels`](Self::merge_channels) to process each channel
/// independently.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalBuffer {
    /// Samples, nominally in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channel count (1 for mono)
    pub channels: u16,
}

impl SignalBuffer {
    /// Create a mono buffer
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    /// Create a buffer holding `channels` interleaved channels
    pub fn with_channels(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// All-zero mono buffer of `len` samples
    pub fn silence(len: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; len], sample_rate)
    }

    /// Total number of samples across all channels
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` when the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Maximum absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|&x| x.abs()).fold(0.0f32, f32::max)
    }

    /// Reject empty buffers, naming the role in the error
    pub fn ensure_not_empty(&self, role: Role) -> Result<()> {
        if self.is_empty() {
            return Err(StegoError::EmptySignal(role.as_str()));
        }
        Ok(())
    }

    /// De-interleave into one mono buffer per channel
    pub fn split_channels(&self) -> Vec<SignalBuffer> {
        let channels = self.channels as usize;
        if channels == 1 {
            return vec![self.clone()];
        }

        (0..channels)
            .map(|ch| {
                let samples = self
                    .samples
                    .iter()
                    .skip(ch)
                    .step_by(channels)
                    .copied()
                    .collect();
                SignalBuffer::new(samples, self.sample_rate)
            })
            .collect()
    }

    /// Interleave mono buffers back into one multi-channel buffer
    ///
    /// Channels shorter than the longest one are zero-padded.
    ///
    /// # Errors
    ///
    /// Returns `StegoError::InvalidParameter` if `parts` is empty, holds more
    /// than `u16::MAX` channels, or mixes sample rates.
    pub fn merge_channels(mut parts: Vec<SignalBuffer>) -> Result<SignalBuffer> {
        let first = parts
            .first()
            .ok_or_else(|| StegoError::invalid("channels", "no channels to merge"))?;
        let sample_rate = first.sample_rate;
        let channels = u16::try_from(parts.len())
            .map_err(|_| StegoError::invalid("channels", "too many channels"))?;

        if parts.iter().any(|p| p.sample_rate != sample_rate) {
            return Err(StegoError::invalid(
                "sample_rate",
                "channels have different sample rates",
            ));
        }

        if channels == 1 {
            let mut only = parts.remove(0);
            only.channels = 1;
            return Ok(only);
        }

        let frames = parts.iter().map(|p| p.samples.len()).max().unwrap_or(0);
        let mut samples = Vec::with_capacity(frames * parts.len());
        for i in 0..frames {
            for part in &parts {
                samples.push(part.samples.get(i).copied().unwrap_or(0.0));
            }
        }

        Ok(SignalBuffer::with_channels(samples, sample_rate, channels))
    }
}
