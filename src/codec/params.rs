//! Embedding methods and their parameters

use crate::error::{Result, StegoError};
use std::fmt;

/// Default STFT frame size for phase-mode frequency hiding
pub const DEFAULT_FRAME_SIZE: usize = 2048;

/// Default relative amplitude of the embedded echo
pub const DEFAULT_ECHO_GAIN: f32 = 0.1;

/// Steganographic transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Least-significant-bit substitution on 16-bit samples
    Lsb,
    /// Additive spectrum mixing; decoding needs the cover (non-blind)
    FrequencyAdditive,
    /// STFT phase modulation; decoding is blind
    FrequencyPhase,
    /// Echo hiding with a two-tap FIR kernel
    Echo,
}

impl Method {
    /// Evaluation order of the blind selector; earlier entries win ties
    pub const BLIND: [Method; 3] = [Method::Lsb, Method::FrequencyPhase, Method::Echo];

    /// Short lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Lsb => "lsb",
            Method::FrequencyAdditive => "fft-additive",
            Method::FrequencyPhase => "fft-phase",
            Method::Echo => "echo",
        }
    }

    /// `true` when extraction works without the cover signal
    pub fn is_blind(&self) -> bool {
        !matches!(self, Method::FrequencyAdditive)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One method plus the values it needs
///
/// Build with the constructors, which fill in the documented defaults, and
/// check with [`validate`](Self::validate) before running a transform. The
/// codec entry points validate again, so an invalid value never reaches the
/// DSP code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmbeddingParameters {
    /// Hide the top `num_bits` of the secret in the cover's low bits
    Lsb {
        /// Bits per sample, 1..=8
        num_bits: u8,
    },
    /// `stego = IFFT(FFT(cover) + alpha * FFT(secret))`
    FrequencyAdditive {
        /// Mixing weight of the secret spectrum, > 0
        alpha: f32,
    },
    /// Cover phase perturbed by `strength * angle(secret)` per STFT bin
    FrequencyPhase {
        /// Phase modulation depth, > 0
        strength: f32,
        /// STFT frame size in samples
        frame_size: usize,
        /// STFT hop in samples
        hop_size: usize,
    },
    /// `stego = cover + echo_gain * (secret * [1, 0.., decay])`
    Echo {
        /// Echo delay in seconds, > 0
        delay_seconds: f32,
        /// Echo tap weight, in (0, 1)
        decay: f32,
        /// Amplitude of the echoed secret relative to the cover, > 0
        echo_gain: f32,
    },
}

impl EmbeddingParameters {
    /// LSB parameters
    pub fn lsb(num_bits: u8) -> Self {
        EmbeddingParameters::Lsb { num_bits }
    }

    /// Additive frequency parameters
    pub fn frequency_additive(alpha: f32) -> Self {
        EmbeddingParameters::FrequencyAdditive { alpha }
    }

    /// Phase frequency parameters with the default frame (2048) and hop (frame / 4)
    pub fn frequency_phase(strength: f32) -> Self {
        EmbeddingParameters::FrequencyPhase {
            strength,
            frame_size: DEFAULT_FRAME_SIZE,
            hop_size: DEFAULT_FRAME_SIZE / 4,
        }
    }

    /// Echo parameters with the default echo gain (0.1)
    pub fn echo(delay_seconds: f32, decay: f32) -> Self {
        EmbeddingParameters::Echo {
            delay_seconds,
            decay,
            echo_gain: DEFAULT_ECHO_GAIN,
        }
    }

    /// Method these parameters select
    pub fn method(&self) -> Method {
        match self {
            EmbeddingParameters::Lsb { .. } => Method::Lsb,
            EmbeddingParameters::FrequencyAdditive { .. } => Method::FrequencyAdditive,
            EmbeddingParameters::FrequencyPhase { .. } => Method::FrequencyPhase,
            EmbeddingParameters::Echo { .. } => Method::Echo,
        }
    }

    /// Check every value against its valid range
    ///
    /// # Errors
    ///
    /// Returns `StegoError::InvalidParameter` naming the first offending value.
    pub fn validate(&self) -> Result<()> {
        match *self {
            EmbeddingParameters::Lsb { num_bits } => validate_num_bits(num_bits),
            EmbeddingParameters::FrequencyAdditive { alpha } => validate_positive("alpha", alpha),
            EmbeddingParameters::FrequencyPhase {
                strength,
                frame_size,
                hop_size,
            } => {
                validate_positive("strength", strength)?;
                validate_frame(frame_size, hop_size)
            }
            EmbeddingParameters::Echo {
                delay_seconds,
                decay,
                echo_gain,
            } => {
                validate_positive("delay_seconds", delay_seconds)?;
                validate_decay(decay)?;
                validate_positive("echo_gain", echo_gain)
            }
        }
    }
}

pub(crate) fn validate_num_bits(num_bits: u8) -> Result<()> {
    if !(1..=8).contains(&num_bits) {
        return Err(StegoError::invalid(
            "num_bits",
            format!("must be in 1..=8, got {}", num_bits),
        ));
    }
    Ok(())
}

pub(crate) fn validate_positive(name: &'static str, value: f32) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(StegoError::invalid(
            name,
            format!("must be a finite value > 0, got {}", value),
        ));
    }
    Ok(())
}

pub(crate) fn validate_decay(decay: f32) -> Result<()> {
    if !(decay > 0.0 && decay < 1.0) {
        return Err(StegoError::invalid(
            "decay",
            format!("must be in (0, 1), got {}", decay),
        ));
    }
    Ok(())
}

pub(crate) fn validate_frame(frame_size: usize, hop_size: usize) -> Result<()> {
    if frame_size < 2 {
        return Err(StegoError::invalid(
            "frame_size",
            format!("must be >= 2, got {}", frame_size),
        ));
    }
    if hop_size == 0 || hop_size > frame_size {
        return Err(StegoError::invalid(
            "hop_size",
            format!("must be in 1..={}, got {}", frame_size, hop_size),
        ));
    }
    Ok(())
}
