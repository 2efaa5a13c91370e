//! Error types for the steganography engine

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, StegoError>;

/// Errors that can occur while embedding or extracting a hidden signal
///
/// Parameter and precondition failures are raised before any transform runs,
/// so a failed call never produces partial output. A silent (all-zero) buffer
/// is not an error: normalization is skipped and reported through
/// [`NormalizationOutcome`](crate::signal::normalization::NormalizationOutcome).
#[derive(Debug, Error)]
pub enum StegoError {
    /// A parameter is outside its valid range
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name as it appears in [`EmbeddingParameters`](crate::EmbeddingParameters)
        name: &'static str,
        /// What was wrong with it
        message: String,
    },

    /// Cover and secret lengths differ and the caller asked for strict handling
    #[error("Length mismatch: cover has {cover} samples, secret has {secret}")]
    LengthMismatch {
        /// Cover length in samples
        cover: usize,
        /// Secret length in samples
        secret: usize,
    },

    /// Additive frequency decoding needs the original cover
    #[error("Additive frequency decoding requires the cover signal")]
    NonBlindDecodeWithoutCover,

    /// A capture/playback endpoint or compute device could not be initialized
    #[error("Accelerator or stream device unavailable: {0}")]
    AcceleratorUnavailable(String),

    /// The input buffer has no samples
    #[error("Empty signal: {0}")]
    EmptySignal(&'static str),

    /// Audio container could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Configuration document is malformed or holds an invalid value
    #[error("Configuration error: {0}")]
    Config(String),

    /// A frame could not be read from a source or written to a sink
    #[error("Stream error: {0}")]
    Stream(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StegoError {
    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        StegoError::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

impl From<hound::Error> for StegoError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => StegoError::Io(io),
            other => StegoError::Decode(other.to_string()),
        }
    }
}

impl From<toml::de::Error> for StegoError {
    fn from(e: toml::de::Error) -> Self {
        StegoError::Config(e.to_string())
    }
}
