//! Configuration document
//!
//! A TOML file can supply default file paths and per-method values. The codecs
//! never read it: it is loaded explicitly and resolved into
//! [`EmbeddingParameters`] before a call, so there is no process-wide state.
//!
//! ```toml
//! [paths]
//! cover = "cover.wav"
//! secret = "secret.wav"
//!
//! [frequency]
//! mode = "phase"
//! strength = 0.02
//!
//! [echo]
//! delay_seconds = 0.05
//! ```

use crate::codec::params::{EmbeddingParameters, Method, DEFAULT_ECHO_GAIN, DEFAULT_FRAME_SIZE};
use crate::error::{Result, StegoError};
use crate::selector::SelectorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StegoConfig {
    /// Default file locations
    pub paths: PathsConfig,
    /// LSB settings
    pub lsb: LsbConfig,
    /// Frequency-domain settings
    pub frequency: FrequencyConfig,
    /// Echo hiding settings
    pub echo: EchoConfig,
    /// Streaming loop settings
    pub stream: StreamConfig,
}

/// Default file paths used when the command line leaves them out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Cover audio
    pub cover: Option<PathBuf>,
    /// Secret audio
    pub secret: Option<PathBuf>,
    /// Stego output of encode, input of decode
    pub stego: Option<PathBuf>,
    /// Extracted output of decode
    pub extracted: Option<PathBuf>,
}

/// LSB settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LsbConfig {
    /// Bits per sample (default: 2)
    pub num_bits: u8,
}

impl Default for LsbConfig {
    fn default() -> Self {
        Self { num_bits: 2 }
    }
}

/// Which frequency-domain design `fft` refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyMode {
    /// Additive spectrum mixing, decode needs the cover
    #[default]
    Additive,
    /// STFT phase modulation, blind decode
    Phase,
}

impl FrequencyMode {
    /// Method this mode maps to
    pub fn method(&self) -> Method {
        match self {
            FrequencyMode::Additive => Method::FrequencyAdditive,
            FrequencyMode::Phase => Method::FrequencyPhase,
        }
    }
}

/// Frequency-domain settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyConfig {
    /// Mode used for the `fft` method (default: additive)
    pub mode: FrequencyMode,
    /// Additive mixing weight (default: 0.01)
    pub alpha: f32,
    /// Phase modulation strength (default: 0.01)
    pub strength: f32,
    /// STFT frame size (default: 2048)
    pub frame_size: usize,
    /// STFT hop; `frame_size / 4` when unset
    pub hop_size: Option<usize>,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            mode: FrequencyMode::Additive,
            alpha: 0.01,
            strength: 0.01,
            frame_size: DEFAULT_FRAME_SIZE,
            hop_size: None,
        }
    }
}

impl FrequencyConfig {
    /// Effective hop size
    pub fn hop(&self) -> usize {
        self.hop_size.unwrap_or(self.frame_size / 4)
    }
}

/// Echo hiding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    /// Delay in seconds (default: 0.1)
    pub delay_seconds: f32,
    /// Delayed tap weight (default: 0.3)
    pub decay: f32,
    /// Echo amplitude relative to the cover (default: 0.1)
    pub echo_gain: f32,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            delay_seconds: 0.1,
            decay: 0.3,
            echo_gain: DEFAULT_ECHO_GAIN,
        }
    }
}

/// Streaming loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Samples per frame (default: 2048)
    pub frame_size: usize,
    /// Consecutive failed frames tolerated before the loop gives up (default: 8)
    pub max_consecutive_errors: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            max_consecutive_errors: 8,
        }
    }
}

impl StegoConfig {
    /// Load and validate a TOML configuration file
    ///
    /// # Errors
    ///
    /// Returns `StegoError::Io` if the file cannot be read, `StegoError::Config`
    /// if it does not parse, and `StegoError::InvalidParameter` if a value is out
    /// of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: StegoConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| StegoError::Config(e.to_string()))
    }

    /// Check every method's values
    pub fn validate(&self) -> Result<()> {
        for method in [
            Method::Lsb,
            Method::FrequencyAdditive,
            Method::FrequencyPhase,
            Method::Echo,
        ] {
            self.parameters(method).validate()?;
        }
        if self.stream.frame_size == 0 {
            return Err(StegoError::invalid("stream.frame_size", "must be > 0"));
        }
        Ok(())
    }

    /// Resolve the parameters for `method`
    pub fn parameters(&self, method: Method) -> EmbeddingParameters {
        match method {
            Method::Lsb => EmbeddingParameters::Lsb {
                num_bits: self.lsb.num_bits,
            },
            Method::FrequencyAdditive => EmbeddingParameters::FrequencyAdditive {
                alpha: self.frequency.alpha,
            },
            Method::FrequencyPhase => EmbeddingParameters::FrequencyPhase {
                strength: self.frequency.strength,
                frame_size: self.frequency.frame_size,
                hop_size: self.frequency.hop(),
            },
            Method::Echo => EmbeddingParameters::Echo {
                delay_seconds: self.echo.delay_seconds,
                decay: self.echo.decay,
                echo_gain: self.echo.echo_gain,
            },
        }
    }

    /// Extractor settings for blind selection
    pub fn selector_config(&self) -> SelectorConfig {
        SelectorConfig {
            num_bits: self.lsb.num_bits,
            strength: self.frequency.strength,
            frame_size: self.frequency.frame_size,
            hop_size: self.frequency.hop(),
            delay_seconds: self.echo.delay_seconds,
            decay: self.echo.decay,
        }
    }
}
