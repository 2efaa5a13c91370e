//! Audio I/O modules
//!
//! File loading and saving for the command line and streaming front ends.
//! WAV goes through hound so 16-bit payloads survive bit-exactly; every other
//! container is decoded with Symphonia.

pub mod decoder;
pub mod wav;

pub use wav::{read_wav, write_wav, WavFormat};

use crate::error::Result;
use crate::signal::SignalBuffer;
use std::path::Path;

/// How a file is turned into a [`SignalBuffer`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Peak-normalize after decoding
    ///
    /// Use it for cover and secret inputs. Leave it off for stego inputs:
    /// rescaling a 16-bit stego signal destroys an LSB payload.
    pub normalize: bool,
    /// Resample to this rate after decoding
    pub target_rate: Option<u32>,
}

impl LoadOptions {
    /// Options for cover and secret inputs
    pub fn normalized() -> Self {
        Self {
            normalize: true,
            target_rate: None,
        }
    }

    /// Options for stego inputs
    pub fn raw() -> Self {
        Self::default()
    }

    /// Resample to `rate` after decoding
    pub fn at_rate(mut self, rate: u32) -> Self {
        self.target_rate = Some(rate);
        self
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav") || e.eq_ignore_ascii_case("wave"))
        .unwrap_or(false)
}

/// Load an audio file of any supported container
///
/// # Errors
///
/// Returns `StegoError::Io` or `StegoError::Decode` when the file cannot be
/// read, `StegoError::InvalidParameter` for a zero target rate.
pub fn load_audio(path: impl AsRef<Path>, options: LoadOptions) -> Result<SignalBuffer> {
    let path = path.as_ref();
    let mut buffer = if is_wav(path) {
        read_wav(path)?
    } else {
        decoder::decode_file(path)?
    };

    if let Some(rate) = options.target_rate {
        if rate != buffer.sample_rate {
            log::info!(
                "Resampling {} from {} Hz to {} Hz",
                path.display(),
                buffer.sample_rate,
                rate
            );
            buffer = buffer.resampled(rate)?;
        }
    }

    if options.normalize {
        buffer.normalize();
    }

    log::debug!(
        "Loaded {}: {:.2}s, {} ch, {} Hz",
        path.display(),
        buffer.duration_seconds(),
        buffer.channels,
        buffer.sample_rate
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_extension_dispatch() {
        assert!(is_wav(Path::new("a.wav")));
        assert!(is_wav(Path::new("A.WAV")));
        assert!(!is_wav(Path::new("a.flac")));
        assert!(!is_wav(Path::new("noext")));
    }

    #[test]
    fn test_load_normalizes_on_request() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quiet.wav");
        let buffer = SignalBuffer::new(vec![0.0, 0.25, -0.125], 8000);
        write_wav(&path, &buffer, WavFormat::Float32).unwrap();

        let raw = load_audio(&path, LoadOptions::raw()).unwrap();
        assert_eq!(raw.samples, buffer.samples);

        let normalized = load_audio(&path, LoadOptions::normalized()).unwrap();
        assert_eq!(normalized.samples, vec![0.0, 1.0, -0.5]);
    }

    #[test]
    fn test_load_resamples() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slow.wav");
        let buffer = SignalBuffer::new(vec![0.5; 800], 8000);
        write_wav(&path, &buffer, WavFormat::Float32).unwrap();

        let loaded = load_audio(&path, LoadOptions::raw().at_rate(16000)).unwrap();
        assert_eq!(loaded.sample_rate, 16000);
        assert!((loaded.len() as i64 - 1600).abs() <= 1);
    }
}
