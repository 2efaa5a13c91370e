//! Audio decoding using Symphonia
//!
//! Covers the compressed and lossless containers hound does not read
//! (FLAC, MP3, OGG/Vorbis, AAC/M4A, ...). Channels are kept interleaved.

use crate::error::{Result, StegoError};
use crate::signal::SignalBuffer;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

impl From<SymphoniaError> for StegoError {
    fn from(e: SymphoniaError) -> Self {
        match e {
            SymphoniaError::IoError(io) => StegoError::Io(io),
            other => StegoError::Decode(other.to_string()),
        }
    }
}

/// Decode the first audio track of `path`
///
/// Corrupt packets are skipped with a warning; decoding stops at end of
/// stream.
///
/// # Errors
///
/// Returns `StegoError::Io` if the file cannot be opened and
/// `StegoError::Decode` if the container is unsupported, holds no audio
/// track, or lacks a sample rate.
pub fn decode_file(path: impl AsRef<Path>) -> Result<SignalBuffer> {
    let path = path.as_ref();
    log::debug!("Decoding audio file: {}", path.display());

    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| StegoError::Decode("no supported audio track".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| StegoError::Decode("track has no sample rate".to_string()))?;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();
    let mut channels: Option<u16> = None;
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels.get_or_insert(spec.channels.count() as u16);
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                skipped += 1;
                log::warn!("Skipping corrupt packet in {}: {}", path.display(), msg);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if skipped > 0 {
        log::warn!("{} packets skipped while decoding {}", skipped, path.display());
    }

    let channels = channels.unwrap_or(1).max(1);
    log::debug!(
        "Decoded {} samples ({} ch) at {} Hz",
        samples.len(),
        channels,
        sample_rate
    );

    Ok(SignalBuffer::with_channels(samples, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::wav::{write_wav, WavFormat};
    use tempfile::tempdir;

    #[test]
    fn test_decodes_wav_through_symphonia() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..800).map(|i| ((i % 40) as f32 / 40.0) - 0.5).collect();
        let buffer = SignalBuffer::with_channels(samples, 8000, 2);
        write_wav(&path, &buffer, WavFormat::Float32).unwrap();

        let decoded = decode_file(&path).unwrap();
        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.len(), buffer.len());
        for (a, b) in decoded.samples.iter().zip(&buffer.samples) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noise.flac");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(matches!(
            decode_file(&path),
            Err(StegoError::Decode(_)) | Err(StegoError::Io(_))
        ));
    }
}
