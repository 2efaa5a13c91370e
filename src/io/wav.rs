//! WAV reading and writing via hound

use crate::codec::lsb::{from_i16, to_i16};
use crate::error::{Result, StegoError};
use crate::signal::SignalBuffer;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Sample encoding for written WAV files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// 16-bit signed PCM; required for LSB stego output
    Pcm16,
    /// 32-bit IEEE float
    Float32,
}

impl WavFormat {
    pub(crate) fn spec(&self, sample_rate: u32, channels: u16) -> hound::WavSpec {
        let (bits_per_sample, sample_format) = match self {
            WavFormat::Pcm16 => (16, hound::SampleFormat::Int),
            WavFormat::Float32 => (32, hound::SampleFormat::Float),
        };
        hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// Read up to `limit` samples from `reader`, scaled to floats
///
/// The reader keeps its position, so repeated calls walk through the file.
pub(crate) fn read_samples<R: Read>(
    reader: &mut hound::WavReader<R>,
    limit: usize,
) -> Result<Vec<f32>> {
    let spec = reader.spec();
    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, _) => reader
            .samples::<f32>()
            .take(limit)
            .collect::<std::result::Result<_, _>>()?,
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .take(limit)
            .map(|s| s.map(from_i16))
            .collect::<std::result::Result<_, _>>()?,
        (hound::SampleFormat::Int, bits) => {
            let max_value = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .take(limit)
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<std::result::Result<_, _>>()?
        }
    };
    Ok(samples)
}

/// Decode a WAV file into an interleaved [`SignalBuffer`]
///
/// 16-bit samples are scaled by `1/32767` (the inverse of the LSB codec's
/// quantizer), other integer widths by their full scale, float samples are
/// taken as-is.
pub fn read_wav(path: impl AsRef<Path>) -> Result<SignalBuffer> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    log::debug!(
        "Reading WAV {}: {} Hz, {} ch, {} bit {:?}",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    let samples = read_samples(&mut reader, usize::MAX)?;

    Ok(SignalBuffer::with_channels(
        samples,
        spec.sample_rate,
        spec.channels,
    ))
}

/// Temporary sibling path the writer fills before renaming
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.wav".to_string());
    path.with_file_name(format!(".{}.partial", name))
}

fn write_samples(path: &Path, buffer: &SignalBuffer, format: WavFormat) -> Result<()> {
    let spec = format.spec(buffer.sample_rate, buffer.channels);
    let mut writer = hound::WavWriter::create(path, spec)?;
    match format {
        WavFormat::Pcm16 => {
            for &x in &buffer.samples {
                writer.write_sample(to_i16(x))?;
            }
        }
        WavFormat::Float32 => {
            for &x in &buffer.samples {
                writer.write_sample(x)?;
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Write `buffer` to `path`
///
/// The file is written next to its destination under a temporary name and
/// renamed on success, so a failed write never leaves a truncated WAV behind.
///
/// # Errors
///
/// Returns `StegoError::InvalidParameter` for a zero channel count or sample
/// rate, `StegoError::Io` if the file cannot be created or renamed.
pub fn write_wav(path: impl AsRef<Path>, buffer: &SignalBuffer, format: WavFormat) -> Result<()> {
    let path = path.as_ref();
    if buffer.channels == 0 {
        return Err(StegoError::invalid("channels", "must be > 0"));
    }
    if buffer.sample_rate == 0 {
        return Err(StegoError::invalid("sample_rate", "must be > 0"));
    }

    log::debug!(
        "Writing {} samples to {} as {:?}",
        buffer.len(),
        path.display(),
        format
    );

    let partial = temp_path(path);
    if let Err(e) = write_samples(&partial, buffer, format) {
        let _ = std::fs::remove_file(&partial);
        return Err(e);
    }
    std::fs::rename(&partial, path).map_err(|e| {
        let _ = std::fs::remove_file(&partial);
        StegoError::Io(e)
    })
}
