//! WAV-file and in-memory frame endpoints

use super::{FrameSink, FrameSource};
use crate::codec::lsb::to_i16;
use crate::error::{Result, StegoError};
use crate::io::wav::{read_samples, temp_path, WavFormat};
use crate::signal::SignalBuffer;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

/// Frames read from a WAV file
pub struct WavFrameSource {
    path: PathBuf,
    reader: Option<hound::WavReader<BufReader<File>>>,
    spec: Option<hound::WavSpec>,
}

impl WavFrameSource {
    /// Source reading `path`; nothing is opened until [`FrameSource::open`]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reader: None,
            spec: None,
        }
    }
}

impl FrameSource for WavFrameSource {
    fn open(&mut self) -> Result<()> {
        let reader = hound::WavReader::open(&self.path)?;
        self.spec = Some(reader.spec());
        self.reader = Some(reader);
        Ok(())
    }

    fn read_frame(&mut self, frames: usize) -> Result<Option<SignalBuffer>> {
        let path = &self.path;
        let not_open = || StegoError::Stream(format!("{} is not open", path.display()));
        let spec = self.spec.ok_or_else(not_open)?;
        let reader = self.reader.as_mut().ok_or_else(not_open)?;

        let samples = read_samples(reader, frames * spec.channels as usize)?;
        if samples.is_empty() {
            return Ok(None);
        }
        Ok(Some(SignalBuffer::with_channels(
            samples,
            spec.sample_rate,
            spec.channels,
        )))
    }

    fn sample_rate(&self) -> u32 {
        self.spec.map(|s| s.sample_rate).unwrap_or(0)
    }

    fn channels(&self) -> u16 {
        self.spec.map(|s| s.channels).unwrap_or(0)
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }
}

/// Frames written to a WAV file
///
/// Frames go to a temporary sibling file that is renamed into place by
/// [`FrameSink::finish`]. A sink dropped without `finish` deletes it.
pub struct WavFrameSink {
    path: PathBuf,
    format: WavFormat,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
}

impl WavFrameSink {
    /// Sink writing `path` in `format`
    pub fn new(path: impl Into<PathBuf>, format: WavFormat) -> Self {
        Self {
            path: path.into(),
            format,
            writer: None,
        }
    }
}

impl FrameSink for WavFrameSink {
    fn open(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
        let spec = self.format.spec(sample_rate, channels);
        self.writer = Some(hound::WavWriter::create(temp_path(&self.path), spec)?);
        Ok(())
    }

    fn write_frame(&mut self, frame: &SignalBuffer) -> Result<()> {
        let format = self.format;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| StegoError::Stream(format!("{} is not open", self.path.display())))?;
        match format {
            WavFormat::Pcm16 => {
                for &x in &frame.samples {
                    writer.write_sample(to_i16(x))?;
                }
            }
            WavFormat::Float32 => {
                for &x in &frame.samples {
                    writer.write_sample(x)?;
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| StegoError::Stream(format!("{} is not open", self.path.display())))?;
        writer.finalize()?;
        std::fs::rename(temp_path(&self.path), &self.path)?;
        Ok(())
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for WavFrameSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            drop(writer);
            let _ = std::fs::remove_file(temp_path(&self.path));
        }
    }
}

/// Frames sliced from a buffer held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    buffer: SignalBuffer,
    position: usize,
}

impl MemorySource {
    /// Source over `buffer`
    pub fn new(buffer: SignalBuffer) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }
}

impl FrameSource for MemorySource {
    fn open(&mut self) -> Result<()> {
        if self.buffer.channels == 0 {
            return Err(StegoError::invalid("channels", "memory source has no channels"));
        }
        self.position = 0;
        Ok(())
    }

    fn read_frame(&mut self, frames: usize) -> Result<Option<SignalBuffer>> {
        if self.position >= self.buffer.samples.len() {
            return Ok(None);
        }
        let end = (self.position + frames * self.buffer.channels as usize)
            .min(self.buffer.samples.len());
        let samples = self.buffer.samples[self.position..end].to_vec();
        self.position = end;
        Ok(Some(SignalBuffer::with_channels(
            samples,
            self.buffer.sample_rate,
            self.buffer.channels,
        )))
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate
    }

    fn channels(&self) -> u16 {
        self.buffer.channels
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}

/// Frames collected in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    frames: usize,
    finished: bool,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames written
    pub fn frames_written(&self) -> usize {
        self.frames
    }

    /// `true` once [`FrameSink::finish`] was called
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Everything written so far as one buffer
    pub fn to_buffer(&self) -> SignalBuffer {
        SignalBuffer::with_channels(self.samples.clone(), self.sample_rate, self.channels)
    }
}

impl FrameSink for MemorySink {
    fn open(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
        self.sample_rate = sample_rate;
        self.channels = channels;
        self.samples.clear();
        self.frames = 0;
        self.finished = false;
        Ok(())
    }

    fn write_frame(&mut self, frame: &SignalBuffer) -> Result<()> {
        self.samples.extend_from_slice(&frame.samples);
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::wav::{read_wav, write_wav};
    use tempfile::tempdir;

    #[test]
    fn test_memory_source_frames() {
        let buffer = SignalBuffer::with_channels((0..10).map(|i| i as f32).collect(), 8000, 2);
        let mut source = MemorySource::new(buffer);
        source.open().unwrap();

        let first = source.read_frame(2).unwrap().unwrap();
        assert_eq!(first.samples, vec![0.0, 1.0, 2.0, 3.0]);
        let second = source.read_frame(2).unwrap().unwrap();
        assert_eq!(second.samples, vec![4.0, 5.0, 6.0, 7.0]);
        let last = source.read_frame(2).unwrap().unwrap();
        assert_eq!(last.samples, vec![8.0, 9.0]);
        assert!(source.read_frame(2).unwrap().is_none());
    }

    #[test]
    fn test_wav_source_reads_in_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.wav");
        let buffer = SignalBuffer::new((0..100).map(|i| i as f32 / 100.0).collect(), 8000);
        write_wav(&path, &buffer, WavFormat::Float32).unwrap();

        let mut source = WavFrameSource::new(&path);
        source.open().unwrap();
        assert_eq!(source.sample_rate(), 8000);
        assert_eq!(source.channels(), 1);

        let mut collected = Vec::new();
        let mut count = 0;
        while let Some(frame) = source.read_frame(32).unwrap() {
            count += 1;
            collected.extend(frame.samples);
        }
        assert_eq!(count, 4);
        assert_eq!(collected, buffer.samples);
    }

    #[test]
    fn test_wav_source_missing_file_fails_open() {
        let mut source = WavFrameSource::new("/no/such/input.wav");
        assert!(source.open().is_err());
    }

    #[test]
    fn test_wav_sink_renames_on_finish() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut sink = WavFrameSink::new(&path, WavFormat::Float32);
        sink.open(8000, 1).unwrap();
        sink.write_frame(&SignalBuffer::new(vec![0.25; 16], 8000)).unwrap();
        assert!(!path.exists());

        sink.finish().unwrap();
        let back = read_wav(&path).unwrap();
        assert_eq!(back.samples, vec![0.25; 16]);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_wav_sink_dropped_unfinished_leaves_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        {
            let mut sink = WavFrameSink::new(&path, WavFormat::Pcm16);
            sink.open(8000, 1).unwrap();
            sink.write_frame(&SignalBuffer::new(vec![0.5; 16], 8000)).unwrap();
        }
        assert!(!path.exists());
        assert!(!temp_path(&path).exists());
    }
}
