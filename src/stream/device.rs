//! Live audio endpoints backed by cpal
//!
//! [`CpalFrameSource`] captures from an input device at the device's native
//! rate and channel count. [`CpalFrameSink`] plays on an output device at the
//! rate and channel count of the processed stream. Both talk to the audio
//! callback through crossbeam channels:
//! - capture: the callback sends every delivered buffer; `read_frame` blocks
//!   until a full frame has arrived
//! - playback: `write_frame` blocks while a few frames are already queued;
//!   the callback plays silence on underrun
//!
//! cpal streams are not `Send` on every host, so each stream is built, played
//! and dropped on its own thread for as long as the endpoint is open.

use super::{FrameSink, FrameSource};
use crate::codec::lsb::from_i16;
use crate::error::{Result, StegoError};
use crate::signal::SignalBuffer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long `read_frame` waits for captured audio before failing the frame
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long `finish` waits for queued audio to play out
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Frames queued ahead of the playback callback
const PLAYBACK_QUEUE_FRAMES: usize = 4;

fn device_label(name: Option<&str>) -> String {
    name.unwrap_or("default").to_string()
}

fn device_error(message: impl std::fmt::Display) -> StegoError {
    StegoError::AcceleratorUnavailable(message.to_string())
}

fn find_input(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device> {
    match name {
        Some(name) => host
            .input_devices()
            .map_err(|e| device_error(format!("cannot list input devices: {}", e)))?
            .find(|device| matches!(device.name(), Ok(n) if n == name))
            .ok_or_else(|| device_error(format!("input device '{}' not found", name))),
        None => host
            .default_input_device()
            .ok_or_else(|| device_error("no default input device")),
    }
}

fn find_output(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device> {
    match name {
        Some(name) => host
            .output_devices()
            .map_err(|e| device_error(format!("cannot list output devices: {}", e)))?
            .find(|device| matches!(device.name(), Ok(n) if n == name))
            .ok_or_else(|| device_error(format!("output device '{}' not found", name))),
        None => host
            .default_output_device()
            .ok_or_else(|| device_error("no default output device")),
    }
}

/// A cpal stream kept alive on a dedicated thread until dropped
struct StreamThread {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StreamThread {
    /// Build and start a stream on a new thread
    ///
    /// Returns once the stream is playing, or with the error that stopped it.
    fn spawn<F>(build: F) -> Result<Self>
    where
        F: FnOnce() -> Result<cpal::Stream> + Send + 'static,
    {
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let handle = std::thread::Builder::new()
            .name("sonostego-audio".to_string())
            .spawn(move || {
                let started = build().and_then(|stream| {
                    stream
                        .play()
                        .map_err(|e| device_error(format!("cannot start stream: {}", e)))?;
                    Ok(stream)
                });
                match started {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        // Returns once the owner drops its sender
                        let _ = shutdown_rx.recv();
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                shutdown: Some(shutdown_tx),
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(device_error("audio thread exited before the stream started"))
            }
        }
    }
}

impl Drop for StreamThread {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Captured buffers regrouped into fixed-size frames
struct CaptureQueue {
    chunks: Receiver<Vec<f32>>,
    pending: Vec<f32>,
}

impl CaptureQueue {
    fn new(chunks: Receiver<Vec<f32>>) -> Self {
        Self {
            chunks,
            pending: Vec::new(),
        }
    }

    /// Next `wanted` interleaved samples
    ///
    /// Once the callback side has gone away, whatever is left comes back as a
    /// short frame and then `None`.
    fn next(&mut self, wanted: usize, timeout: Duration) -> Result<Option<Vec<f32>>> {
        let deadline = Instant::now() + timeout;
        while self.pending.len() < wanted {
            match self.chunks.recv_deadline(deadline) {
                Ok(chunk) => self.pending.extend(chunk),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(StegoError::Stream(format!(
                        "no captured audio for {:?}",
                        timeout
                    )))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    if self.pending.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(std::mem::take(&mut self.pending)));
                }
            }
        }
        let rest = self.pending.split_off(wanted);
        Ok(Some(std::mem::replace(&mut self.pending, rest)))
    }
}

/// Queued frames laid out into device buffers, silence on underrun
struct PlaybackFeed {
    frames: Receiver<Vec<f32>>,
    current: Vec<f32>,
    position: usize,
    drained: Arc<AtomicBool>,
}

impl PlaybackFeed {
    fn new(frames: Receiver<Vec<f32>>, drained: Arc<AtomicBool>) -> Self {
        Self {
            frames,
            current: Vec::new(),
            position: 0,
            drained,
        }
    }

    fn fill(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            while self.position >= self.current.len() {
                match self.frames.try_recv() {
                    Ok(frame) => {
                        self.current = frame;
                        self.position = 0;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.drained.store(true, Ordering::Release);
                        break;
                    }
                }
            }
            *sample = match self.current.get(self.position) {
                Some(&value) => {
                    self.position += 1;
                    value
                }
                None => 0.0,
            };
        }
    }
}

/// Frames captured from an audio input device
pub struct CpalFrameSource {
    device_name: Option<String>,
    sample_rate: u32,
    channels: u16,
    queue: Option<CaptureQueue>,
    stream: Option<StreamThread>,
}

impl CpalFrameSource {
    /// Capture from the input device called `device_name`, or the default
    /// input device when `None`
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            sample_rate: 0,
            channels: 0,
            queue: None,
            stream: None,
        }
    }
}

fn build_input(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    format: cpal::SampleFormat,
    chunks: Sender<Vec<f32>>,
) -> Result<cpal::Stream> {
    let err_callback = |err: cpal::StreamError| {
        log::warn!("Audio input error: {}", err);
    };

    let stream = match format {
        cpal::SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let _ = chunks.send(data.iter().map(|&s| from_i16(s)).collect());
            },
            err_callback,
            None,
        ),
        cpal::SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = chunks.send(data.to_vec());
            },
            err_callback,
            None,
        ),
        other => {
            return Err(device_error(format!(
                "unsupported input sample format {:?}",
                other
            )))
        }
    };
    stream.map_err(|e| device_error(format!("cannot build input stream: {}", e)))
}

impl FrameSource for CpalFrameSource {
    fn open(&mut self) -> Result<()> {
        let host = cpal::default_host();
        let device = find_input(&host, self.device_name.as_deref())?;
        let supported = device
            .default_input_config()
            .map_err(|e| device_error(format!("cannot query input config: {}", e)))?;

        self.sample_rate = supported.sample_rate().0;
        self.channels = supported.channels();
        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        log::debug!(
            "Capturing from {} at {} Hz, {} channels, {:?}",
            device_label(self.device_name.as_deref()),
            self.sample_rate,
            self.channels,
            format
        );

        let (chunks_tx, chunks_rx) = unbounded();
        let name = self.device_name.clone();
        self.stream = Some(StreamThread::spawn(move || {
            let host = cpal::default_host();
            let device = find_input(&host, name.as_deref())?;
            build_input(&device, &config, format, chunks_tx)
        })?);
        self.queue = Some(CaptureQueue::new(chunks_rx));
        Ok(())
    }

    fn read_frame(&mut self, frames: usize) -> Result<Option<SignalBuffer>> {
        let queue = self
            .queue
            .as_mut()
            .ok_or_else(|| StegoError::Stream("capture is not open".to_string()))?;
        let wanted = frames * self.channels.max(1) as usize;
        Ok(queue
            .next(wanted, CAPTURE_TIMEOUT)?
            .map(|samples| SignalBuffer::with_channels(samples, self.sample_rate, self.channels)))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn name(&self) -> String {
        format!("input device {}", device_label(self.device_name.as_deref()))
    }
}

/// Processed frames played on an audio output device
pub struct CpalFrameSink {
    device_name: Option<String>,
    frames: Option<Sender<Vec<f32>>>,
    drained: Arc<AtomicBool>,
    stream: Option<StreamThread>,
}

impl CpalFrameSink {
    /// Play on the output device called `device_name`, or the default output
    /// device when `None`
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            frames: None,
            drained: Arc::new(AtomicBool::new(false)),
            stream: None,
        }
    }
}

impl FrameSink for CpalFrameSink {
    fn open(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        log::debug!(
            "Playing on {} at {} Hz, {} channels",
            device_label(self.device_name.as_deref()),
            sample_rate,
            channels
        );

        let (frames_tx, frames_rx) = bounded(PLAYBACK_QUEUE_FRAMES);
        self.drained.store(false, Ordering::Release);
        let mut feed = PlaybackFeed::new(frames_rx, Arc::clone(&self.drained));
        let name = self.device_name.clone();
        self.stream = Some(StreamThread::spawn(move || {
            let host = cpal::default_host();
            let device = find_output(&host, name.as_deref())?;
            device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| feed.fill(data),
                    |err: cpal::StreamError| log::warn!("Audio output error: {}", err),
                    None,
                )
                .map_err(|e| device_error(format!("cannot build output stream: {}", e)))
        })?);
        self.frames = Some(frames_tx);
        Ok(())
    }

    fn write_frame(&mut self, frame: &SignalBuffer) -> Result<()> {
        let frames = self
            .frames
            .as_ref()
            .ok_or_else(|| StegoError::Stream("playback is not open".to_string()))?;
        frames
            .send(frame.samples.clone())
            .map_err(|_| StegoError::Stream("playback stream stopped".to_string()))
    }

    fn finish(&mut self) -> Result<()> {
        if self.frames.take().is_none() {
            return Ok(());
        }
        let deadline = Instant::now() + DRAIN_TIMEOUT;
        while !self.drained.load(Ordering::Acquire) {
            if Instant::now() >= deadline {
                self.stream.take();
                return Err(StegoError::Stream(format!(
                    "playback did not drain within {:?}",
                    DRAIN_TIMEOUT
                )));
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        self.stream.take();
        Ok(())
    }

    fn name(&self) -> String {
        format!("output device {}", device_label(self.device_name.as_deref()))
    }
}
