//! The cooperative pull loop

use super::{FrameSink, FrameSource, StopHandle, StreamStats, StreamTask};
use crate::codec::{echo, EmbeddingParameters};
use crate::config::StreamConfig;
use crate::error::{Result, StegoError};
use crate::signal::SignalBuffer;
use crate::{decode_channels, encode_channels};

/// Runs a [`StreamTask`] frame by frame
#[derive(Debug, Clone)]
pub struct StreamRunner {
    frame_size: usize,
    max_consecutive_errors: usize,
    stop: StopHandle,
}

impl Default for StreamRunner {
    fn default() -> Self {
        Self::new(&StreamConfig::default())
    }
}

/// Which codec direction runs on each frame
#[derive(Clone, Copy)]
enum Direction {
    Encode,
    Decode,
}

impl StreamRunner {
    /// Runner with the frame size and error limit from `config`
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            frame_size: config.frame_size,
            max_consecutive_errors: config.max_consecutive_errors,
            stop: StopHandle::new(),
        }
    }

    /// Handle that ends a running loop after its current frame
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run `task`, writing every processed frame to `sink`
    ///
    /// # Errors
    ///
    /// - `StegoError::InvalidParameter` for bad parameters, a zero frame size,
    ///   streams at different sample rates or an echo delay that does not fit
    ///   in one frame (before the sink is opened)
    /// - `StegoError::AcceleratorUnavailable` if a source or sink cannot be
    ///   opened
    /// - `StegoError::Stream` once more than `max_consecutive_errors` frames in a
    ///   row have failed, or if the sink cannot be finished
    pub fn run(&self, task: StreamTask, sink: &mut dyn FrameSink) -> Result<StreamStats> {
        task.params().validate()?;
        if self.frame_size == 0 {
            return Err(StegoError::invalid("frame_size", "must be > 0"));
        }

        let (direction, mut primary, mut side, params) = match task {
            StreamTask::Encode {
                cover,
                secret,
                params,
            } => (Direction::Encode, cover, Some(secret), params),
            StreamTask::Decode {
                stego,
                cover,
                params,
            } => (Direction::Decode, stego, cover, params),
        };

        open_source(&mut *primary)?;
        if let Some(side) = side.as_mut() {
            open_source(&mut **side)?;
            if side.sample_rate() != primary.sample_rate() {
                return Err(StegoError::invalid(
                    "sample_rate",
                    format!(
                        "{} is {} Hz but {} is {} Hz",
                        primary.name(),
                        primary.sample_rate(),
                        side.name(),
                        side.sample_rate()
                    ),
                ));
            }
        }

        if let EmbeddingParameters::Echo { delay_seconds, .. } = params {
            echo::delay_samples(delay_seconds, primary.sample_rate(), self.frame_size)?;
        }

        sink.open(primary.sample_rate(), primary.channels())
            .map_err(|e| {
                StegoError::AcceleratorUnavailable(format!("sink {}: {}", sink.name(), e))
            })?;

        log::info!(
            "Streaming {} -> {} ({}, frame={} samples, {} Hz, {})",
            primary.name(),
            sink.name(),
            if side.is_some() { "with side stream" } else { "single stream" },
            self.frame_size,
            primary.sample_rate(),
            params.method()
        );

        let mut stats = StreamStats::default();
        let mut side_exhausted = false;
        let mut consecutive_errors = 0usize;

        loop {
            if self.stop.is_stopped() {
                log::info!("Stream stopped after {} frames", stats.frames_processed);
                stats.stopped = true;
                break;
            }

            let frame = match primary.read_frame(self.frame_size) {
                Ok(Some(frame)) => Ok(frame),
                Ok(None) => break,
                Err(e) => Err(e),
            };

            let outcome = frame.and_then(|mut frame| {
                let len = frame.samples.len();
                pad_frame(&mut frame, self.frame_size);
                let side_frame = match side.as_mut() {
                    Some(side) => Some(read_side(
                        &mut **side,
                        &frame,
                        self.frame_size,
                        &mut side_exhausted,
                    )?),
                    None => None,
                };
                let mut processed = process(direction, &frame, side_frame.as_ref(), &params)?;
                processed.samples.truncate(len);
                sink.write_frame(&processed)?;
                Ok(processed.len())
            });

            match outcome {
                Ok(written) => {
                    consecutive_errors = 0;
                    stats.frames_processed += 1;
                    stats.samples_written += written;
                }
                Err(e) => {
                    consecutive_errors += 1;
                    stats.frames_failed += 1;
                    log::warn!(
                        "Skipping frame {}: {}",
                        stats.frames_processed + stats.frames_failed,
                        e
                    );
                    if consecutive_errors > self.max_consecutive_errors {
                        return Err(StegoError::Stream(format!(
                            "{} consecutive frames failed, last error: {}",
                            consecutive_errors, e
                        )));
                    }
                }
            }
        }

        sink.finish()
            .map_err(|e| StegoError::Stream(format!("finishing {}: {}", sink.name(), e)))?;

        log::info!(
            "Stream finished: {} frames processed, {} failed",
            stats.frames_processed,
            stats.frames_failed
        );
        Ok(stats)
    }
}

fn open_source(source: &mut dyn FrameSource) -> Result<()> {
    source.open().map_err(|e| {
        StegoError::AcceleratorUnavailable(format!("source {}: {}", source.name(), e))
    })
}

/// Zero-pad a short final frame to `frame_size` frames
///
/// Codecs always see full frames; the caller trims the output back.
fn pad_frame(frame: &mut SignalBuffer, frame_size: usize) {
    let wanted = frame_size * frame.channels as usize;
    if frame.samples.len() < wanted {
        frame.samples.resize(wanted, 0.0);
    }
}

/// Next side-stream frame, shaped like `frame`
///
/// An exhausted side stream yields silence; a side frame is cut or zero-padded
/// to the primary frame's length.
fn read_side(
    side: &mut dyn FrameSource,
    frame: &SignalBuffer,
    frame_size: usize,
    exhausted: &mut bool,
) -> Result<SignalBuffer> {
    let silence = |channels: u16| {
        SignalBuffer::with_channels(
            vec![0.0; frame.frames() * channels as usize],
            frame.sample_rate,
            channels,
        )
    };

    if *exhausted {
        return Ok(silence(side.channels()));
    }

    match side.read_frame(frame_size)? {
        Some(mut side_frame) => {
            let wanted = frame.frames() * side_frame.channels as usize;
            side_frame.samples.resize(wanted, 0.0);
            Ok(side_frame)
        }
        None => {
            log::debug!("{} exhausted, continuing with silence", side.name());
            *exhausted = true;
            Ok(silence(side.channels()))
        }
    }
}

fn process(
    direction: Direction,
    frame: &SignalBuffer,
    side: Option<&SignalBuffer>,
    params: &EmbeddingParameters,
) -> Result<SignalBuffer> {
    match direction {
        Direction::Encode => {
            let secret = side.ok_or_else(|| StegoError::Stream("no secret stream".to_string()))?;
            encode_channels(frame, secret, params)
        }
        Direction::Decode => decode_channels(frame, side, params),
    }
}
