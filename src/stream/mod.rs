//! Frame-by-frame streaming
//!
//! A single-threaded pull loop: read one frame from the primary source (cover
//! for encode, stego for decode), read the matching frame from the side
//! stream if any, run exactly one codec call, write the result to the sink.
//! Reads and writes block, which is the only backpressure.
//!
//! Failure policy:
//! - opening a source or sink fails the whole run before the first frame,
//!   reported as `StegoError::AcceleratorUnavailable`
//! - a frame that cannot be read, processed or written is logged and skipped
//! - more than `max_consecutive_errors` failures in a row abort the run
//!
//! A [`StopHandle`] ends the loop after the current frame.
//!
//! With the `live-audio` feature, `CpalFrameSource` and `CpalFrameSink`
//! stream from and to audio devices.

#[cfg(feature = "live-audio")]
pub mod device;
pub mod endpoints;
pub mod runner;

#[cfg(feature = "live-audio")]
pub use device::{CpalFrameSink, CpalFrameSource};
pub use endpoints::{MemorySink, MemorySource, WavFrameSink, WavFrameSource};
pub use runner::StreamRunner;

use crate::codec::EmbeddingParameters;
use crate::error::Result;
use crate::signal::SignalBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Blocking supplier of audio frames
pub trait FrameSource: Send {
    /// Acquire the underlying device or file
    fn open(&mut self) -> Result<()>;

    /// Read the next frame of at most `frames` sample frames
    ///
    /// Returns `Ok(None)` once the stream is exhausted. The last frame may be
    /// shorter than requested.
    fn read_frame(&mut self, frames: usize) -> Result<Option<SignalBuffer>>;

    /// Sample rate, valid after [`open`](FrameSource::open)
    fn sample_rate(&self) -> u32;

    /// Channel count, valid after [`open`](FrameSource::open)
    fn channels(&self) -> u16;

    /// Name for logging
    fn name(&self) -> String {
        "source".to_string()
    }
}

/// Blocking consumer of processed frames
pub trait FrameSink: Send {
    /// Acquire the underlying device or file
    fn open(&mut self, sample_rate: u32, channels: u16) -> Result<()>;

    /// Write one processed frame
    fn write_frame(&mut self, frame: &SignalBuffer) -> Result<()>;

    /// Flush and release; called once after the last frame
    fn finish(&mut self) -> Result<()>;

    /// Name for logging
    fn name(&self) -> String {
        "sink".to_string()
    }
}

/// What a stream run does with each frame
pub enum StreamTask {
    /// Hide `secret` frames in `cover` frames
    Encode {
        /// Primary stream
        cover: Box<dyn FrameSource>,
        /// Side stream; zero frames once exhausted
        secret: Box<dyn FrameSource>,
        /// Codec parameters applied to every frame
        params: EmbeddingParameters,
    },
    /// Recover the secret from `stego` frames
    Decode {
        /// Primary stream
        stego: Box<dyn FrameSource>,
        /// Side stream, required for additive frequency decoding
        cover: Option<Box<dyn FrameSource>>,
        /// Codec parameters applied to every frame
        params: EmbeddingParameters,
    },
}

impl StreamTask {
    /// Parameters applied to every frame
    pub fn params(&self) -> &EmbeddingParameters {
        match self {
            StreamTask::Encode { params, .. } | StreamTask::Decode { params, .. } => params,
        }
    }
}

/// Cooperative stop flag shared with the running loop
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// New handle in the running state
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to end after the current frame
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// `true` once [`stop`](StopHandle::stop) has been called
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Frames processed and written
    pub frames_processed: usize,
    /// Frames skipped after an error
    pub frames_failed: usize,
    /// Samples written to the sink (all channels)
    pub samples_written: usize,
    /// `true` if the loop ended through the stop handle
    pub stopped: bool,
}
