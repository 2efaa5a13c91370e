//! Blind method inference
//!
//! When a stego signal arrives without a method label, every blind extractor
//! (LSB, then phase-mode frequency, then echo) is run on it and the candidate
//! with the largest sample variance is picked. Nothing guarantees that the
//! loudest-varying output is the real secret, so the result always carries the
//! per-method scores and any ties alongside the choice.
//!
//! # Example
//!
//! ```no_run
//! use sonostego::selector::{select_method, SelectorConfig};
//! use sonostego::SignalBuffer;
//!
//! let stego = SignalBuffer::new(vec![0.0f32; 16000], 16000);
//! let selection = select_method(&stego, &SelectorConfig::default())?;
//! for candidate in &selection.candidates {
//!     println!("{}: variance {:.6}", candidate.method, candidate.variance);
//! }
//! println!("chosen: {}", selection.method());
//! # Ok::<(), sonostego::StegoError>(())
//! ```

use crate::codec::params::{DEFAULT_FRAME_SIZE, Method};
use crate::codec::{echo, frequency, lsb};
use crate::error::Result;
use crate::signal::normalization::variance;
use crate::signal::{Role, SignalBuffer};

/// Relative difference below which two variances count as tied
const TIE_TOLERANCE: f64 = 1e-9;

type Extractor = fn(&SignalBuffer, &SelectorConfig) -> Result<SignalBuffer>;

/// Blind extractors in evaluation order
const EXTRACTORS: [(Method, Extractor); 3] = [
    (Method::Lsb, extract_lsb),
    (Method::FrequencyPhase, extract_phase),
    (Method::Echo, extract_echo),
];

fn extract_lsb(stego: &SignalBuffer, config: &SelectorConfig) -> Result<SignalBuffer> {
    lsb::extract(stego, config.num_bits)
}

fn extract_phase(stego: &SignalBuffer, config: &SelectorConfig) -> Result<SignalBuffer> {
    frequency::extract_phase(stego, config.strength, config.frame_size, config.hop_size)
}

fn extract_echo(stego: &SignalBuffer, config: &SelectorConfig) -> Result<SignalBuffer> {
    echo::extract(stego, config.delay_seconds, config.decay)
}

/// Parameters each blind extractor runs with
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// LSB bits per sample (default: 2)
    pub num_bits: u8,
    /// Phase-mode strength (default: 0.01)
    pub strength: f32,
    /// Phase-mode STFT frame size (default: 2048)
    pub frame_size: usize,
    /// Phase-mode STFT hop (default: 512)
    pub hop_size: usize,
    /// Echo delay in seconds (default: 0.1)
    pub delay_seconds: f32,
    /// Echo decay (default: 0.3)
    pub decay: f32,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            num_bits: 2,
            strength: 0.01,
            frame_size: DEFAULT_FRAME_SIZE,
            hop_size: DEFAULT_FRAME_SIZE / 4,
            delay_seconds: 0.1,
            decay: 0.3,
        }
    }
}

/// One extractor's output and score
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Extractor that produced this output
    pub method: Method,
    /// Population variance of the extracted samples
    pub variance: f64,
    /// The extracted signal
    pub signal: SignalBuffer,
}

/// Outcome of blind selection
#[derive(Debug, Clone)]
pub struct Selection {
    /// All candidates in evaluation order (LSB, phase, echo)
    pub candidates: Vec<Candidate>,
    /// Index of the chosen candidate in `candidates`
    pub chosen: usize,
    /// Methods whose variance ties with the chosen one (excluding it)
    pub tied_with: Vec<Method>,
}

impl Selection {
    /// Chosen method
    pub fn method(&self) -> Method {
        self.candidates[self.chosen].method
    }

    /// Chosen candidate
    pub fn winner(&self) -> &Candidate {
        &self.candidates[self.chosen]
    }

    /// Consume the selection and keep only the chosen signal
    pub fn into_signal(mut self) -> SignalBuffer {
        self.candidates.swap_remove(self.chosen).signal
    }

    /// `(method, variance)` pairs in evaluation order
    pub fn scores(&self) -> Vec<(Method, f64)> {
        self.candidates
            .iter()
            .map(|c| (c.method, c.variance))
            .collect()
    }

    /// `true` if another method scored the same as the chosen one
    pub fn is_ambiguous(&self) -> bool {
        !self.tied_with.is_empty()
    }
}

/// Index of the maximum score (earliest wins ties) and the indices tied with it
fn choose(scores: &[f64]) -> (usize, Vec<usize>) {
    let mut chosen = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[chosen] && !is_tie(score, scores[chosen]) {
            chosen = i;
        }
    }
    let tied = (0..scores.len())
        .filter(|&i| i != chosen && is_tie(scores[i], scores[chosen]))
        .collect();
    (chosen, tied)
}

fn is_tie(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        return true;
    }
    (a - b).abs() <= TIE_TOLERANCE * scale
}

/// Run every blind extractor on `stego` and pick the highest-variance output
///
/// Ties go to the earliest method in evaluation order and are reported in
/// [`Selection::tied_with`].
///
/// # Errors
///
/// Returns the first extractor error, e.g. `StegoError::EmptySignal` for an
/// empty buffer or `StegoError::InvalidParameter` for a bad configuration,
/// including an echo delay that is not shorter than `stego`.
pub fn select_method(stego: &SignalBuffer, config: &SelectorConfig) -> Result<Selection> {
    stego.ensure_not_empty(Role::Stego)?;

    log::debug!(
        "Blind method selection over {} samples at {} Hz",
        stego.len(),
        stego.sample_rate
    );

    let mut candidates = Vec::with_capacity(EXTRACTORS.len());
    for (method, extract) in EXTRACTORS {
        let signal = extract(stego, config)?;
        let score = variance(&signal.samples);
        log::debug!("Candidate {}: variance={:.6}", method, score);
        candidates.push(Candidate {
            method,
            variance: score,
            signal,
        });
    }

    let scores: Vec<f64> = candidates.iter().map(|c| c.variance).collect();
    let (chosen, tied) = choose(&scores);
    let best = scores[chosen];
    let tied_with: Vec<Method> = tied.into_iter().map(|i| candidates[i].method).collect();

    if !tied_with.is_empty() {
        log::warn!(
            "Blind selection is ambiguous: {} ties with {:?} (variance {:.6})",
            candidates[chosen].method,
            tied_with,
            best
        );
    }

    log::debug!(
        "Selected {} with variance {:.6}",
        candidates[chosen].method,
        best
    );

    Ok(Selection {
        candidates,
        chosen,
        tied_with,
    })
}
