//! Chromagram
//!
//! Per-pitch-class energy over a whole chunk from a bank of single-bin
//! Goertzel filters, one per semitone per octave band, and the threshold
//! that decides which pitch classes are sounding.

use crate::note::{DetectedNote, PitchClass, PitchClassSet, SEMITONES};
use std::f64::consts::PI;
use thiserror::Error;

/// Default shortest analysable chunk: 4096 samples at 44.1 kHz.
pub const DEFAULT_MIN_CHUNK_DURATION: f32 = 4096.0 / 44_100.0;

/// Energy for each of the 12 pitch classes, indexed from C.
pub type Chroma = [f32; SEMITONES];

/// Errors returned by the chroma analyzer.
#[derive(Debug, Error, PartialEq)]
pub enum ChromagramError {
    /// Chunk received was shorter than the analyzer accepts.
    #[error("expected a chunk of at least {expected} samples, got {got}")]
    ChunkTooShort {
        /// The minimum chunk length.
        expected: usize,
        /// The actual length of the received chunk.
        got: usize,
    },

    /// An error occurred during the configuration of the analyzer.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Builder for a [`ChromaAnalyzer`].
pub struct ChromaAnalyzerBuilder {
    sampling_rate: usize,
    min_octave: i32,
    max_octave: i32,
    relative_threshold: f32,
    absolute_floor: f32,
    min_chunk_duration: f32,
    nominal_octave: i32,
}

impl ChromaAnalyzerBuilder {
    /// Start with default parameters:
    /// sampling_rate = 44_100, octaves 2..=6, relative_threshold = 0.3,
    /// absolute_floor = 0.01, min_chunk_duration = 4096 / 44_100 s,
    /// nominal_octave = 4.
    pub fn new() -> Self {
        ChromaAnalyzerBuilder {
            sampling_rate: 44_100,
            min_octave: 2,
            max_octave: 6,
            relative_threshold: 0.3,
            absolute_floor: 0.01,
            min_chunk_duration: DEFAULT_MIN_CHUNK_DURATION,
            nominal_octave: 4,
        }
    }

    /// Set the sampling rate of the audio.
    pub fn sampling_rate(mut self, rate: usize) -> Self {
        self.sampling_rate = rate;
        self
    }

    /// Set the inclusive octave bands summed into each pitch class.
    pub fn octaves(mut self, min: i32, max: i32) -> Self {
        self.min_octave = min;
        self.max_octave = max;
        self
    }

    /// Set the fraction of the strongest pitch class a class must exceed.
    pub fn relative_threshold(mut self, ratio: f32) -> Self {
        self.relative_threshold = ratio;
        self
    }

    /// Set the absolute energy a class must exceed, relative to full scale.
    pub fn absolute_floor(mut self, floor: f32) -> Self {
        self.absolute_floor = floor;
        self
    }

    /// Set the shortest chunk worth analysing, in seconds; shorter chunks
    /// yield no notes. Converted to samples at the configured rate.
    pub fn min_chunk_duration(mut self, seconds: f32) -> Self {
        self.min_chunk_duration = seconds;
        self
    }

    /// Set the octave attached to chroma-derived notes.
    pub fn nominal_octave(mut self, octave: i32) -> Self {
        self.nominal_octave = octave;
        self
    }

    /// Finalize and create the analyzer.
    pub fn build(self) -> Result<ChromaAnalyzer, ChromagramError> {
        if self.sampling_rate == 0 {
            return Err(ChromagramError::Configuration(
                "sampling_rate cannot be zero".into(),
            ));
        }
        if self.min_octave > self.max_octave {
            return Err(ChromagramError::Configuration(
                "min_octave must not exceed max_octave".into(),
            ));
        }
        if !(self.relative_threshold.is_finite() && (0.0..=1.0).contains(&self.relative_threshold))
        {
            return Err(ChromagramError::Configuration(
                "relative_threshold must lie in 0..=1".into(),
            ));
        }
        if !(self.absolute_floor.is_finite() && self.absolute_floor >= 0.0) {
            return Err(ChromagramError::Configuration(
                "absolute_floor must be finite and non-negative".into(),
            ));
        }
        if !(self.min_chunk_duration.is_finite() && self.min_chunk_duration > 0.0) {
            return Err(ChromagramError::Configuration(
                "min_chunk_duration must be finite and positive".into(),
            ));
        }
        let min_chunk_size =
            ((self.sampling_rate as f64 * self.min_chunk_duration as f64).round() as usize).max(1);

        // Equal-tempered band centres, A4 = 440 Hz
        let bands = (self.min_octave..=self.max_octave)
            .flat_map(|octave| {
                (0..SEMITONES).map(move |pc| {
                    let semis = pc as i32 - 9 + (octave - 4) * SEMITONES as i32;
                    (pc, 440.0 * 2f64.powf(semis as f64 / 12.0))
                })
            })
            .collect();

        Ok(ChromaAnalyzer {
            sampling_rate: self.sampling_rate as f64,
            relative_threshold: self.relative_threshold,
            absolute_floor: self.absolute_floor,
            min_chunk_size,
            nominal_octave: self.nominal_octave,
            bands,
        })
    }
}

impl Default for ChromaAnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Goertzel filter-bank chroma analyzer.
#[derive(Debug, Clone)]
pub struct ChromaAnalyzer {
    sampling_rate: f64,
    relative_threshold: f32,
    absolute_floor: f32,
    min_chunk_size: usize,
    nominal_octave: i32,
    /// (pitch class index, centre frequency) per filter
    bands: Vec<(usize, f64)>,
}

impl ChromaAnalyzer {
    /// Start customizing with a builder.
    pub fn builder() -> ChromaAnalyzerBuilder {
        ChromaAnalyzerBuilder::new()
    }

    /// Shortest chunk the analyzer accepts.
    pub fn min_chunk_size(&self) -> usize {
        self.min_chunk_size
    }

    /// Accumulated Goertzel energy per pitch class across all octave bands.
    pub fn chroma(&self, chunk: &[f32]) -> Result<Chroma, ChromagramError> {
        if chunk.len() < self.min_chunk_size {
            return Err(ChromagramError::ChunkTooShort {
                expected: self.min_chunk_size,
                got: chunk.len(),
            });
        }
        let mut chroma = [0.0f32; SEMITONES];
        for &(pc, freq) in &self.bands {
            chroma[pc] += goertzel(chunk, freq, self.sampling_rate) as f32;
        }
        Ok(chroma)
    }

    /// Pitch classes whose energy exceeds both the absolute floor and the
    /// relative threshold of the strongest class.
    pub fn present(&self, chroma: &Chroma) -> PitchClassSet {
        let peak = chroma.iter().copied().fold(0.0f32, f32::max);
        let threshold = peak * self.relative_threshold;
        chroma
            .iter()
            .enumerate()
            .filter(|&(_, &energy)| energy > threshold && energy > self.absolute_floor)
            .map(|(idx, _)| PitchClass::from_index(idx))
            .collect()
    }

    /// Notes judged present in `chunk`, in chromatic order, each tagged with
    /// the nominal octave. Chunks shorter than the minimum yield nothing.
    pub fn detect_notes(&self, chunk: &[f32]) -> Vec<DetectedNote> {
        match self.chroma(chunk) {
            Ok(chroma) => self
                .present(&chroma)
                .iter()
                .map(|pc| DetectedNote::new(pc, self.nominal_octave))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Magnitude of the DFT bin nearest `frequency` over all of `samples`,
/// normalised by the sample count (a full-scale sine on-bin gives 0.5).
pub fn goertzel_magnitude(samples: &[f32], frequency: f32, sampling_rate: f32) -> f32 {
    goertzel(samples, frequency as f64, sampling_rate as f64) as f32
}

#[inline]
fn goertzel(samples: &[f32], frequency: f64, sampling_rate: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let k = (n * frequency / sampling_rate).round();
    let coeff = 2.0 * (2.0 * PI * k / n).cos();

    let (mut s1, mut s2) = (0.0f64, 0.0f64);
    for &x in samples {
        let s0 = x as f64 + coeff * s1 - s2;
        s2 = s1;
        s1 = s0;
    }
    (s1 * s1 + s2 * s2 - coeff * s1 * s2).max(0.0).sqrt() / n
}
