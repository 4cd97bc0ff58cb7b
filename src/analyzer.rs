//! Chord Analyzer
//!
//! Drives the whole pipeline over one decoded buffer: chunking, per-chunk
//! note collection (pitch estimator over tapered frames plus the chroma
//! filter bank over the whole chunk), classification, run building and
//! post-processing.

use crate::{
    chord_detector::ChordClassifier,
    chromagram::{ChromaAnalyzer, ChromagramError},
    key::{estimate_key, prefers_sharps, respell, Spelling},
    note::DetectedNote,
    pitch::{PitchError, PitchEstimator},
    post_process::{PostProcessConfig, PostProcessor},
    result::{ChordDetectionResult, DetectedChord},
    segmenter::{ChunkAnalysis, Segmenter},
    window::{WindowError, Windower},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors returned while configuring a [`ChordAnalyzer`].
#[derive(Debug, Error, PartialEq)]
pub enum AnalyzerError {
    /// A pipeline parameter was out of range.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The frame windower rejected its parameters.
    #[error(transparent)]
    Window(#[from] WindowError),

    /// The pitch estimator rejected its parameters.
    #[error(transparent)]
    Pitch(#[from] PitchError),

    /// The chroma analyzer rejected its parameters.
    #[error(transparent)]
    Chromagram(#[from] ChromagramError),
}

/// Every tunable of the pipeline except the sample rate.
///
/// Missing fields deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Chunk length in seconds.
    pub chunk_duration: f32,
    /// Pitch-estimation frame length in samples.
    pub window_size: usize,
    /// Hop between pitch frames in samples.
    pub hop_size: usize,
    /// YIN absolute threshold.
    pub pitch_threshold: f32,
    /// Lowest accepted fundamental in Hz.
    pub min_frequency: f32,
    /// Highest accepted fundamental in Hz.
    pub max_frequency: f32,
    /// Lowest chroma octave band.
    pub chroma_min_octave: i32,
    /// Highest chroma octave band.
    pub chroma_max_octave: i32,
    /// Fraction of the strongest pitch class a class must exceed.
    pub chroma_relative_threshold: f32,
    /// Absolute chroma energy floor.
    pub chroma_absolute_floor: f32,
    /// Shortest chunk given to the chroma analyzer, in seconds.
    pub chroma_min_chunk_duration: f32,
    /// Octave attached to chroma-derived notes.
    pub chroma_nominal_octave: i32,
    /// Post-processing thresholds.
    pub post_process: PostProcessConfig,
    /// Root spelling of output labels.
    pub spelling: Spelling,
    /// Fill [`ChordDetectionResult::key`].
    pub estimate_key: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            chunk_duration: 0.5,
            window_size: 2048,
            hop_size: 512,
            pitch_threshold: 0.1,
            min_frequency: crate::note::MIN_FREQUENCY,
            max_frequency: crate::note::MAX_FREQUENCY,
            chroma_min_octave: 2,
            chroma_max_octave: 6,
            chroma_relative_threshold: 0.3,
            chroma_absolute_floor: 0.01,
            chroma_min_chunk_duration: crate::chromagram::DEFAULT_MIN_CHUNK_DURATION,
            chroma_nominal_octave: 4,
            post_process: PostProcessConfig::default(),
            spelling: Spelling::Sharps,
            estimate_key: true,
        }
    }
}

/// Builder for a [`ChordAnalyzer`].
pub struct ChordAnalyzerBuilder {
    sampling_rate: usize,
    config: AnalyzerConfig,
}

impl ChordAnalyzerBuilder {
    /// Start with sampling_rate = 44_100 and [`AnalyzerConfig::default`].
    pub fn new() -> Self {
        ChordAnalyzerBuilder {
            sampling_rate: 44_100,
            config: AnalyzerConfig::default(),
        }
    }

    /// Set the sampling rate of the audio.
    pub fn sampling_rate(mut self, rate: usize) -> Self {
        self.sampling_rate = rate;
        self
    }

    /// Replace every tunable at once.
    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the chunk length in seconds.
    pub fn chunk_duration(mut self, seconds: f32) -> Self {
        self.config.chunk_duration = seconds;
        self
    }

    /// Set the pitch-estimation frame length in samples.
    pub fn window_size(mut self, size: usize) -> Self {
        self.config.window_size = size;
        self
    }

    /// Set the hop between pitch frames in samples.
    pub fn hop_size(mut self, size: usize) -> Self {
        self.config.hop_size = size;
        self
    }

    /// Set the post-processing thresholds.
    pub fn post_process(mut self, config: PostProcessConfig) -> Self {
        self.config.post_process = config;
        self
    }

    /// Set the root spelling of output labels.
    pub fn spelling(mut self, spelling: Spelling) -> Self {
        self.config.spelling = spelling;
        self
    }

    /// Enable or disable key estimation.
    pub fn estimate_key(mut self, enabled: bool) -> Self {
        self.config.estimate_key = enabled;
        self
    }

    /// Finalize and create the analyzer.
    pub fn build(self) -> Result<ChordAnalyzer, AnalyzerError> {
        let config = self.config;
        if self.sampling_rate == 0 {
            return Err(AnalyzerError::Configuration(
                "sampling_rate cannot be zero".into(),
            ));
        }
        if !(config.chunk_duration.is_finite() && config.chunk_duration > 0.0) {
            return Err(AnalyzerError::Configuration(
                "chunk_duration must be finite and positive".into(),
            ));
        }
        let chunk_size = (self.sampling_rate as f32 * config.chunk_duration) as usize;
        if chunk_size == 0 {
            return Err(AnalyzerError::Configuration(
                "chunk_duration is shorter than one sample".into(),
            ));
        }
        config
            .post_process
            .validate()
            .map_err(AnalyzerError::Configuration)?;

        let windower = Windower::new(config.window_size, config.hop_size)?;
        let pitch = PitchEstimator::builder()
            .sampling_rate(self.sampling_rate)
            .frame_size(config.window_size)
            .threshold(config.pitch_threshold)
            .frequency_range(config.min_frequency, config.max_frequency)
            .build()?;
        let chroma = ChromaAnalyzer::builder()
            .sampling_rate(self.sampling_rate)
            .octaves(config.chroma_min_octave, config.chroma_max_octave)
            .relative_threshold(config.chroma_relative_threshold)
            .absolute_floor(config.chroma_absolute_floor)
            .min_chunk_duration(config.chroma_min_chunk_duration)
            .nominal_octave(config.chroma_nominal_octave)
            .build()?;

        Ok(ChordAnalyzer {
            sampling_rate: self.sampling_rate,
            chunk_size,
            windower,
            pitch,
            chroma,
            classifier: ChordClassifier::new(),
            post_processor: PostProcessor::new(config.post_process),
            spelling: config.spelling,
            estimate_key: config.estimate_key,
        })
    }
}

impl Default for ChordAnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The chord detection pipeline for one sample rate.
///
/// Holds only read-only tables and FFT plans, so one analyzer can serve any
/// number of calls, including concurrent ones.
#[derive(Clone)]
pub struct ChordAnalyzer {
    sampling_rate: usize,
    chunk_size: usize,
    windower: Windower,
    pitch: PitchEstimator,
    chroma: ChromaAnalyzer,
    classifier: ChordClassifier,
    post_processor: PostProcessor,
    spelling: Spelling,
    estimate_key: bool,
}

impl ChordAnalyzer {
    /// Start customizing with a builder.
    pub fn builder() -> ChordAnalyzerBuilder {
        ChordAnalyzerBuilder::new()
    }

    /// Analyzer with default settings for `sampling_rate`.
    pub fn new(sampling_rate: usize) -> Result<Self, AnalyzerError> {
        Self::builder().sampling_rate(sampling_rate).build()
    }

    /// Sampling rate the analyzer was built for.
    pub fn sampling_rate(&self) -> usize {
        self.sampling_rate
    }

    /// Chunk length in samples.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Detect the chord timeline of a mono buffer with samples in `-1.0..=1.0`.
    ///
    /// A buffer shorter than one chunk yields no chords.
    pub fn analyze(&self, samples: &[f32]) -> ChordDetectionResult {
        let duration = samples.len() as f32 / self.sampling_rate as f32;
        if samples.len() < self.chunk_size {
            debug!(samples = samples.len(), "buffer shorter than one chunk");
            return ChordDetectionResult {
                duration,
                ..ChordDetectionResult::default()
            };
        }

        let chunk_count = samples.len().div_ceil(self.chunk_size);
        debug!(
            samples = samples.len(),
            sampling_rate = self.sampling_rate,
            chunks = chunk_count,
            "analysing buffer"
        );

        let chunks = self.analyze_chunks(samples, duration);
        let mut segmenter = Segmenter::new();
        for chunk in &chunks {
            segmenter.push(chunk);
        }
        let raw = segmenter.finish();
        let raw_runs = raw.len();

        let mut chords = self.post_processor.process(raw);
        let mut key = estimate_key(&chords).map(|pc| pc.name().to_string());
        if self.spelling == Spelling::KeyAware {
            if let Some(key) = key.as_mut() {
                let sharps = prefers_sharps(key);
                respell_all(&mut chords, sharps);
                *key = respell(key, sharps);
            }
        }
        if !self.estimate_key {
            key = None;
        }

        debug!(raw_runs, runs = chords.len(), key = ?key, "analysis complete");
        ChordDetectionResult {
            chords,
            duration,
            key,
            bpm: None,
        }
    }

    /// Analyse one chunk starting at chunk `index`.
    pub fn analyze_chunk(&self, index: usize, chunk: &[f32], duration: f32) -> ChunkAnalysis {
        let rate = self.sampling_rate as f32;
        let offset = index * self.chunk_size;
        let start_time = offset as f32 / rate;
        let end_time = ((offset + self.chunk_size) as f32 / rate).min(duration);

        let notes = self.collect_notes(chunk);
        let label = self.classifier.classify_notes(&notes);
        ChunkAnalysis::new(index, start_time, end_time, notes, label)
    }

    /// Distinct notes from every frame's pitch estimate followed by the
    /// chunk's chroma notes.
    fn collect_notes(&self, chunk: &[f32]) -> Vec<DetectedNote> {
        let estimated = self.windower.frames(chunk).filter_map(|frame| {
            self.pitch
                .estimate_unchecked(&frame.samples)
                .and_then(DetectedNote::from_frequency)
        });
        let harmonic = self.chroma.detect_notes(chunk);

        let mut notes: Vec<DetectedNote> = Vec::new();
        for note in estimated.chain(harmonic) {
            if !notes.contains(&note) {
                notes.push(note);
            }
        }
        notes
    }

    #[cfg(not(feature = "parallel"))]
    fn analyze_chunks(&self, samples: &[f32], duration: f32) -> Vec<ChunkAnalysis> {
        samples
            .chunks(self.chunk_size)
            .enumerate()
            .map(|(index, chunk)| self.analyze_chunk(index, chunk, duration))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn analyze_chunks(&self, samples: &[f32], duration: f32) -> Vec<ChunkAnalysis> {
        use rayon::prelude::*;

        samples
            .par_chunks(self.chunk_size)
            .enumerate()
            .map(|(index, chunk)| self.analyze_chunk(index, chunk, duration))
            .collect()
    }
}

fn respell_all(chords: &mut [DetectedChord], prefer_sharps: bool) {
    for chord in chords {
        chord.chord = respell(&chord.chord, prefer_sharps);
    }
}
