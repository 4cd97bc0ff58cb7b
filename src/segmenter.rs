//! Segmenter
//!
//! Folds per-chunk analyses, in chunk order, into runs of identical labels.

use crate::{
    chord_detector::ChordLabel,
    note::{DetectedNote, PitchClassSet},
    result::DetectedChord,
};
use tracing::trace;

/// Confidence for a chunk with `distinct` pitch classes.
pub fn chunk_confidence(distinct: usize) -> f32 {
    match distinct {
        0 => 0.0,
        1 => 0.5,
        2 => 0.7,
        _ => 0.85,
    }
}

/// Everything the pipeline learned about one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkAnalysis {
    /// Position of the chunk in the buffer.
    pub index: usize,
    /// Start in seconds.
    pub start_time: f32,
    /// End in seconds, clamped to the buffer duration.
    pub end_time: f32,
    /// Distinct notes from the pitch estimator and the chroma analyzer,
    /// estimator notes first, in first-seen order.
    pub notes: Vec<DetectedNote>,
    /// Pitch classes of `notes`.
    pub pitch_classes: PitchClassSet,
    /// Chunk-level label.
    pub label: ChordLabel,
    /// See [`chunk_confidence`].
    pub confidence: f32,
}

impl ChunkAnalysis {
    /// Assemble a chunk result from its notes.
    pub fn new(
        index: usize,
        start_time: f32,
        end_time: f32,
        notes: Vec<DetectedNote>,
        label: ChordLabel,
    ) -> Self {
        let pitch_classes: PitchClassSet = notes.iter().collect();
        ChunkAnalysis {
            index,
            start_time,
            end_time,
            confidence: chunk_confidence(pitch_classes.len()),
            notes,
            pitch_classes,
            label,
        }
    }

    fn to_run(&self) -> DetectedChord {
        DetectedChord {
            chord: self.label.to_string(),
            start_time: self.start_time,
            end_time: self.end_time,
            confidence: self.confidence,
            notes: self.notes.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Default)]
enum RunState {
    #[default]
    NoActiveRun,
    BuildingRun(DetectedChord),
}

/// Run-building state machine.
///
/// A chunk whose label matches the open run extends it; any other label
/// closes the open run and starts a new one.
#[derive(Debug, Default)]
pub struct Segmenter {
    state: RunState,
    runs: Vec<DetectedChord>,
}

impl Segmenter {
    /// Start with no active run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk. Chunks must arrive in index order.
    pub fn push(&mut self, chunk: &ChunkAnalysis) {
        trace!(
            index = chunk.index,
            label = %chunk.label,
            confidence = chunk.confidence,
            "chunk classified"
        );
        self.push_run(chunk.to_run());
    }

    /// Feed a pre-labelled span.
    pub fn push_run(&mut self, incoming: DetectedChord) {
        self.state = match std::mem::take(&mut self.state) {
            RunState::BuildingRun(mut run) if run.chord == incoming.chord => {
                run.absorb(&incoming);
                RunState::BuildingRun(run)
            }
            RunState::BuildingRun(run) => {
                self.runs.push(run);
                RunState::BuildingRun(incoming)
            }
            RunState::NoActiveRun => RunState::BuildingRun(incoming),
        };
    }

    /// Label of the open run, if any.
    pub fn active_label(&self) -> Option<&str> {
        match &self.state {
            RunState::NoActiveRun => None,
            RunState::BuildingRun(run) => Some(&run.chord),
        }
    }

    /// Close any open run and return every run in order.
    pub fn finish(mut self) -> Vec<DetectedChord> {
        if let RunState::BuildingRun(run) = std::mem::take(&mut self.state) {
            self.runs.push(run);
        }
        self.runs
    }
}
