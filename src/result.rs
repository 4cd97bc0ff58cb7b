//! Output types handed to playback and visualisation collaborators.
//!
//! Both types serialise with camelCase keys (`startTime`, `endTime`, ...),
//! which is also the shape a remote classification service answers with.

use crate::chord_detector::NO_CHORD;
use serde::{Deserialize, Serialize};

/// Confidence assumed for remote chords that do not report one.
pub const DEFAULT_REMOTE_CONFIDENCE: f32 = 0.85;

fn default_confidence() -> f32 {
    DEFAULT_REMOTE_CONFIDENCE
}

/// One labelled span of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedChord {
    /// Chord label, or `"N/C"` for no chord.
    pub chord: String,
    /// Start in seconds.
    pub start_time: f32,
    /// End in seconds, exclusive.
    pub end_time: f32,
    /// Confidence in `0.0..=1.0`.
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// Distinct contributing note names in first-seen order.
    #[serde(default)]
    pub notes: Vec<String>,
}

impl DetectedChord {
    /// Length of the span in seconds.
    pub fn duration(&self) -> f32 {
        self.end_time - self.start_time
    }

    /// Whether this span is the no-chord sentinel.
    pub fn is_no_chord(&self) -> bool {
        self.chord == NO_CHORD
    }

    /// Absorb `other` into `self`: extend to its end, keep the higher
    /// confidence and append notes not already listed.
    pub(crate) fn absorb(&mut self, other: &DetectedChord) {
        self.end_time = other.end_time;
        self.confidence = self.confidence.max(other.confidence);
        for note in &other.notes {
            if !self.notes.contains(note) {
                self.notes.push(note.clone());
            }
        }
    }
}

/// The full answer for one analysis call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChordDetectionResult {
    /// Chords ordered by start time, non-overlapping.
    pub chords: Vec<DetectedChord>,
    /// Input duration in seconds.
    pub duration: f32,
    /// Estimated key, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Tempo in beats per minute, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f32>,
}
