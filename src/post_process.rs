//! Post Processor
//!
//! Cleans up a raw run sequence: drops blips, re-joins runs split by a
//! short gap, fills rests surrounded by a single chord and drops short
//! rests.

use crate::result::DetectedChord;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Thresholds for [`PostProcessor`], in seconds.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessConfig {
    /// Runs shorter than this are dropped.
    pub min_duration: f32,
    /// Same-label runs separated by less than this are merged.
    pub merge_gap: f32,
    /// `"N/C"` runs are kept only when longer than this.
    pub min_rest_duration: f32,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        PostProcessConfig {
            min_duration: 0.3,
            merge_gap: 0.2,
            min_rest_duration: 1.0,
        }
    }
}

impl PostProcessConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        let fields = [
            ("min_duration", self.min_duration),
            ("merge_gap", self.merge_gap),
            ("min_rest_duration", self.min_rest_duration),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("{name} must be finite and non-negative"));
            }
        }
        Ok(())
    }
}

/// Four-stage timeline clean-up.
#[derive(Debug, Copy, Clone, Default)]
pub struct PostProcessor {
    config: PostProcessConfig,
}

impl PostProcessor {
    /// Create a post-processor with the given thresholds.
    pub fn new(config: PostProcessConfig) -> Self {
        PostProcessor { config }
    }

    /// The thresholds in use.
    pub fn config(&self) -> &PostProcessConfig {
        &self.config
    }

    /// Run [`PostProcessor::pass`] until the sequence stops changing.
    ///
    /// Every pass that changes anything removes a run or an `"N/C"` label,
    /// so this terminates, and the result is a fixed point: processing it
    /// again returns it unchanged.
    pub fn process(&self, runs: Vec<DetectedChord>) -> Vec<DetectedChord> {
        let mut current = runs;
        let mut passes = 0usize;
        loop {
            let next = self.pass(current.clone());
            passes += 1;
            if next == current {
                trace!(passes, runs = next.len(), "post-processing settled");
                return next;
            }
            current = next;
        }
    }

    /// One application of the four stages in order. Gap-fill is followed by
    /// a second gap merge so a filled rest joins its neighbours.
    pub fn pass(&self, runs: Vec<DetectedChord>) -> Vec<DetectedChord> {
        let runs = self.drop_short(runs);
        let runs = self.merge_gaps(runs);
        let runs = fill_isolated_rests(runs);
        let runs = self.merge_gaps(runs);
        self.drop_short_rests(runs)
    }

    /// Stage 1: drop runs shorter than `min_duration`.
    pub fn drop_short(&self, runs: Vec<DetectedChord>) -> Vec<DetectedChord> {
        runs.into_iter()
            .filter(|run| run.duration() >= self.config.min_duration)
            .collect()
    }

    /// Stage 2: merge a run into the previously emitted one when the labels
    /// match and the gap between them is under `merge_gap`.
    pub fn merge_gaps(&self, runs: Vec<DetectedChord>) -> Vec<DetectedChord> {
        let mut merged: Vec<DetectedChord> = Vec::with_capacity(runs.len());
        for run in runs {
            match merged.last_mut() {
                Some(last)
                    if last.chord == run.chord
                        && run.start_time - last.end_time < self.config.merge_gap =>
                {
                    last.absorb(&run);
                }
                _ => merged.push(run),
            }
        }
        merged
    }

    /// Stage 4: drop `"N/C"` runs not longer than `min_rest_duration`.
    pub fn drop_short_rests(&self, runs: Vec<DetectedChord>) -> Vec<DetectedChord> {
        runs.into_iter()
            .filter(|run| !run.is_no_chord() || run.duration() > self.config.min_rest_duration)
            .collect()
    }
}

/// Stage 3: relabel an interior `"N/C"` run whose immediate neighbours share
/// a label. Only direct neighbours are inspected, left to right.
pub fn fill_isolated_rests(mut runs: Vec<DetectedChord>) -> Vec<DetectedChord> {
    for i in 1..runs.len().saturating_sub(1) {
        if runs[i].is_no_chord()
            && !runs[i - 1].is_no_chord()
            && runs[i - 1].chord == runs[i + 1].chord
        {
            runs[i].chord = runs[i - 1].chord.clone();
        }
    }
    runs
}
