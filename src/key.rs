//! Key estimation and sharp/flat spelling of chord labels.

use crate::{note::PitchClass, result::DetectedChord};
use serde::{Deserialize, Serialize};

/// How chord roots are spelled in the output.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spelling {
    /// Always sharps (`A#`, `D#`, `G#`).
    #[default]
    Sharps,
    /// Sharps in sharp keys, `Bb`/`Eb`/`Ab` otherwise.
    KeyAware,
}

/// Keys that are written with sharps.
const SHARP_KEYS: [&str; 13] = [
    "G", "D", "A", "E", "B", "F#", "C#", "Em", "Bm", "F#m", "C#m", "G#m", "D#m",
];

/// Most frequent chord root, counted once per run; ties go to the root that
/// appears first. `"N/C"` and unparseable labels are ignored.
pub fn estimate_key(chords: &[DetectedChord]) -> Option<PitchClass> {
    // (root, count) in first-seen order
    let mut counts: Vec<(PitchClass, usize)> = Vec::new();
    for chord in chords.iter().filter(|c| !c.is_no_chord()) {
        let Some((root, _)) = PitchClass::split_prefix(&chord.chord) else {
            continue;
        };
        match counts.iter_mut().find(|(pc, _)| *pc == root) {
            Some((_, n)) => *n += 1,
            None => counts.push((root, 1)),
        }
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(PitchClass, usize)>, (pc, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((pc, n)),
        })
        .map(|(pc, _)| pc)
}

/// Whether `key` is conventionally written with sharps.
///
/// Only the root spelling is inspected when it carries an accidental
/// (`"F#"` from `"F#m"`); otherwise the whole name is looked up, so both
/// `"E"` and `"Em"` are sharp keys.
pub fn prefers_sharps(key: &str) -> bool {
    let bytes = key.as_bytes();
    let root = if bytes.len() > 1 && matches!(bytes[1], b'#' | b'b') {
        &key[..2]
    } else {
        key
    };
    SHARP_KEYS.contains(&root)
}

/// Respell a chord label for the given context.
///
/// With `prefer_sharps` the label is returned unchanged. Otherwise roots
/// `A#`, `D#` and `G#` become `Bb`, `Eb` and `Ab`; `C#` and `F#` are kept,
/// as is everything after the root.
pub fn respell(label: &str, prefer_sharps: bool) -> String {
    if prefer_sharps {
        return label.to_string();
    }
    let flat = match label.get(..2) {
        Some("A#") => "Bb",
        Some("D#") => "Eb",
        Some("G#") => "Ab",
        _ => return label.to_string(),
    };
    format!("{flat}{}", &label[2..])
}
