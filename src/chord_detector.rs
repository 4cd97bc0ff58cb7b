//! Chord Detector
//!
//! Maps the set of pitch classes heard in a chunk onto a chord label by
//! exact template matching.
//!
//! Matching walks [`TEMPLATES`] in order and, for each template, the
//! candidate roots in chromatic order from C; the first exact fit wins.
//! Triads come before seventh chords, major before minor, and dyads last,
//! so e.g. `{C, D, G}` is `Csus2` rather than `Gsus4`, and `{A, C, E, G}`
//! is `Am7` rather than a sixth chord.

use crate::note::{DetectedNote, PitchClass, PitchClassSet};
use std::fmt::{self, Display};

/// Label for a chunk or run with no detected pitch content.
pub const NO_CHORD: &str = "N/C";

/// Supported chord qualities.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChordKind {
    /// Major chord (e.g., C-E-G)
    Major,
    /// Minor chord (e.g., C-Eb-G)
    Minor,
    /// Diminished chord (e.g., C-Eb-Gb)
    Diminished,
    /// Augmented chord (e.g., C-E-G#)
    Augmented,
    /// Suspended second chord (e.g., C-D-G)
    SuspendedSecond,
    /// Suspended fourth chord (e.g., C-F-G)
    SuspendedFourth,
    /// Dominant seventh chord (e.g., C-E-G-Bb)
    DominantSeventh,
    /// Major seventh chord (e.g., C-E-G-B)
    MajorSeventh,
    /// Minor seventh chord (e.g., C-Eb-G-Bb)
    MinorSeventh,
    /// Minor-major seventh chord (e.g., C-Eb-G-B)
    MinorMajorSeventh,
    /// Half-diminished seventh chord (e.g., C-Eb-Gb-Bb)
    HalfDiminishedSeventh,
    /// Diminished seventh chord (e.g., C-Eb-Gb-A)
    DiminishedSeventh,
    /// Major sixth chord (e.g., C-E-G-A)
    MajorSixth,
    /// Minor sixth chord (e.g., C-Eb-G-A)
    MinorSixth,
    /// Power chord (e.g., C-G)
    PowerFifth,
}

impl ChordKind {
    /// Suffix appended to the root in a label (`""` for major).
    pub fn suffix(self) -> &'static str {
        TEMPLATES
            .iter()
            .find(|t| t.kind == self)
            .map_or("", |t| t.suffix)
    }
}

impl Display for ChordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A chord quality and its intervals above the root as a 12-bit mask.
#[derive(Debug)]
pub struct ChordTemplate {
    /// Quality this template detects.
    pub kind: ChordKind,
    /// Label suffix, e.g. `"m7"`.
    pub suffix: &'static str,
    /// Bit `i` set when the interval of `i` semitones belongs to the chord.
    pub intervals: u16,
}

impl ChordTemplate {
    const fn new(kind: ChordKind, suffix: &'static str, intervals: &[u8]) -> Self {
        let mut mask = 0u16;
        let mut i = 0;
        while i < intervals.len() {
            mask |= 1 << intervals[i];
            i += 1;
        }
        ChordTemplate {
            kind,
            suffix,
            intervals: mask,
        }
    }
}

/// Chord templates in match priority order.
pub static TEMPLATES: &[ChordTemplate] = &[
    // Triads
    ChordTemplate::new(ChordKind::Major, "", &[0, 4, 7]),
    ChordTemplate::new(ChordKind::Minor, "m", &[0, 3, 7]),
    ChordTemplate::new(ChordKind::Diminished, "dim", &[0, 3, 6]),
    ChordTemplate::new(ChordKind::Augmented, "aug", &[0, 4, 8]),
    ChordTemplate::new(ChordKind::SuspendedSecond, "sus2", &[0, 2, 7]),
    ChordTemplate::new(ChordKind::SuspendedFourth, "sus4", &[0, 5, 7]),
    // Sevenths
    ChordTemplate::new(ChordKind::DominantSeventh, "7", &[0, 4, 7, 10]),
    ChordTemplate::new(ChordKind::MajorSeventh, "maj7", &[0, 4, 7, 11]),
    ChordTemplate::new(ChordKind::MinorSeventh, "m7", &[0, 3, 7, 10]),
    ChordTemplate::new(ChordKind::MinorMajorSeventh, "m(maj7)", &[0, 3, 7, 11]),
    ChordTemplate::new(ChordKind::HalfDiminishedSeventh, "m7b5", &[0, 3, 6, 10]),
    ChordTemplate::new(ChordKind::DiminishedSeventh, "dim7", &[0, 3, 6, 9]),
    // Sixths
    ChordTemplate::new(ChordKind::MajorSixth, "6", &[0, 4, 7, 9]),
    ChordTemplate::new(ChordKind::MinorSixth, "m6", &[0, 3, 7, 9]),
    // Dyad
    ChordTemplate::new(ChordKind::PowerFifth, "5", &[0, 7]),
];

/// Result of classifying a pitch-class set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChordLabel {
    /// Nothing detected; displays as `"N/C"`.
    NoChord,
    /// A lone pitch class, or the fallback root when no template fits.
    Note(PitchClass),
    /// A template match.
    Chord {
        /// Root of the chord.
        root: PitchClass,
        /// Quality of the chord.
        kind: ChordKind,
    },
}

impl ChordLabel {
    /// Root pitch class, if any.
    pub fn root(&self) -> Option<PitchClass> {
        match *self {
            ChordLabel::NoChord => None,
            ChordLabel::Note(root) | ChordLabel::Chord { root, .. } => Some(root),
        }
    }
}

impl Display for ChordLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordLabel::NoChord => f.write_str(NO_CHORD),
            ChordLabel::Note(pc) => write!(f, "{pc}"),
            ChordLabel::Chord { root, kind } => write!(f, "{root}{}", kind.suffix()),
        }
    }
}

/// Template-matching chord classifier. Holds no state; the template table
/// is static.
#[derive(Debug, Copy, Clone, Default)]
pub struct ChordClassifier;

impl ChordClassifier {
    /// Create a classifier.
    pub fn new() -> Self {
        ChordClassifier
    }

    /// Classify a pitch-class set.
    ///
    /// - empty set: [`ChordLabel::NoChord`]
    /// - one pitch class: that pitch class
    /// - otherwise the first exact template fit, falling back to the lowest
    ///   pitch class from C
    pub fn classify(&self, set: PitchClassSet) -> ChordLabel {
        match set.len() {
            0 => ChordLabel::NoChord,
            1 => set.lowest().map_or(ChordLabel::NoChord, ChordLabel::Note),
            _ => self
                .match_template(set)
                .or_else(|| set.lowest().map(ChordLabel::Note))
                .unwrap_or(ChordLabel::NoChord),
        }
    }

    /// Classify notes after stripping octaves and duplicates.
    pub fn classify_notes(&self, notes: &[DetectedNote]) -> ChordLabel {
        self.classify(notes.iter().collect())
    }

    fn match_template(&self, set: PitchClassSet) -> Option<ChordLabel> {
        TEMPLATES.iter().find_map(|template| {
            set.iter()
                .find(|&root| set.intervals_from(root) == template.intervals)
                .map(|root| ChordLabel::Chord {
                    root,
                    kind: template.kind,
                })
        })
    }
}
