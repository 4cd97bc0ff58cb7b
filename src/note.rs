//! Notes
//!
//! Pitch classes, pitch-class sets and the note names produced by the
//! pitch estimator and the chroma analyzer.

use std::{fmt, str::FromStr};
use thiserror::Error;

/// Number of pitch classes in an octave.
pub const SEMITONES: usize = 12;

/// Lowest frequency accepted as a real instrumental pitch.
pub const MIN_FREQUENCY: f32 = 20.0;

/// Highest frequency accepted as a real instrumental pitch.
pub const MAX_FREQUENCY: f32 = 5000.0;

const SHARP_NAMES: [&str; SEMITONES] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const FLAT_NAMES: [&str; SEMITONES] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Twelve chromatic pitch classes, starting at C.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    /// C
    C,
    /// C sharp / D flat
    Cs,
    /// D
    D,
    /// D sharp / E flat
    Ds,
    /// E
    E,
    /// F
    F,
    /// F sharp / G flat
    Fs,
    /// G
    G,
    /// G sharp / A flat
    Gs,
    /// A
    A,
    /// A sharp / B flat
    As,
    /// B
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order from C.
    pub const ALL: [PitchClass; SEMITONES] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Pitch class for a semitone index; wraps modulo 12.
    pub const fn from_index(idx: usize) -> PitchClass {
        Self::ALL[idx % SEMITONES]
    }

    /// Semitone index above C (0..12).
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Sharp spelling, e.g. `"C#"`.
    pub const fn name(self) -> &'static str {
        SHARP_NAMES[self as usize]
    }

    /// Flat spelling, e.g. `"Db"`.
    pub const fn flat_name(self) -> &'static str {
        FLAT_NAMES[self as usize]
    }

    /// The pitch class `semitones` above this one.
    pub const fn transpose(self, semitones: usize) -> PitchClass {
        Self::from_index(self as usize + semitones)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors when parsing note or pitch-class names.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseNoteError {
    /// The name did not start with a note letter A-G.
    #[error("invalid note letter in `{0}`")]
    InvalidLetter(String),

    /// Characters followed the pitch class that are not an octave number.
    #[error("invalid octave in `{0}`")]
    InvalidOctave(String),
}

impl PitchClass {
    /// Split a leading pitch-class spelling (`"C"`, `"F#"`, `"Bb"`) off `s`,
    /// returning the pitch class and the untouched remainder.
    pub fn split_prefix(s: &str) -> Option<(PitchClass, &str)> {
        let mut chars = s.chars();
        let base = match chars.next()? {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };
        let rest = &s[1..];
        let (idx, rest) = match rest.chars().next() {
            Some('#') => (base + 1, &rest[1..]),
            Some('b') => (base + SEMITONES - 1, &rest[1..]),
            _ => (base, rest),
        };
        Some((PitchClass::from_index(idx), rest))
    }
}

impl FromStr for PitchClass {
    type Err = ParseNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match PitchClass::split_prefix(s) {
            Some((pc, "")) => Ok(pc),
            Some(_) => Err(ParseNoteError::InvalidOctave(s.to_string())),
            None => Err(ParseNoteError::InvalidLetter(s.to_string())),
        }
    }
}

/// A detected note: a pitch class and, when known, its octave.
///
/// Displays as `"A4"`, or `"A"` without an octave.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DetectedNote {
    /// Pitch class of the note.
    pub pitch_class: PitchClass,
    /// Scientific-pitch octave (A4 = 440 Hz).
    pub octave: Option<i32>,
}

impl DetectedNote {
    /// A note with an octave.
    pub const fn new(pitch_class: PitchClass, octave: i32) -> Self {
        DetectedNote {
            pitch_class,
            octave: Some(octave),
        }
    }

    /// Note for a MIDI note number (60 = C4).
    pub fn from_midi(midi: i32) -> Self {
        DetectedNote {
            pitch_class: PitchClass::from_index(midi.rem_euclid(SEMITONES as i32) as usize),
            octave: Some(midi.div_euclid(SEMITONES as i32) - 1),
        }
    }

    /// Nearest equal-tempered note for `frequency`.
    ///
    /// Returns `None` for non-finite values and frequencies outside
    /// [`MIN_FREQUENCY`]..=[`MAX_FREQUENCY`].
    pub fn from_frequency(frequency: f32) -> Option<Self> {
        if !frequency.is_finite() || !(MIN_FREQUENCY..=MAX_FREQUENCY).contains(&frequency) {
            return None;
        }
        let midi = (12.0 * (frequency / 440.0).log2() + 69.0).round() as i32;
        Some(Self::from_midi(midi))
    }
}

impl fmt::Display for DetectedNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.octave {
            Some(octave) => write!(f, "{}{}", self.pitch_class, octave),
            None => write!(f, "{}", self.pitch_class),
        }
    }
}

impl FromStr for DetectedNote {
    type Err = ParseNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (pitch_class, rest) = PitchClass::split_prefix(s)
            .ok_or_else(|| ParseNoteError::InvalidLetter(s.to_string()))?;
        let octave = if rest.is_empty() {
            None
        } else {
            Some(
                rest.parse::<i32>()
                    .map_err(|_| ParseNoteError::InvalidOctave(s.to_string()))?,
            )
        };
        Ok(DetectedNote {
            pitch_class,
            octave,
        })
    }
}

/// A set of pitch classes, stored as a 12-bit mask (bit `i` = pitch class `i`).
///
/// Iteration is always in chromatic order from C, so anything derived from a
/// set is independent of the order notes were observed in.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PitchClassSet(u16);

impl PitchClassSet {
    /// The empty set.
    pub const fn empty() -> Self {
        PitchClassSet(0)
    }

    /// Build a set from a raw 12-bit mask; higher bits are discarded.
    pub const fn from_mask(mask: u16) -> Self {
        PitchClassSet(mask & 0x0fff)
    }

    /// The raw 12-bit mask.
    pub const fn mask(self) -> u16 {
        self.0
    }

    /// Add a pitch class.
    pub fn insert(&mut self, pc: PitchClass) {
        self.0 |= 1 << pc.index();
    }

    /// Whether `pc` is in the set.
    pub const fn contains(self, pc: PitchClass) -> bool {
        self.0 & (1 << pc as usize) != 0
    }

    /// Number of distinct pitch classes.
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether the set is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Lowest pitch class counting from C.
    pub fn lowest(self) -> Option<PitchClass> {
        self.iter().next()
    }

    /// Members in chromatic order from C.
    pub fn iter(self) -> impl Iterator<Item = PitchClass> {
        PitchClass::ALL.into_iter().filter(move |&pc| self.contains(pc))
    }

    /// Interval mask of the set relative to `root`: bit `i` is set when the
    /// pitch class `i` semitones above `root` is a member.
    pub fn intervals_from(self, root: PitchClass) -> u16 {
        self.iter().fold(0u16, |mask, pc| {
            let interval = (pc.index() + SEMITONES - root.index()) % SEMITONES;
            mask | 1 << interval
        })
    }
}

impl FromIterator<PitchClass> for PitchClassSet {
    fn from_iter<I: IntoIterator<Item = PitchClass>>(iter: I) -> Self {
        let mut set = PitchClassSet::empty();
        for pc in iter {
            set.insert(pc);
        }
        set
    }
}

impl<'a> FromIterator<&'a DetectedNote> for PitchClassSet {
    fn from_iter<I: IntoIterator<Item = &'a DetectedNote>>(iter: I) -> Self {
        iter.into_iter().map(|note| note.pitch_class).collect()
    }
}
