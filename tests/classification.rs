//! Note naming, template matching, key estimation and spelling.

use chord_timeline::{
    estimate_key, prefers_sharps, respell, ChordAnalyzer, ChordClassifier, ChordKind, ChordLabel,
    DetectedChord, DetectedNote, ParseNoteError, PitchClass, PitchClassSet, Spelling,
};

fn set(names: &[&str]) -> PitchClassSet {
    names.iter().map(|n| n.parse::<PitchClass>().unwrap()).collect()
}

fn label(names: &[&str]) -> String {
    ChordClassifier::new().classify(set(names)).to_string()
}

fn chord(name: &str) -> DetectedChord {
    DetectedChord {
        chord: name.to_string(),
        start_time: 0.0,
        end_time: 1.0,
        confidence: 0.85,
        notes: Vec::new(),
    }
}

#[test]
fn frequencies_map_to_scientific_pitch() {
    let cases = [
        (440.0, "A4"),
        (261.63, "C4"),
        (82.41, "E2"),
        (27.5, "A0"),
        (4186.0, "C8"),
        (466.16, "A#4"),
    ];
    for (freq, expected) in cases {
        let note = DetectedNote::from_frequency(freq).unwrap();
        assert_eq!(note.to_string(), expected, "{freq} Hz");
    }
}

#[test]
fn out_of_range_frequencies_are_rejected() {
    assert_eq!(DetectedNote::from_frequency(19.0), None);
    assert_eq!(DetectedNote::from_frequency(5001.0), None);
    assert_eq!(DetectedNote::from_frequency(f32::NAN), None);
    assert_eq!(DetectedNote::from_frequency(0.0), None);
}

#[test]
fn midi_numbers_below_c0_wrap_correctly() {
    assert_eq!(DetectedNote::from_midi(11).to_string(), "B-1");
    assert_eq!(DetectedNote::from_midi(60).to_string(), "C4");
    assert_eq!(DetectedNote::from_midi(69), DetectedNote::new(PitchClass::A, 4));
}

#[test]
fn note_names_parse() {
    assert_eq!("C#".parse::<PitchClass>(), Ok(PitchClass::Cs));
    assert_eq!("Bb".parse::<PitchClass>(), Ok(PitchClass::As));
    assert_eq!("Cb".parse::<PitchClass>(), Ok(PitchClass::B));
    assert!(matches!(
        "H".parse::<PitchClass>(),
        Err(ParseNoteError::InvalidLetter(_))
    ));
    assert!(matches!(
        "C4".parse::<PitchClass>(),
        Err(ParseNoteError::InvalidOctave(_))
    ));

    assert_eq!(
        "G#3".parse::<DetectedNote>(),
        Ok(DetectedNote::new(PitchClass::Gs, 3))
    );
    assert_eq!("E".parse::<DetectedNote>().map(|n| n.octave), Ok(None));
    assert!("Ex".parse::<DetectedNote>().is_err());
}

#[test]
fn pitch_class_sets_ignore_order_and_octave() {
    let notes = [
        DetectedNote::new(PitchClass::G, 4),
        DetectedNote::new(PitchClass::C, 3),
        DetectedNote::new(PitchClass::G, 2),
        DetectedNote::new(PitchClass::E, 5),
    ];
    let from_notes: PitchClassSet = notes.iter().collect();
    assert_eq!(from_notes, set(&["C", "E", "G"]));
    assert_eq!(from_notes.len(), 3);
    assert_eq!(from_notes.lowest(), Some(PitchClass::C));
    assert_eq!(from_notes.intervals_from(PitchClass::C), 0b1001_0001);
    assert_eq!(
        from_notes.iter().collect::<Vec<_>>(),
        vec![PitchClass::C, PitchClass::E, PitchClass::G]
    );
    assert!(PitchClassSet::empty().is_empty());
}

#[test]
fn empty_and_single_sets() {
    assert_eq!(label(&[]), "N/C");
    assert_eq!(label(&["A"]), "A");
    assert_eq!(
        ChordClassifier::new().classify(set(&["F#"])),
        ChordLabel::Note(PitchClass::Fs)
    );
}

#[test]
fn triads_and_sevenths_match_templates() {
    assert_eq!(label(&["C", "E", "G"]), "C");
    assert_eq!(label(&["E", "G", "B"]), "Em");
    assert_eq!(label(&["G", "B", "D"]), "G");
    assert_eq!(label(&["B", "D", "F"]), "Bdim");
    assert_eq!(label(&["G", "B", "D", "F"]), "G7");
    assert_eq!(label(&["C", "E", "G", "B"]), "Cmaj7");
    assert_eq!(label(&["D", "F", "A", "C"]), "Dm7");
    assert_eq!(label(&["B", "D", "F", "A"]), "Bm7b5");
    assert_eq!(label(&["E", "B"]), "E5");
}

#[test]
fn tie_breaks_follow_template_then_root_order() {
    // sus2 before sus4
    assert_eq!(label(&["C", "D", "G"]), "Csus2");
    assert_eq!(label(&["D", "G", "A"]), "Gsus2");
    // seventh before sixth
    assert_eq!(label(&["A", "C", "E", "G"]), "Am7");
    // symmetric chords take the lowest root from C
    assert_eq!(label(&["E", "G#", "C"]), "Caug");
    assert_eq!(label(&["B", "D", "F", "G#"]), "Ddim7");
}

#[test]
fn unmatched_sets_fall_back_to_lowest_pitch_class() {
    assert_eq!(label(&["E", "F"]), "E");
    assert_eq!(label(&["G", "C#", "D", "A#"]), "C#");
}

#[test]
fn classification_is_deterministic() {
    let classifier = ChordClassifier::new();
    let forward = [
        DetectedNote::new(PitchClass::E, 4),
        DetectedNote::new(PitchClass::G, 4),
        DetectedNote::new(PitchClass::B, 3),
    ];
    let mut backward = forward;
    backward.reverse();
    assert_eq!(
        classifier.classify_notes(&forward),
        classifier.classify_notes(&backward)
    );
    assert_eq!(
        classifier.classify_notes(&forward),
        ChordLabel::Chord {
            root: PitchClass::E,
            kind: ChordKind::Minor
        }
    );
}

#[test]
fn labels_expose_their_root() {
    assert_eq!(ChordLabel::NoChord.root(), None);
    assert_eq!(ChordLabel::Note(PitchClass::D).root(), Some(PitchClass::D));
    assert_eq!(ChordKind::MinorSeventh.suffix(), "m7");
    assert_eq!(ChordKind::Major.suffix(), "");
}

#[test]
fn key_is_the_most_frequent_root() {
    let chords: Vec<_> = ["E", "A", "B", "G#m", "E", "N/C", "N/C", "N/C"]
        .iter()
        .map(|c| chord(c))
        .collect();
    assert_eq!(estimate_key(&chords), Some(PitchClass::E));

    let tie: Vec<_> = ["Am", "C", "C", "Am"].iter().map(|c| chord(c)).collect();
    assert_eq!(estimate_key(&tie), Some(PitchClass::A));

    assert_eq!(estimate_key(&[chord("N/C")]), None);
    assert_eq!(estimate_key(&[]), None);
}

#[test]
fn sharp_keys_keep_sharps() {
    assert!(prefers_sharps("E"));
    assert!(prefers_sharps("F#"));
    assert!(prefers_sharps("Em"));
    assert!(!prefers_sharps("F"));
    assert!(!prefers_sharps("Bb"));
    assert!(!prefers_sharps("C"));

    assert_eq!(respell("G#m", true), "G#m");
    assert_eq!(respell("A#", false), "Bb");
    assert_eq!(respell("D#7", false), "Eb7");
    assert_eq!(respell("G#m", false), "Abm");
    assert_eq!(respell("F#m", false), "F#m");
    assert_eq!(respell("N/C", false), "N/C");
}

#[test]
fn key_aware_spelling_rewrites_labels() {
    // A# major triad
    let freqs = [233.0819f32, 293.6648, 349.2282];
    let samples: Vec<f32> = (0..44_100)
        .map(|i| {
            let t = i as f32 / 44_100.0;
            freqs
                .iter()
                .map(|&f| 0.3 * (2.0 * std::f32::consts::PI * f * t).sin())
                .sum()
        })
        .collect();

    let sharps = ChordAnalyzer::new(44_100).unwrap().analyze(&samples);
    assert_eq!(sharps.chords[0].chord, "A#");
    assert_eq!(sharps.key.as_deref(), Some("A#"));

    let aware = ChordAnalyzer::builder()
        .spelling(Spelling::KeyAware)
        .build()
        .unwrap()
        .analyze(&samples);
    assert_eq!(aware.chords[0].chord, "Bb");
    assert_eq!(aware.key.as_deref(), Some("Bb"));

    let no_key = ChordAnalyzer::builder()
        .estimate_key(false)
        .build()
        .unwrap()
        .analyze(&samples);
    assert_eq!(no_key.key, None);
}
