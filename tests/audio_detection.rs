//! Timeline invariants on real recordings.
//!
//! Every `.ogg` under `tests/chord-samples` is decoded and analysed at its
//! own sampling rate. Files named like `C3-maj.ogg` also report whether the
//! expected label appears in the timeline.

use chord_timeline::{ChordAnalyzer, ChordKind, ChordLabel, PitchClass, PostProcessor};
use lazy_static::lazy_static;
use lewton::inside_ogg::OggStreamReader;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

fn load_audio_mono_f32(path: &Path) -> (Vec<f32>, usize) {
    let file = File::open(path).expect("failed to open .ogg file");
    let mut ogg = OggStreamReader::new(file).expect("invalid Ogg/Vorbis file");
    let channels = ogg.ident_hdr.audio_channels as usize;
    let rate = ogg.ident_hdr.audio_sample_rate as usize;
    let mut out = Vec::new();

    while let Some(pcm) = ogg.read_dec_packet_itl().expect("decode error") {
        for frame in pcm.chunks(channels) {
            let sum: f32 = frame.iter().map(|&s| (s as f32) / (i16::MAX as f32)).sum();
            out.push(sum / channels as f32);
        }
    }

    (out, rate)
}

/// Parsed from file names like "C3-maj.ogg"
#[derive(Debug, Clone)]
struct TestFile {
    filename: String,
    path: PathBuf,
    expected: Option<ChordLabel>,
}

fn get_kind(s: &str) -> Option<ChordKind> {
    Some(match s {
        "maj" => ChordKind::Major,
        "min" => ChordKind::Minor,
        "power" => ChordKind::PowerFifth,
        "7" => ChordKind::DominantSeventh,
        "maj7" => ChordKind::MajorSeventh,
        "m7" => ChordKind::MinorSeventh,
        "dim" => ChordKind::Diminished,
        "aug" => ChordKind::Augmented,
        "sus2" => ChordKind::SuspendedSecond,
        "sus4" => ChordKind::SuspendedFourth,
        _ => return None,
    })
}

impl TestFile {
    fn from_path(path: PathBuf) -> Option<Self> {
        let filename = path.file_name()?.to_str()?.to_string();
        let stem = path.file_stem()?.to_str()?;
        let expected = stem.split_once('-').and_then(|(root_oct, kind)| {
            let (root, _octave) = PitchClass::split_prefix(root_oct)?;
            Some(ChordLabel::Chord {
                root,
                kind: get_kind(kind)?,
            })
        });
        Some(TestFile {
            filename,
            path,
            expected,
        })
    }
}

fn collect_test_files(base: &str) -> Vec<TestFile> {
    WalkDir::new(base)
        .into_iter()
        .filter_map(Result::ok)
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("ogg"))
        .filter_map(TestFile::from_path)
        .collect()
}

const AUDIO_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/chord-samples");

lazy_static! {
    static ref TEST_FILES: Vec<TestFile> = collect_test_files(AUDIO_DIR);
}

#[test]
fn recorded_timelines_are_well_formed() {
    if TEST_FILES.is_empty() {
        eprintln!("no .ogg files under {AUDIO_DIR}; recorded-corpus checks skipped");
        return;
    }

    let violations = Arc::new(Mutex::new(Vec::<String>::new()));
    let misses = Arc::new(Mutex::new(Vec::<String>::new()));
    let post = PostProcessor::default();

    TEST_FILES.par_iter().for_each(|tf| {
        let (samples, rate) = load_audio_mono_f32(&tf.path);
        let analyzer = ChordAnalyzer::new(rate).unwrap();
        let result = analyzer.analyze(&samples);
        let mut problems = Vec::new();

        for chord in &result.chords {
            if chord.start_time >= chord.end_time {
                problems.push(format!("empty span {chord:?}"));
            }
            if chord.end_time > result.duration + 1e-4 {
                problems.push(format!("span past end {chord:?}"));
            }
            if !(0.0..=1.0).contains(&chord.confidence) {
                problems.push(format!("confidence out of range {chord:?}"));
            }
        }
        for pair in result.chords.windows(2) {
            if pair[0].end_time > pair[1].start_time {
                problems.push(format!("overlap {:?} / {:?}", pair[0], pair[1]));
            }
            if pair[0].chord == pair[1].chord
                && pair[1].start_time - pair[0].end_time < post.config().merge_gap
            {
                problems.push(format!("unmerged {:?} / {:?}", pair[0], pair[1]));
            }
        }
        if post.process(result.chords.clone()) != result.chords {
            problems.push("post-processing is not idempotent".to_string());
        }

        if !problems.is_empty() {
            let msg = format!("file:{}\n  {}", tf.filename, problems.join("\n  "));
            violations.lock().unwrap().push(msg);
        }

        if let Some(expected) = tf.expected {
            let label = expected.to_string();
            if !result.chords.iter().any(|c| c.chord == label) {
                let found: Vec<&str> = result.chords.iter().map(|c| c.chord.as_str()).collect();
                misses
                    .lock()
                    .unwrap()
                    .push(format!("file:{} expected {label}, got {found:?}", tf.filename));
            }
        }
    });

    let violations = Arc::try_unwrap(violations).unwrap().into_inner().unwrap();
    let mut misses = Arc::try_unwrap(misses).unwrap().into_inner().unwrap();

    if !misses.is_empty() {
        misses.sort();
        eprintln!(
            "{} of {} files missed their label:\n{}",
            misses.len(),
            TEST_FILES.len(),
            misses.join("\n")
        );
    }

    assert!(
        violations.is_empty(),
        "{} files broke timeline invariants:\n\n{}",
        violations.len(),
        violations.join("\n\n")
    );
}
