//! # chord_timeline
//!
//! Turn a decoded mono waveform into a time-ordered sequence of chord labels
//! with confidence scores.
//!
//! The buffer is cut into fixed chunks (0.5 s by default). Each chunk is
//! searched for notes twice: a YIN pitch estimator over overlapping
//! Hann-tapered frames, and a Goertzel filter bank over the whole chunk
//! that gives per-pitch-class energy. The union of the notes is matched
//! against chord templates, equal neighbouring chunks are joined into runs,
//! and the runs are cleaned up (blips dropped, short gaps closed, short
//! rests removed).
//!
//! ## Example
//! ```rust
//! use chord_timeline::ChordAnalyzer;
//!
//! fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let analyzer = ChordAnalyzer::builder()
//!         .sampling_rate(44_100)
//!         .chunk_duration(0.5)
//!         .build()?;
//!
//!     // one second of an A4 sine
//!     let samples: Vec<f32> = (0..44_100)
//!         .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin())
//!         .collect();
//!
//!     let result = analyzer.analyze(&samples);
//!     for chord in &result.chords {
//!         println!(
//!             "{:>6.2}s - {:>6.2}s  {:<6} confidence {:.2}",
//!             chord.start_time, chord.end_time, chord.chord, chord.confidence
//!         );
//!     }
//!     Ok(())
//! }
//! # run().unwrap();
//! ```
//!
//! ## Features
//! - `parallel`: analyse chunks on the `rayon` thread pool

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

/// One-call pipeline and its configuration.
pub use analyzer::{AnalyzerConfig, AnalyzerError, ChordAnalyzer, ChordAnalyzerBuilder};

/// Pitch-class set to chord label classification.
pub use chord_detector::{ChordClassifier, ChordKind, ChordLabel, ChordTemplate, NO_CHORD, TEMPLATES};

/// Goertzel filter-bank chroma analysis.
pub use chromagram::{
    goertzel_magnitude, Chroma, ChromaAnalyzer, ChromaAnalyzerBuilder, ChromagramError,
};

/// Key estimation and spelling.
pub use key::{estimate_key, prefers_sharps, respell, Spelling};

/// Pitch classes and notes.
pub use note::{DetectedNote, ParseNoteError, PitchClass, PitchClassSet, SEMITONES};

/// YIN pitch estimation.
pub use pitch::{PitchError, PitchEstimator, PitchEstimatorBuilder};

/// Timeline clean-up.
pub use post_process::{fill_isolated_rests, PostProcessConfig, PostProcessor};

/// Output contract.
pub use result::{ChordDetectionResult, DetectedChord};

/// Run building.
pub use segmenter::{chunk_confidence, ChunkAnalysis, Segmenter};

/// Remote-first calling layer.
pub use session::{
    parse_remote_response, DecodedAudio, DetectionMode, DetectionSession, EncodedAudio, NoRemote,
    RemoteClassifier, RemoteError, SessionError,
};

/// Frame slicing and tapering.
pub use window::{Frame, Frames, WindowError, Windower};

/// Pipeline driver module.
pub mod analyzer;

/// Chord classification module.
pub mod chord_detector;

/// Chroma analysis module.
pub mod chromagram;

/// Key and spelling module.
pub mod key;

/// Note and pitch-class module.
pub mod note;

/// Pitch estimation module.
pub mod pitch;

/// Post-processing module.
pub mod post_process;

/// Result types module.
pub mod result;

/// Segmentation module.
pub mod segmenter;

/// Remote/local session module.
pub mod session;

/// Windowing module.
pub mod window;
