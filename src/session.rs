//! Detection Session
//!
//! The calling layer around the pipeline: optionally ask a remote
//! classification service first, and after its first failure use the local
//! analyzer for the rest of the session.

use crate::{
    analyzer::{AnalyzerConfig, AnalyzerError, ChordAnalyzer},
    result::ChordDetectionResult,
};
use thiserror::Error;
use tracing::{info, warn};

/// Where a session sends its next request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DetectionMode {
    /// Try the remote service, fall back locally on failure.
    PreferRemote,
    /// Only run the local pipeline.
    LocalOnly,
}

impl DetectionMode {
    /// The mode after a remote failure. There is no way back.
    pub fn after_remote_failure(self) -> Self {
        DetectionMode::LocalOnly
    }
}

/// An encoded audio file as it would be uploaded.
#[derive(Debug, Copy, Clone)]
pub struct EncodedAudio<'a> {
    /// Original file name, e.g. `"song.mp3"`.
    pub file_name: &'a str,
    /// MIME type, when known.
    pub content_type: Option<&'a str>,
    /// Container bytes.
    pub bytes: &'a [u8],
}

/// Decoded mono PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Samples in `-1.0..=1.0`.
    pub samples: Vec<f32>,
    /// Sampling rate in Hz.
    pub sampling_rate: usize,
}

/// Errors from a remote classification service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never completed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("remote answered {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The response body could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// A remote service that classifies a whole encoded file in one upload.
pub trait RemoteClassifier {
    /// Classify `audio`, returning the same result shape as the local
    /// pipeline.
    fn classify(&self, audio: &EncodedAudio<'_>) -> Result<ChordDetectionResult, RemoteError>;
}

impl<R: RemoteClassifier + ?Sized> RemoteClassifier for &R {
    fn classify(&self, audio: &EncodedAudio<'_>) -> Result<ChordDetectionResult, RemoteError> {
        (**self).classify(audio)
    }
}

impl<R: RemoteClassifier + ?Sized> RemoteClassifier for Box<R> {
    fn classify(&self, audio: &EncodedAudio<'_>) -> Result<ChordDetectionResult, RemoteError> {
        (**self).classify(audio)
    }
}

/// Stand-in remote type for sessions without a remote service.
#[derive(Debug, Copy, Clone)]
pub enum NoRemote {}

impl RemoteClassifier for NoRemote {
    fn classify(&self, _audio: &EncodedAudio<'_>) -> Result<ChordDetectionResult, RemoteError> {
        match *self {}
    }
}

/// Decode a remote JSON response body.
///
/// Chords without a `confidence` get 0.85, chords without `notes` get none.
pub fn parse_remote_response(body: &str) -> Result<ChordDetectionResult, RemoteError> {
    Ok(serde_json::from_str(body)?)
}

/// Errors surfaced by [`DetectionSession::detect`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The caller's decoder failed.
    #[error("failed to decode audio: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// No local analyzer could be built for the decoded audio.
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

/// Remote-first detection with a sticky local fallback.
pub struct DetectionSession<R> {
    mode: DetectionMode,
    remote: Option<R>,
    config: AnalyzerConfig,
    analyzer: Option<ChordAnalyzer>,
}

impl<R: RemoteClassifier> DetectionSession<R> {
    /// A session that prefers `remote`.
    pub fn with_remote(remote: R, config: AnalyzerConfig) -> Self {
        DetectionSession {
            mode: DetectionMode::PreferRemote,
            remote: Some(remote),
            config,
            analyzer: None,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    /// Detect chords in `audio`.
    ///
    /// `decode` is only called when the local pipeline runs.
    pub fn detect<F, E>(
        &mut self,
        audio: EncodedAudio<'_>,
        decode: F,
    ) -> Result<ChordDetectionResult, SessionError>
    where
        F: FnOnce(&[u8]) -> Result<DecodedAudio, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if let (DetectionMode::PreferRemote, Some(remote)) = (self.mode, &self.remote) {
            match remote.classify(&audio) {
                Ok(result) => {
                    info!(file = audio.file_name, "remote classifier answered");
                    return Ok(result);
                }
                Err(err) => {
                    warn!(
                        file = audio.file_name,
                        error = %err,
                        "remote classifier unavailable; using local analysis for the rest of the session"
                    );
                    self.mode = self.mode.after_remote_failure();
                }
            }
        }

        let decoded = decode(audio.bytes).map_err(|e| SessionError::Decode(e.into()))?;
        let analyzer = self.analyzer_for(decoded.sampling_rate)?;
        Ok(analyzer.analyze(&decoded.samples))
    }

    fn analyzer_for(&mut self, sampling_rate: usize) -> Result<&ChordAnalyzer, AnalyzerError> {
        let analyzer = match self.analyzer.take() {
            Some(analyzer) if analyzer.sampling_rate() == sampling_rate => analyzer,
            _ => ChordAnalyzer::builder()
                .sampling_rate(sampling_rate)
                .config(self.config.clone())
                .build()?,
        };
        Ok(self.analyzer.insert(analyzer))
    }
}

impl DetectionSession<NoRemote> {
    /// A session that only runs locally.
    pub fn local(config: AnalyzerConfig) -> Self {
        DetectionSession {
            mode: DetectionMode::LocalOnly,
            remote: None,
            config,
            analyzer: None,
        }
    }
}
