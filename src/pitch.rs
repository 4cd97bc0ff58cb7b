//! Pitch Estimator
//!
//! Monophonic fundamental-frequency estimation for one tapered frame using
//! the YIN difference function (de Cheveigné & Kawahara, 2002).
//!
//! The cross term of the difference function is evaluated as an FFT
//! correlation and the energy terms from prefix sums.

use crate::note::{DetectedNote, MAX_FREQUENCY, MIN_FREQUENCY};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by the pitch estimator.
#[derive(Debug, Error, PartialEq)]
pub enum PitchError {
    /// Frame received was not of the expected size.
    #[error("expected frame of length {expected}, got {got}")]
    InvalidFrameSize {
        /// The configured frame length.
        expected: usize,
        /// The length actually supplied.
        got: usize,
    },

    /// An error occurred while configuring the estimator.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Builder for a [`PitchEstimator`].
pub struct PitchEstimatorBuilder {
    sampling_rate: usize,
    frame_size: usize,
    threshold: f32,
    min_frequency: f32,
    max_frequency: f32,
}

impl PitchEstimatorBuilder {
    /// Start with default parameters:
    /// sampling_rate = 44_100, frame_size = 2048, threshold = 0.1,
    /// frequency range 20..=5000 Hz.
    pub fn new() -> Self {
        PitchEstimatorBuilder {
            sampling_rate: 44_100,
            frame_size: 2048,
            threshold: 0.1,
            min_frequency: MIN_FREQUENCY,
            max_frequency: MAX_FREQUENCY,
        }
    }

    /// Set the sampling rate of the audio.
    pub fn sampling_rate(mut self, rate: usize) -> Self {
        self.sampling_rate = rate;
        self
    }

    /// Set the frame length the estimator is planned for.
    pub fn frame_size(mut self, size: usize) -> Self {
        self.frame_size = size;
        self
    }

    /// Set the YIN absolute threshold on the normalised difference.
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the accepted fundamental range in Hz.
    pub fn frequency_range(mut self, min: f32, max: f32) -> Self {
        self.min_frequency = min;
        self.max_frequency = max;
        self
    }

    /// Finalize and create the estimator.
    pub fn build(self) -> Result<PitchEstimator, PitchError> {
        if self.sampling_rate == 0 {
            return Err(PitchError::Configuration("sampling_rate cannot be zero".into()));
        }
        if self.frame_size < 4 {
            return Err(PitchError::Configuration(
                "frame_size must be at least 4 samples".into(),
            ));
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(PitchError::Configuration(
                "threshold must lie strictly between 0 and 1".into(),
            ));
        }
        if !(self.min_frequency.is_finite()
            && self.max_frequency.is_finite()
            && self.min_frequency > 0.0
            && self.min_frequency < self.max_frequency)
        {
            return Err(PitchError::Configuration(
                "frequency range must be positive and ordered".into(),
            ));
        }

        let half = self.frame_size / 2;
        let fft_len = (self.frame_size + half).next_power_of_two();
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        let rate = self.sampling_rate as f32;
        let min_tau = ((rate / self.max_frequency) as usize).max(2);
        let max_tau = ((rate / self.min_frequency) as usize).min(half - 1);
        if min_tau >= max_tau {
            return Err(PitchError::Configuration(
                "frame_size too short for the requested frequency range".into(),
            ));
        }

        Ok(PitchEstimator {
            sampling_rate: rate,
            frame_size: self.frame_size,
            threshold: self.threshold,
            min_frequency: self.min_frequency,
            max_frequency: self.max_frequency,
            min_tau,
            max_tau,
            fft_len,
            forward,
            inverse,
        })
    }
}

impl Default for PitchEstimatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// YIN fundamental-frequency estimator for fixed-length frames.
#[derive(Clone)]
pub struct PitchEstimator {
    sampling_rate: f32,
    frame_size: usize,
    threshold: f32,
    min_frequency: f32,
    max_frequency: f32,
    min_tau: usize,
    max_tau: usize,
    fft_len: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl PitchEstimator {
    /// Start customizing with a builder.
    pub fn builder() -> PitchEstimatorBuilder {
        PitchEstimatorBuilder::new()
    }

    /// Frame length the estimator expects.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Estimate the fundamental of one frame in Hz.
    ///
    /// Returns `Ok(None)` when no period is clear enough, or the estimate
    /// falls outside the configured frequency range.
    pub fn estimate(&self, frame: &[f32]) -> Result<Option<f32>, PitchError> {
        if frame.len() != self.frame_size {
            return Err(PitchError::InvalidFrameSize {
                expected: self.frame_size,
                got: frame.len(),
            });
        }
        Ok(self.estimate_unchecked(frame))
    }

    /// Estimate the fundamental of one frame and name the nearest note.
    pub fn detect_note(&self, frame: &[f32]) -> Result<Option<DetectedNote>, PitchError> {
        Ok(self.estimate(frame)?.and_then(DetectedNote::from_frequency))
    }

    /// Caller guarantees `frame.len() == self.frame_size`.
    pub(crate) fn estimate_unchecked(&self, frame: &[f32]) -> Option<f32> {
        let cmnd = self.normalized_difference(frame)?;
        let tau = self.absolute_threshold(&cmnd)?;
        let frequency = self.sampling_rate / parabolic_interpolation(&cmnd, tau);
        (frequency.is_finite() && (self.min_frequency..=self.max_frequency).contains(&frequency))
            .then_some(frequency)
    }

    /// Cumulative-mean-normalised difference for lags `0..=max_tau`.
    /// `None` for a silent frame.
    fn normalized_difference(&self, frame: &[f32]) -> Option<Vec<f32>> {
        let half = frame.len() / 2;

        let mut prefix = Vec::with_capacity(frame.len() + 1);
        prefix.push(0.0f32);
        for &s in frame {
            let last = prefix[prefix.len() - 1];
            prefix.push(last + s * s);
        }
        let head_energy = prefix[half];
        if head_energy <= f32::EPSILON {
            return None;
        }

        let correlation = self.cross_correlation(frame, half);

        let mut cmnd = vec![1.0f32; self.max_tau + 1];
        let mut running = 0.0f32;
        for tau in 1..=self.max_tau {
            let shifted_energy = prefix[tau + half] - prefix[tau];
            let diff = (head_energy + shifted_energy - 2.0 * correlation[tau]).max(0.0);
            running += diff;
            cmnd[tau] = if running > 0.0 {
                diff * tau as f32 / running
            } else {
                1.0
            };
        }
        Some(cmnd)
    }

    /// `c[tau] = Σ_{j < half} x[j] · x[j + tau]` via conj(FFT(head)) · FFT(frame).
    fn cross_correlation(&self, frame: &[f32], half: usize) -> Vec<f32> {
        let zero = Complex { re: 0.0, im: 0.0 };
        let mut head = vec![zero; self.fft_len];
        let mut full = vec![zero; self.fft_len];
        for (i, &s) in frame.iter().enumerate() {
            full[i].re = s;
            if i < half {
                head[i].re = s;
            }
        }

        self.forward.process(&mut head);
        self.forward.process(&mut full);
        for (h, f) in head.iter_mut().zip(&full) {
            *h = h.conj() * *f;
        }
        self.inverse.process(&mut head);

        let scale = 1.0 / self.fft_len as f32;
        head.iter().take(half).map(|c| c.re * scale).collect()
    }

    /// First lag under the threshold, walked down to its local minimum.
    fn absolute_threshold(&self, cmnd: &[f32]) -> Option<usize> {
        let mut tau = self.min_tau;
        while tau <= self.max_tau {
            if cmnd[tau] < self.threshold {
                while tau < self.max_tau && cmnd[tau + 1] < cmnd[tau] {
                    tau += 1;
                }
                return Some(tau);
            }
            tau += 1;
        }
        None
    }
}

fn parabolic_interpolation(cmnd: &[f32], tau: usize) -> f32 {
    if tau == 0 || tau + 1 >= cmnd.len() {
        return tau as f32;
    }
    let (a, b, c) = (cmnd[tau - 1], cmnd[tau], cmnd[tau + 1]);
    let denom = a - 2.0 * b + c;
    if denom.abs() < f32::EPSILON {
        tau as f32
    } else {
        tau as f32 + (a - c) / (2.0 * denom)
    }
}
