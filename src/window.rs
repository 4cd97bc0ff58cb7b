//! Windower
//!
//! Slices a mono buffer into overlapping, Hann-tapered analysis frames.

use std::f32::consts::PI;
use thiserror::Error;

/// Errors returned when configuring a [`Windower`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    /// The window must span at least two samples.
    #[error("window length must be at least 2 samples, got {0}")]
    WindowTooShort(usize),

    /// The hop must advance by at least one sample.
    #[error("hop length cannot be zero")]
    ZeroHop,
}

/// One tapered analysis frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Offset of the first sample within the sliced buffer.
    pub offset: usize,
    /// `window_len` tapered samples.
    pub samples: Vec<f32>,
}

/// Produces fixed-length Hann-tapered frames with a fixed hop.
#[derive(Debug, Clone)]
pub struct Windower {
    hop_len: usize,
    taper: Vec<f32>,
}

impl Windower {
    /// Create a windower; the Hann taper is computed once here.
    pub fn new(window_len: usize, hop_len: usize) -> Result<Self, WindowError> {
        if window_len < 2 {
            return Err(WindowError::WindowTooShort(window_len));
        }
        if hop_len == 0 {
            return Err(WindowError::ZeroHop);
        }
        Ok(Windower {
            hop_len,
            taper: hann_window(window_len),
        })
    }

    /// Frame length in samples.
    pub fn window_len(&self) -> usize {
        self.taper.len()
    }

    /// Hop between frame starts in samples.
    pub fn hop_len(&self) -> usize {
        self.hop_len
    }

    /// The taper coefficients.
    pub fn taper(&self) -> &[f32] {
        &self.taper
    }

    /// Lazily iterate over every complete frame of `samples`.
    ///
    /// A trailing region shorter than the window yields no frame.
    pub fn frames<'a>(&'a self, samples: &'a [f32]) -> Frames<'a> {
        Frames {
            windower: self,
            samples,
            offset: 0,
        }
    }

    /// Number of frames [`Windower::frames`] yields for `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        if len < self.window_len() {
            0
        } else {
            (len - self.window_len()) / self.hop_len + 1
        }
    }
}

/// Iterator returned by [`Windower::frames`].
pub struct Frames<'a> {
    windower: &'a Windower,
    samples: &'a [f32],
    offset: usize,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let end = self.offset.checked_add(self.windower.window_len())?;
        let raw = self.samples.get(self.offset..end)?;
        let samples = raw
            .iter()
            .zip(&self.windower.taper)
            .map(|(&s, &w)| s * w)
            .collect();
        let frame = Frame {
            offset: self.offset,
            samples,
        };
        self.offset += self.windower.hop_len;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.samples.len().saturating_sub(self.offset);
        let n = self.windower.frame_count(remaining);
        (n, Some(n))
    }
}

/// Raised-cosine taper `0.5 * (1 - cos(2πi / (N - 1)))`.
fn hann_window(len: usize) -> Vec<f32> {
    let denom = (len - 1) as f32;
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos()))
        .collect()
}
