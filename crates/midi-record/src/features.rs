//! Alignment features: key sequences and pitch-class histograms.

use crate::roll::{Frame, KeyMask};
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const PITCH_CLASSES: usize = 12;

/// One key mask per kept frame, with the frame each entry came from.
///
/// With `onset_only` only frames that start at least one note are kept, so
/// sequence positions and frame positions differ; `frame_indices` maps back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySequence {
    pub keys: Vec<KeyMask>,
    pub frame_indices: Vec<usize>,
}

impl KeySequence {
    pub fn from_frames(frames: &[Frame], onset_only: bool) -> Self {
        let mut sequence = Self::default();
        for (index, frame) in frames.iter().enumerate() {
            if onset_only {
                if frame.has_onset() {
                    sequence.keys.push(frame.onsets);
                    sequence.frame_indices.push(index);
                }
            } else {
                sequence.keys.push(frame.active);
                sequence.frame_indices.push(index);
            }
        }
        sequence
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Frames covered by sequence positions `start..end`.
    ///
    /// Runs from the frame of `start` up to and including the frame of
    /// `end - 1`. Out-of-range positions are clamped; an empty or inverted
    /// range collapses onto the frame of `start`.
    pub fn frame_range(&self, start: usize, end: usize) -> Range<usize> {
        let Some(last) = self.frame_indices.len().checked_sub(1) else {
            return 0..0;
        };
        let first = self.frame_indices[start.min(last)];
        if end <= start {
            return first..first;
        }
        let tail = self.frame_indices[(end - 1).min(last)] + 1;
        first..tail.max(first)
    }
}

/// Normalized pitch-class distribution (C = bin 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PitchHistogram(pub [f64; PITCH_CLASSES]);

impl Default for PitchHistogram {
    fn default() -> Self {
        Self([0.0; PITCH_CLASSES])
    }
}

impl PitchHistogram {
    /// Count pitch classes over frames and normalize to sum 1.
    ///
    /// Uses onset masks when `onset_only`, sounding keys otherwise. Silent
    /// input yields the all-zero histogram.
    pub fn from_frames(frames: &[Frame], onset_only: bool) -> Self {
        let mut bins = [0.0; PITCH_CLASSES];
        for frame in frames {
            let mask = if onset_only { frame.onsets } else { frame.active };
            for pitch in Frame::pitches(mask) {
                bins[pitch as usize % PITCH_CLASSES] += 1.0;
            }
        }

        let total: f64 = bins.iter().sum();
        if total > 0.0 {
            for bin in &mut bins {
                *bin /= total;
            }
        }
        Self(bins)
    }

    /// Histogram of `frames[head..tail]` after clamping.
    ///
    /// `head` is clamped to `[0, n-1]` and `tail` to `[1, n]`, then the two
    /// are swapped if they ended up inverted.
    pub fn over_range(frames: &[Frame], head: usize, tail: usize, onset_only: bool) -> Self {
        let n = frames.len();
        if n == 0 {
            return Self::default();
        }
        let mut head = head.min(n - 1);
        let mut tail = tail.clamp(1, n);
        if head > tail {
            std::mem::swap(&mut head, &mut tail);
        }
        Self::from_frames(&frames[head..tail], onset_only)
    }

    pub fn bins(&self) -> &[f64; PITCH_CLASSES] {
        &self.0
    }
}

/// Euclidean distance between two histograms.
pub fn euclidean(a: &PitchHistogram, b: &PitchHistogram) -> f64 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
