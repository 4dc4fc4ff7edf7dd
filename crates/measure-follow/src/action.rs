//! Actions and action distributions.
//!
//! A window of `width` measures has `width + 2` action slots: one per visible
//! measure, then "stay" at slot `width`, then "slide" at slot `width + 1`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance on the sum of a distribution.
pub const SUM_TOLERANCE: f64 = 1e-6;

/// A window-relative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Local measure index inside the window.
    Measure(usize),
    Stay,
    Slide,
}

impl Action {
    /// Slot index in a distribution for a window of `width`.
    pub fn slot(self, width: usize) -> usize {
        match self {
            Action::Measure(local) => local,
            Action::Stay => width,
            Action::Slide => width + 1,
        }
    }

    pub fn from_slot(slot: usize, width: usize) -> Option<Action> {
        match slot {
            s if s < width => Some(Action::Measure(s)),
            s if s == width => Some(Action::Stay),
            s if s == width + 1 => Some(Action::Slide),
            _ => None,
        }
    }

    /// Integer label: the slot, or `-1` when there is no ground truth.
    pub fn label(action: Option<Action>, width: usize) -> i64 {
        action.map_or(-1, |a| a.slot(width) as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("expected {expected} entries, got {got}")]
    WrongLength { expected: usize, got: usize },

    #[error("entry {index} is {value}, entries must be finite and non-negative")]
    InvalidEntry { index: usize, value: f64 },

    #[error("entries sum to {0}, expected 1")]
    BadSum(f64),
}

/// A validated categorical distribution over `width + 2` action slots.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActionDistribution(Vec<f64>);

impl ActionDistribution {
    pub fn new(probabilities: Vec<f64>, width: usize) -> Result<Self, DistributionError> {
        let expected = width + 2;
        if probabilities.len() != expected {
            return Err(DistributionError::WrongLength {
                expected,
                got: probabilities.len(),
            });
        }

        if let Some((index, &value)) = probabilities
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0)
        {
            return Err(DistributionError::InvalidEntry { index, value });
        }

        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(DistributionError::BadSum(sum));
        }

        Ok(Self(probabilities))
    }

    /// All mass on one slot.
    pub fn one_hot(slot: usize, width: usize) -> Result<Self, DistributionError> {
        let mut probabilities = vec![0.0; width + 2];
        if let Some(p) = probabilities.get_mut(slot) {
            *p = 1.0;
        }
        Self::new(probabilities, width)
    }

    /// All mass on "stay".
    pub fn stay(width: usize) -> Self {
        let mut probabilities = vec![0.0; width + 2];
        probabilities[width] = 1.0;
        Self(probabilities)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First slot holding the maximum probability.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (slot, &p) in self.0.iter().enumerate() {
            if p > self.0[best] {
                best = slot;
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.0.iter().copied().enumerate()
    }
}
