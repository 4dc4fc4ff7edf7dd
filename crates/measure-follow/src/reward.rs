//! Expected triangular reward.

use follow_conf::{RewardConfig, RewardKind};

use crate::action::{Action, ActionDistribution};

/// Triangle-shaped reward around the true measure.
///
/// A predicted measure `a` scores `(threshold - min(|t - a|, threshold)) /
/// threshold` against the true measure `t`, scaled by `forward_weight` when
/// `t <= a` and by `backward_weight` otherwise. Stay and slide never score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleReward {
    pub window_size: usize,
    pub threshold: usize,
    pub forward_weight: f64,
    pub backward_weight: f64,
}

impl TriangleReward {
    pub fn new(window_size: usize) -> Self {
        Self::weighted(window_size, 1.0, 1.0)
    }

    pub fn weighted(window_size: usize, forward_weight: f64, backward_weight: f64) -> Self {
        Self {
            window_size,
            threshold: window_size / 2,
            forward_weight,
            backward_weight,
        }
    }

    pub fn from_config(window_size: usize, config: &RewardConfig) -> Self {
        match config.kind {
            RewardKind::Triangle => Self::new(window_size),
            RewardKind::WeightedTriangle => {
                Self::weighted(window_size, config.forward_weight, config.backward_weight)
            }
        }
    }

    pub fn range(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }

    pub fn component(&self, true_action: Action, predicted: Action) -> f64 {
        let (Action::Measure(t), Action::Measure(a)) = (true_action, predicted) else {
            return 0.0;
        };

        let weight = if t <= a {
            self.forward_weight
        } else {
            self.backward_weight
        };

        if self.threshold == 0 {
            return if t == a { weight } else { 0.0 };
        }

        let error = t.abs_diff(a).min(self.threshold);
        weight * (self.threshold - error) as f64 / self.threshold as f64
    }

    /// Expected reward of `distribution`; zero without ground truth.
    pub fn reward(&self, true_action: Option<Action>, distribution: &ActionDistribution) -> f64 {
        self.reward_within(true_action, distribution, self.window_size)
    }

    /// Expected reward when only the first `active_width` measure slots name
    /// real measures. Mass on the remaining measure slots scores nothing.
    pub fn reward_within(
        &self,
        true_action: Option<Action>,
        distribution: &ActionDistribution,
        active_width: usize,
    ) -> f64 {
        let Some(true_action) = true_action else {
            return 0.0;
        };
        distribution
            .iter()
            .filter(|(_, p)| *p > 0.0)
            .filter_map(|(slot, p)| match Action::from_slot(slot, self.window_size)? {
                Action::Measure(m) if m >= active_width => None,
                a => Some(p * self.component(true_action, a)),
            })
            .sum()
    }
}
