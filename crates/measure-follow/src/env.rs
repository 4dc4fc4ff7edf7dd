use std::sync::Arc;

use follow_conf::FollowConfig;
use serde::Serialize;
use tracing::info;

use crate::action::{Action, ActionDistribution};
use crate::episode::{EpisodeController, ResetOptions, StepInfo};
use crate::error::{FollowError, Result};
use crate::matrix::Observation;
use crate::record::MidiPerformance;
use crate::render::{RenderMode, RenderView, Renderer, RgbFrame};
use crate::reward::TriangleReward;
use crate::score::Score;
use crate::similarity::SIMILARITY_COLUMNS;
use crate::source::{Aligner, PerformanceSource};

/// One environment transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub true_action: Option<Action>,
    pub info: StepInfo,
}

/// Shapes of the two observation channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObservationShapes {
    pub similarity: (usize, usize),
    pub memory: (usize, usize),
}

/// Measure-following environment: an episode controller paired with a
/// reward and a renderer.
pub struct MeasureFollowingEnv {
    controller: EpisodeController,
    reward: TriangleReward,
    renderer: Box<dyn Renderer>,
    memory_size: usize,
}

impl MeasureFollowingEnv {
    pub fn new(
        controller: EpisodeController,
        reward: TriangleReward,
        renderer: Box<dyn Renderer>,
        memory_size: usize,
    ) -> Self {
        Self {
            controller,
            reward,
            renderer,
            memory_size,
        }
    }

    /// Load the score and record named in `config.paths` and wire an
    /// environment around them.
    pub fn from_config(
        config: &FollowConfig,
        aligner: Arc<dyn Aligner>,
        renderer: Box<dyn Renderer>,
    ) -> Result<Self> {
        config.validate()?;
        let env = &config.env;

        let score_path = config
            .paths
            .score
            .as_deref()
            .ok_or_else(|| FollowError::InvalidConfig("paths.score is not set".into()))?;
        let record_path = config
            .paths
            .record
            .as_deref()
            .ok_or_else(|| FollowError::InvalidConfig("paths.record is not set".into()))?;

        let score = Score::from_path(score_path, env.fps, env.onset_only)?;
        let record = MidiPerformance::from_path(record_path, env)?;
        record.check_against(score.len());

        let source: Arc<dyn PerformanceSource> = record;
        let controller = EpisodeController::new(score, source, aligner, env)?;
        let reward = TriangleReward::from_config(env.window_size, &config.reward);

        info!(
            window_size = env.window_size,
            memory_size = env.memory_size,
            reward = %config.reward.kind,
            "environment ready"
        );
        Ok(Self::new(controller, reward, renderer, env.memory_size))
    }

    pub fn reset(&mut self, seed: Option<u64>, options: &ResetOptions) -> Result<(Observation, StepInfo)> {
        let result = self.controller.reset(seed, options)?;
        self.renderer.reset(0..self.controller.score().len());
        Ok(result)
    }

    pub fn step(&mut self, distribution: &ActionDistribution) -> Result<Transition> {
        let outcome = self.controller.step(distribution)?;
        let reward = self.reward.reward_within(
            outcome.true_action,
            distribution,
            outcome.active_width,
        );
        Ok(Transition {
            observation: outcome.observation,
            reward,
            done: outcome.done,
            true_action: outcome.true_action,
            info: outcome.info,
        })
    }

    /// Build and validate a distribution for this environment's width.
    pub fn distribution(&self, probabilities: Vec<f64>) -> Result<ActionDistribution> {
        Ok(ActionDistribution::new(
            probabilities,
            self.controller.window().configured_width(),
        )?)
    }

    pub fn render(&mut self, mode: RenderMode) -> Result<Option<RgbFrame>> {
        if !self.renderer.modes().contains(&mode) {
            return Err(FollowError::UnsupportedRenderMode(mode.to_string()));
        }
        let view = RenderView {
            window: self.controller.window().range(),
            predicted: self.controller.last_prediction(),
        };
        self.renderer.render(&view, mode)
    }

    pub fn close(&mut self) {
        self.renderer.close();
    }

    pub fn action_len(&self) -> usize {
        self.controller.num_actions()
    }

    pub fn observation_shapes(&self) -> ObservationShapes {
        let width = self.controller.window().configured_width();
        ObservationShapes {
            similarity: (width, SIMILARITY_COLUMNS),
            memory: (self.memory_size, width + 2),
        }
    }

    pub fn reward_range(&self) -> (f64, f64) {
        self.reward.range()
    }

    pub fn controller(&self) -> &EpisodeController {
        &self.controller
    }
}
