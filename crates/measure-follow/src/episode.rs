//! Episode controller: the `reset`/`step` state machine.
//!
//! Each step reads the ground truth revealed by the performance since the
//! previous step and turns it into a window-relative label. Then it moves
//! the window, advances the performance cursor, records the submitted
//! distribution in policy memory and rebuilds the similarity observation.
//!
//! Ordering within a step:
//!
//! 1. Ground truth is derived from the frames revealed so far, before the
//!    cursor moves.
//! 2. `Stay` keeps the window, `Slide` slides it, a measure inside the
//!    window becomes its local index. A measure outside the window is a
//!    tracking failure and ends the episode.
//! 3. With [`SlidePolicy::History`] the window also slides when the last
//!    `width` predictions all fall in its upper half.
//! 4. The cursor advances, memory takes the distribution, the similarity
//!    matrix is rebuilt. An exhausted cursor completes the episode.
//! 5. History records the argmax slot and its absolute position under the
//!    window as it was when the prediction was made. Slots naming measures
//!    past a shrunken dynamic window fold onto its last measure.
//!
//! Any transition to done fills the similarity matrix with the sentinel and
//! resets memory to the stay delta.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use follow_conf::{EnvConfig, SlidePolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::action::{Action, ActionDistribution, DistributionError};
use crate::cursor::PerformanceCursor;
use crate::error::{FollowError, Result};
use crate::matrix::{Matrix, Observation};
use crate::memory::PolicyMemory;
use crate::score::Score;
use crate::similarity::SimilarityBuilder;
use crate::source::{Aligner, GroundTruth, PerformanceSource};
use crate::window::ScoreWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeState {
    Running,
    Done,
}

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Ground truth left the window without a stay or slide signal.
    TrackingFailure,
    /// The performance ran out.
    Completed,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::TrackingFailure => write!(f, "tracking_failure"),
            Termination::Completed => write!(f, "completed"),
        }
    }
}

/// Options for [`EpisodeController::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetOptions {
    /// Absolute measure to start from. Drawn uniformly from the initial
    /// window when absent.
    #[serde(default)]
    pub start_measure: Option<usize>,
    /// Initial window head. Defaults to the start measure, or 0 when the
    /// start is drawn.
    #[serde(default)]
    pub window_head: Option<usize>,
}

/// Auxiliary information returned with every observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepInfo {
    pub window: Range<usize>,
    pub local_history: Vec<usize>,
    pub global_history: Vec<usize>,
    pub cursor_position: usize,
    pub max_position: usize,
    pub step: usize,
    pub termination: Option<Termination>,
}

/// Result of one [`EpisodeController::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    /// `None` once the episode is done or tracking failed.
    pub true_action: Option<Action>,
    /// Width of the window the distribution was submitted against. Below
    /// the configured width once a dynamic window has shrunk.
    pub active_width: usize,
    pub done: bool,
    pub info: StepInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct History {
    local: Vec<usize>,
    global: Vec<usize>,
    /// Length of `local` at the most recent slide.
    since_slide: usize,
}

impl History {
    fn clear(&mut self) {
        self.local.clear();
        self.global.clear();
        self.since_slide = 0;
    }
}

/// Drives one episode over a shared score and performance.
pub struct EpisodeController {
    score: Arc<Score>,
    source: Arc<dyn PerformanceSource>,
    similarity: SimilarityBuilder,
    slide_policy: SlidePolicy,
    window: ScoreWindow,
    cursor: PerformanceCursor,
    memory: PolicyMemory,
    matrix: Matrix,
    history: History,
    state: EpisodeState,
    termination: Option<Termination>,
    rng: StdRng,
    /// First frame whose ground truth has not been consulted yet.
    revealed: usize,
    steps: usize,
}

impl EpisodeController {
    /// Build a controller. It stays done until the first [`reset`].
    ///
    /// [`reset`]: EpisodeController::reset
    pub fn new(
        score: Arc<Score>,
        source: Arc<dyn PerformanceSource>,
        aligner: Arc<dyn Aligner>,
        env: &EnvConfig,
    ) -> Result<Self> {
        if env.buffer_step_size == 0 {
            return Err(FollowError::InvalidConfig(
                "buffer_step_size must be positive".into(),
            ));
        }
        if !(env.similarity_threshold.is_finite() && env.similarity_threshold > 0.0) {
            return Err(FollowError::InvalidConfig(format!(
                "similarity_threshold must be positive, got {}",
                env.similarity_threshold
            )));
        }

        let window = ScoreWindow::new(score.len(), env.window_size, env.window_mode)?;
        let cursor = PerformanceCursor::new(
            source.num_frames(),
            source.segment_frames(),
            env.buffer_step_size,
        );

        Ok(Self {
            score,
            source,
            similarity: SimilarityBuilder::new(aligner, env.similarity_threshold),
            slide_policy: env.slide_policy,
            window,
            cursor,
            memory: PolicyMemory::new(env.memory_size, env.window_size),
            matrix: SimilarityBuilder::sentinel(env.window_size),
            history: History::default(),
            state: EpisodeState::Done,
            termination: None,
            rng: StdRng::seed_from_u64(env.seed.unwrap_or(0)),
            revealed: 0,
            steps: 0,
        })
    }

    /// Start a new episode.
    ///
    /// `seed` reseeds the controller's generator; without one it keeps
    /// drawing from the current generator.
    pub fn reset(&mut self, seed: Option<u64>, options: &ResetOptions) -> Result<(Observation, StepInfo)> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }

        let total = self.score.len();
        let width = self.window.configured_width();
        let last_head = total - width;

        let (start, head) = match options.start_measure {
            None => {
                let head = options.window_head.unwrap_or(0).min(last_head);
                (self.rng.gen_range(head..head + width), head)
            }
            Some(start) => {
                let head = options.window_head.unwrap_or(start).min(last_head);
                (start, head)
            }
        };

        let window = head..head + width;
        if start >= total || !window.contains(&start) {
            return Err(FollowError::StartMeasureOutOfRange {
                start,
                window,
                total,
            });
        }

        self.window.reset(head);
        self.cursor
            .reset(self.source.position_of(start).unwrap_or(0));
        self.revealed = self.cursor.position();
        self.history.clear();
        self.memory.reset();
        self.state = EpisodeState::Running;
        self.termination = None;
        self.steps = 0;
        self.matrix = self.build_similarity();

        info!(
            start_measure = start,
            window_head = head,
            cursor = self.cursor.position(),
            max_position = self.cursor.max_position(),
            "episode reset"
        );

        Ok((self.observation(), self.info()))
    }

    pub fn step(&mut self, distribution: &ActionDistribution) -> Result<StepOutcome> {
        let width = self.window.configured_width();
        if distribution.len() != self.num_actions() {
            return Err(DistributionError::WrongLength {
                expected: self.num_actions(),
                got: distribution.len(),
            }
            .into());
        }

        if self.state == EpisodeState::Done {
            return Ok(self.outcome(None, self.window.width()));
        }

        let head = self.window.head();
        let active_width = self.window.width();
        let predicted = clamp_slot(distribution.argmax(), active_width, width);

        let segment_end = self.cursor.segment().end;
        let frames = self.revealed..segment_end.max(self.revealed);
        let truth = self.source.ground_truth(frames);
        self.revealed = self.revealed.max(segment_end);

        let mut slid = false;
        let true_action = match truth {
            GroundTruth::Stay => {
                self.window.stay();
                Some(Action::Stay)
            }
            GroundTruth::Slide => {
                self.window.slide();
                slid = true;
                Some(Action::Slide)
            }
            GroundTruth::Measure(measure) => self.window.local(measure).map(Action::Measure),
        };

        let Some(true_action) = true_action else {
            debug!(?truth, head, "ground truth left the window");
            self.terminate(Termination::TrackingFailure);
            return Ok(self.outcome(None, active_width));
        };

        if !slid && self.slide_policy == SlidePolicy::History && self.history_wants_slide(predicted) {
            self.window.slide();
            slid = true;
        }

        self.cursor.advance();
        self.memory.push(distribution);
        self.matrix = self.build_similarity();

        self.history.local.push(predicted);
        self.history.global.push(predicted + head);
        if slid {
            self.history.since_slide = self.history.local.len();
        }
        self.steps += 1;

        debug!(
            step = self.steps,
            true_action = Action::label(Some(true_action), width),
            predicted,
            head = self.window.head(),
            cursor = self.cursor.position(),
            "step"
        );

        if self.cursor.done() {
            self.terminate(Termination::Completed);
        }

        Ok(self.outcome(Some(true_action), active_width))
    }

    /// Slide when this prediction and the ones since the last slide fill a
    /// window's worth of upper-half positions.
    fn history_wants_slide(&self, predicted: usize) -> bool {
        let width = self.window.width();
        let recent = &self.history.local[self.history.since_slide..];
        if recent.len() + 1 < width {
            return false;
        }
        let upper = width / 2..width;
        recent
            .iter()
            .rev()
            .take(width - 1)
            .chain(std::iter::once(&predicted))
            .all(|p| upper.contains(p))
    }

    fn terminate(&mut self, reason: Termination) {
        self.state = EpisodeState::Done;
        self.termination = Some(reason);
        self.matrix = SimilarityBuilder::sentinel(self.window.configured_width());
        self.memory.reset();
        info!(
            %reason,
            steps = self.steps,
            window_head = self.window.head(),
            "episode done"
        );
    }

    fn build_similarity(&self) -> Matrix {
        let measures = &self.score.measures()[self.window.range()];
        let segment = self.source.segment(self.cursor.position());
        self.similarity
            .build(measures, &segment, self.window.configured_width())
    }

    fn outcome(&self, true_action: Option<Action>, active_width: usize) -> StepOutcome {
        StepOutcome {
            observation: self.observation(),
            true_action,
            active_width,
            done: self.is_done(),
            info: self.info(),
        }
    }

    pub fn observation(&self) -> Observation {
        Observation {
            similarity: self.matrix.clone(),
            memory: self.memory.matrix().clone(),
        }
    }

    pub fn info(&self) -> StepInfo {
        StepInfo {
            window: self.window.range(),
            local_history: self.history.local.clone(),
            global_history: self.history.global.clone(),
            cursor_position: self.cursor.position(),
            max_position: self.cursor.max_position(),
            step: self.steps,
            termination: self.termination,
        }
    }

    /// `width + 2` for the configured width.
    pub fn num_actions(&self) -> usize {
        self.window.configured_width() + 2
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == EpisodeState::Done
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn window(&self) -> &ScoreWindow {
        &self.window
    }

    pub fn cursor(&self) -> &PerformanceCursor {
        &self.cursor
    }

    pub fn score(&self) -> &Arc<Score> {
        &self.score
    }

    /// Absolute measure of the most recent prediction, if it named one.
    pub fn last_prediction(&self) -> Option<usize> {
        let local = *self.history.local.last()?;
        let global = *self.history.global.last()?;
        (local < self.window.configured_width()).then_some(global)
    }
}

/// Fold measure slots past a shrunken window onto its last measure. Stay,
/// slide and anything beyond them keep or clamp to the slide slot.
fn clamp_slot(slot: usize, active_width: usize, width: usize) -> usize {
    if (active_width..width).contains(&slot) {
        active_width - 1
    } else {
        slot.min(width + 1)
    }
}
