//! Measure following as a sequential decision process.
//!
//! An agent watches a window of score measures and a stream of performance
//! frames, and at every step submits a probability distribution over which
//! visible measure is being played (plus "stay" and "slide"). The
//! [`EpisodeController`] turns annotated ground truth into window-relative
//! labels, moves the window, tracks prediction history and detects
//! termination; [`TriangleReward`] scores the distribution by expectation.
//!
//! Alignment is injected through the [`Aligner`] trait and performance data
//! through [`PerformanceSource`]; [`MidiPerformance`] is the MIDI + CSV
//! implementation.

pub mod action;
pub mod cursor;
pub mod env;
pub mod episode;
pub mod error;
pub mod matrix;
pub mod memory;
pub mod record;
pub mod render;
pub mod reward;
pub mod score;
pub mod similarity;
pub mod source;
pub mod window;

pub use action::{Action, ActionDistribution, DistributionError};
pub use cursor::PerformanceCursor;
pub use env::{MeasureFollowingEnv, ObservationShapes, Transition};
pub use episode::{EpisodeController, EpisodeState, ResetOptions, StepInfo, StepOutcome, Termination};
pub use error::{FollowError, Result};
pub use matrix::{Matrix, Observation};
pub use memory::PolicyMemory;
pub use record::MidiPerformance;
pub use render::{GridRenderer, NullRenderer, RenderMode, RenderView, Renderer, RgbFrame};
pub use reward::TriangleReward;
pub use score::{Measure, Score};
pub use similarity::{SimilarityBuilder, SENTINEL};
pub use source::{
    truth_timeline, Aligner, Alignment, GroundTruth, PerformanceSegment, PerformanceSource,
};
pub use window::ScoreWindow;
