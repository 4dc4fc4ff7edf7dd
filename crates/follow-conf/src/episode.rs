//! Episode configuration - values that shape every `reset`/`step`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the visible window behaves when it slides near the end of the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Width never changes; the final slide is clamped so the window ends
    /// on the last measure.
    #[default]
    Static,
    /// Width shrinks to whatever remains of the score after a slide.
    Dynamic,
}

impl fmt::Display for WindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowMode::Static => write!(f, "static"),
            WindowMode::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// What makes the window slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlidePolicy {
    /// Only an explicit slide signal from the performance oracle.
    #[default]
    Oracle,
    /// Oracle signals, plus a slide whenever the last `width` predictions
    /// all sit in the upper half of the window.
    History,
}

impl fmt::Display for SlidePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlidePolicy::Oracle => write!(f, "oracle"),
            SlidePolicy::History => write!(f, "history"),
        }
    }
}

/// Reward shaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Symmetric triangle around the true measure.
    #[default]
    Triangle,
    /// Triangle scaled by `forward_weight` / `backward_weight`.
    WeightedTriangle,
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardKind::Triangle => write!(f, "triangle"),
            RewardKind::WeightedTriangle => write!(f, "weighted_triangle"),
        }
    }
}

/// Window, memory, and performance-buffer geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Measures visible at once.
    /// Default: 16
    #[serde(default = "EnvConfig::default_window_size")]
    pub window_size: usize,

    /// Rows of policy memory.
    /// Default: 16
    #[serde(default = "EnvConfig::default_memory_size")]
    pub memory_size: usize,

    /// Piano-roll frames per second.
    /// Default: 20
    #[serde(default = "EnvConfig::default_fps")]
    pub fps: usize,

    /// Keep only note onsets when building key sequences and histograms.
    /// Default: true
    #[serde(default = "EnvConfig::default_onset_only")]
    pub onset_only: bool,

    /// Seconds of performance visible per observation.
    /// Default: 3
    #[serde(default = "EnvConfig::default_buffer_duration")]
    pub buffer_duration: usize,

    /// Frames the performance cursor advances per step.
    /// Default: 10
    #[serde(default = "EnvConfig::default_buffer_step_size")]
    pub buffer_step_size: usize,

    #[serde(default)]
    pub window_mode: WindowMode,

    #[serde(default)]
    pub slide_policy: SlidePolicy,

    /// Distance at which similarity drops to one half.
    /// Default: 1.0
    #[serde(default = "EnvConfig::default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Seed for the controller's RNG until `reset` supplies one.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl EnvConfig {
    fn default_window_size() -> usize {
        16
    }

    fn default_memory_size() -> usize {
        16
    }

    fn default_fps() -> usize {
        20
    }

    fn default_onset_only() -> bool {
        true
    }

    fn default_buffer_duration() -> usize {
        3
    }

    fn default_buffer_step_size() -> usize {
        10
    }

    fn default_similarity_threshold() -> f64 {
        1.0
    }

    /// Frames in one observed performance segment.
    pub fn segment_frames(&self) -> usize {
        self.fps * self.buffer_duration
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            window_size: Self::default_window_size(),
            memory_size: Self::default_memory_size(),
            fps: Self::default_fps(),
            onset_only: Self::default_onset_only(),
            buffer_duration: Self::default_buffer_duration(),
            buffer_step_size: Self::default_buffer_step_size(),
            window_mode: WindowMode::default(),
            slide_policy: SlidePolicy::default(),
            similarity_threshold: Self::default_similarity_threshold(),
            seed: None,
        }
    }
}

/// Reward shaping parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default)]
    pub kind: RewardKind,

    /// Multiplier when the prediction is at or ahead of the true measure.
    /// Only used by `weighted_triangle`. Must lie in [0, 1].
    #[serde(default = "RewardConfig::default_weight")]
    pub forward_weight: f64,

    /// Multiplier when the prediction lags the true measure.
    /// Only used by `weighted_triangle`. Must lie in [0, 1].
    #[serde(default = "RewardConfig::default_weight")]
    pub backward_weight: f64,
}

impl RewardConfig {
    fn default_weight() -> f64 {
        1.0
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            kind: RewardKind::default(),
            forward_weight: Self::default_weight(),
            backward_weight: Self::default_weight(),
        }
    }
}

/// Grid renderer layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Measures per rendered row.
    /// Default: 8
    #[serde(default = "RenderConfig::default_columns")]
    pub columns: usize,

    /// Pixel width of a measure cell.
    /// Default: 48
    #[serde(default = "RenderConfig::default_cell_width")]
    pub cell_width: usize,

    /// Pixel height of a measure cell.
    /// Default: 32
    #[serde(default = "RenderConfig::default_cell_height")]
    pub cell_height: usize,

    /// Emit `H x W x C` frames instead of `C x H x W`.
    #[serde(default)]
    pub channel_last: bool,
}

impl RenderConfig {
    fn default_columns() -> usize {
        8
    }

    fn default_cell_width() -> usize {
        48
    }

    fn default_cell_height() -> usize {
        32
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            columns: Self::default_columns(),
            cell_width: Self::default_cell_width(),
            cell_height: Self::default_cell_height(),
            channel_last: false,
        }
    }
}
