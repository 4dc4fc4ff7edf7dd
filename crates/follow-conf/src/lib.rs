//! Configuration loading for the measure-following environment.
//!
//! Every knob of an episode lives in [`FollowConfig`]: where the score and
//! the performance record are, how wide the visible window is, how the
//! reward is shaped, and how the renderer lays out the score.
//!
//! # Sections
//!
//! - **Paths** (`PathsConfig`): the score source and the performance record.
//! - **Env** (`EnvConfig`): window/memory geometry, frame rate, segment
//!   length, cursor step, window mode, slide policy, similarity threshold
//!   and the default RNG seed.
//! - **Reward** (`RewardConfig`): triangle or weighted triangle.
//! - **Render** (`RenderConfig`): grid layout of the score.
//! - **Telemetry** (`TelemetryConfig`): log level.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/measure-follow/config.toml` (system)
//! 2. `~/.config/measure-follow/config.toml` (user)
//! 3. `./measure-follow.toml` (local override, or a path given on the CLI)
//! 4. Environment variables (`MEASURE_FOLLOW_*`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! score = "~/scores/minuet/score.json"
//! record = "~/scores/minuet/take1.midi"
//!
//! [env]
//! window_size = 16
//! memory_size = 16
//! fps = 20
//! onset_only = true
//! buffer_duration = 3
//! buffer_step_size = 10
//! window_mode = "static"
//! slide_policy = "oracle"
//!
//! [reward]
//! kind = "weighted_triangle"
//! forward_weight = 1.0
//! backward_weight = 0.5
//!
//! [telemetry]
//! log_level = "debug"
//! ```

pub mod episode;
pub mod loader;
pub mod paths;

pub use episode::{EnvConfig, RenderConfig, RewardConfig, RewardKind, SlidePolicy, WindowMode};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use paths::{PathsConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete measure-following configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FollowConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub env: EnvConfig,

    #[serde(default)]
    pub reward: RewardConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl FollowConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/measure-follow/config.toml`
    /// 3. `~/.config/measure-follow/config.toml`
    /// 4. `./measure-follow.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./measure-follow.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = FollowConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let file_config = loader::load_from_file(&path)?;
            config = loader::merge_configs(config, file_config);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    /// Reject values no episode can run with.
    ///
    /// Score-dependent checks (window wider than the score) happen when the
    /// environment is built, since the score is not known here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let env = &self.env;
        let positive = [
            ("env.window_size", env.window_size),
            ("env.memory_size", env.memory_size),
            ("env.fps", env.fps),
            ("env.buffer_duration", env.buffer_duration),
            ("env.buffer_step_size", env.buffer_step_size),
            ("render.columns", self.render.columns),
            ("render.cell_width", self.render.cell_width),
            ("render.cell_height", self.render.cell_height),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }

        if !(env.similarity_threshold.is_finite() && env.similarity_threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "env.similarity_threshold must be positive, got {}",
                env.similarity_threshold
            )));
        }

        for (name, weight) in [
            ("reward.forward_weight", self.reward.forward_weight),
            ("reward.backward_weight", self.reward.backward_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {weight}"
                )));
            }
        }

        Ok(())
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# Measure-following configuration\n\n");

        output.push_str("[paths]\n");
        if let Some(score) = &self.paths.score {
            output.push_str(&format!("score = {}\n", toml_string(&score.to_string_lossy())));
        }
        if let Some(record) = &self.paths.record {
            output.push_str(&format!("record = {}\n", toml_string(&record.to_string_lossy())));
        }

        let env = &self.env;
        output.push_str("\n[env]\n");
        output.push_str(&format!("window_size = {}\n", env.window_size));
        output.push_str(&format!("memory_size = {}\n", env.memory_size));
        output.push_str(&format!("fps = {}\n", env.fps));
        output.push_str(&format!("onset_only = {}\n", env.onset_only));
        output.push_str(&format!("buffer_duration = {}\n", env.buffer_duration));
        output.push_str(&format!("buffer_step_size = {}\n", env.buffer_step_size));
        output.push_str(&format!("window_mode = \"{}\"\n", env.window_mode));
        output.push_str(&format!("slide_policy = \"{}\"\n", env.slide_policy));
        output.push_str(&format!(
            "similarity_threshold = {:?}\n",
            env.similarity_threshold
        ));
        if let Some(seed) = env.seed {
            output.push_str(&format!("seed = {}\n", seed));
        }

        output.push_str("\n[reward]\n");
        output.push_str(&format!("kind = \"{}\"\n", self.reward.kind));
        output.push_str(&format!(
            "forward_weight = {:?}\n",
            self.reward.forward_weight
        ));
        output.push_str(&format!(
            "backward_weight = {:?}\n",
            self.reward.backward_weight
        ));

        output.push_str("\n[render]\n");
        output.push_str(&format!("columns = {}\n", self.render.columns));
        output.push_str(&format!("cell_width = {}\n", self.render.cell_width));
        output.push_str(&format!("cell_height = {}\n", self.render.cell_height));
        output.push_str(&format!("channel_last = {}\n", self.render.channel_last));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = {}\n",
            toml_string(&self.telemetry.log_level)
        ));

        output
    }
}

/// Quote and escape a TOML basic string.
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}
