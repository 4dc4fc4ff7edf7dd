//! Config file discovery, loading, and environment variable overlay.

use crate::{
    ConfigError, EnvConfig, FollowConfig, PathsConfig, RenderConfig, RewardConfig,
    TelemetryConfig,
};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/measure-follow/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("measure-follow/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("measure-follow.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<FollowConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

/// Parse config from TOML string, expanding `~` and `$VAR` in paths.
fn parse_toml(contents: &str, path: &Path) -> Result<FollowConfig, ConfigError> {
    let mut config: FollowConfig =
        toml::from_str(contents).map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    config.paths.score = config
        .paths
        .score
        .map(|p| expand_path(&p.to_string_lossy()));
    config.paths.record = config
        .paths
        .record
        .map(|p| expand_path(&p.to_string_lossy()));

    Ok(config)
}

fn pick<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default {
        overlay
    } else {
        base
    }
}

/// Merge two configs, with `overlay` taking precedence.
///
/// A field in `overlay` wins only when it differs from the compiled
/// default, so a later file that leaves a key out does not reset it.
pub fn merge_configs(base: FollowConfig, overlay: FollowConfig) -> FollowConfig {
    let env_default = EnvConfig::default();
    let reward_default = RewardConfig::default();
    let render_default = RenderConfig::default();

    FollowConfig {
        paths: PathsConfig {
            score: overlay.paths.score.or(base.paths.score),
            record: overlay.paths.record.or(base.paths.record),
        },
        env: EnvConfig {
            window_size: pick(base.env.window_size, overlay.env.window_size, env_default.window_size),
            memory_size: pick(base.env.memory_size, overlay.env.memory_size, env_default.memory_size),
            fps: pick(base.env.fps, overlay.env.fps, env_default.fps),
            onset_only: pick(base.env.onset_only, overlay.env.onset_only, env_default.onset_only),
            buffer_duration: pick(
                base.env.buffer_duration,
                overlay.env.buffer_duration,
                env_default.buffer_duration,
            ),
            buffer_step_size: pick(
                base.env.buffer_step_size,
                overlay.env.buffer_step_size,
                env_default.buffer_step_size,
            ),
            window_mode: pick(base.env.window_mode, overlay.env.window_mode, env_default.window_mode),
            slide_policy: pick(
                base.env.slide_policy,
                overlay.env.slide_policy,
                env_default.slide_policy,
            ),
            similarity_threshold: pick(
                base.env.similarity_threshold,
                overlay.env.similarity_threshold,
                env_default.similarity_threshold,
            ),
            seed: overlay.env.seed.or(base.env.seed),
        },
        reward: RewardConfig {
            kind: pick(base.reward.kind, overlay.reward.kind, reward_default.kind),
            forward_weight: pick(
                base.reward.forward_weight,
                overlay.reward.forward_weight,
                reward_default.forward_weight,
            ),
            backward_weight: pick(
                base.reward.backward_weight,
                overlay.reward.backward_weight,
                reward_default.backward_weight,
            ),
        },
        render: RenderConfig {
            columns: pick(base.render.columns, overlay.render.columns, render_default.columns),
            cell_width: pick(
                base.render.cell_width,
                overlay.render.cell_width,
                render_default.cell_width,
            ),
            cell_height: pick(
                base.render.cell_height,
                overlay.render.cell_height,
                render_default.cell_height,
            ),
            channel_last: pick(
                base.render.channel_last,
                overlay.render.channel_last,
                render_default.channel_last,
            ),
        },
        telemetry: TelemetryConfig {
            log_level: pick(
                base.telemetry.log_level,
                overlay.telemetry.log_level,
                TelemetryConfig::default().log_level,
            ),
        },
    }
}

/// Apply environment variable overrides to config.
///
/// Unparseable numeric values are ignored rather than failing the load.
pub fn apply_env_overrides(config: &mut FollowConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

fn apply_overrides_from(
    config: &mut FollowConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("MEASURE_FOLLOW_SCORE") {
        config.paths.score = Some(expand_path(&v));
        sources.env_overrides.push("MEASURE_FOLLOW_SCORE".to_string());
    }
    if let Some(v) = lookup("MEASURE_FOLLOW_RECORD") {
        config.paths.record = Some(expand_path(&v));
        sources.env_overrides.push("MEASURE_FOLLOW_RECORD".to_string());
    }

    let numeric: [(&str, &mut usize); 3] = [
        ("MEASURE_FOLLOW_WINDOW_SIZE", &mut config.env.window_size),
        ("MEASURE_FOLLOW_MEMORY_SIZE", &mut config.env.memory_size),
        ("MEASURE_FOLLOW_FPS", &mut config.env.fps),
    ];
    for (key, slot) in numeric {
        if let Some(parsed) = lookup(key).and_then(|v| v.parse().ok()) {
            *slot = parsed;
            sources.env_overrides.push(key.to_string());
        }
    }

    if let Some(seed) = lookup("MEASURE_FOLLOW_SEED").and_then(|v| v.parse().ok()) {
        config.env.seed = Some(seed);
        sources.env_overrides.push("MEASURE_FOLLOW_SEED".to_string());
    }

    if let Some(v) = lookup("MEASURE_FOLLOW_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("MEASURE_FOLLOW_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RewardKind, SlidePolicy, WindowMode};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/test/path");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_absolute() {
        let expanded = expand_path("/absolute/path");
        assert_eq!(expanded, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
[env]
window_size = 7
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.env.window_size, 7);
        // Other values should be defaults
        assert_eq!(config.env.memory_size, 16);
        assert_eq!(config.env.fps, 20);
        assert!(config.paths.score.is_none());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[paths]
score = "/data/minuet/score.json"
record = "/data/minuet/take1.midi"

[env]
window_size = 10
memory_size = 4
fps = 25
onset_only = false
buffer_duration = 2
buffer_step_size = 5
window_mode = "dynamic"
slide_policy = "history"
similarity_threshold = 2.5
seed = 42

[reward]
kind = "weighted_triangle"
forward_weight = 1.0
backward_weight = 0.5

[render]
columns = 4
channel_last = true

[telemetry]
log_level = "debug"
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();

        assert_eq!(config.paths.score, Some(PathBuf::from("/data/minuet/score.json")));
        assert_eq!(config.paths.record, Some(PathBuf::from("/data/minuet/take1.midi")));
        assert_eq!(config.env.window_size, 10);
        assert_eq!(config.env.memory_size, 4);
        assert_eq!(config.env.segment_frames(), 50);
        assert!(!config.env.onset_only);
        assert_eq!(config.env.window_mode, WindowMode::Dynamic);
        assert_eq!(config.env.slide_policy, SlidePolicy::History);
        assert_eq!(config.env.seed, Some(42));
        assert_eq!(config.reward.kind, RewardKind::WeightedTriangle);
        assert_eq!(config.reward.backward_weight, 0.5);
        assert_eq!(config.render.columns, 4);
        assert_eq!(config.render.cell_width, 48);
        assert!(config.render.channel_last);
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_parse_rejects_unknown_window_mode() {
        let toml = r#"
[env]
window_mode = "elastic"
"#;
        let err = parse_toml(toml, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_merge_keeps_base_when_overlay_is_default() {
        let mut base = FollowConfig::default();
        base.env.window_size = 8;
        base.paths.score = Some(PathBuf::from("/a/score.json"));

        let mut overlay = FollowConfig::default();
        overlay.env.memory_size = 3;

        let merged = merge_configs(base, overlay);
        assert_eq!(merged.env.window_size, 8);
        assert_eq!(merged.env.memory_size, 3);
        assert_eq!(merged.paths.score, Some(PathBuf::from("/a/score.json")));
    }

    #[test]
    fn test_load_from_file_and_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("measure-follow.toml");
        std::fs::write(&path, "[env]\nfps = 30\n").unwrap();

        let loaded = load_from_file(&path).unwrap();
        let merged = merge_configs(FollowConfig::default(), loaded);
        assert_eq!(merged.env.fps, 30);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MEASURE_FOLLOW_WINDOW_SIZE", "12"),
            ("MEASURE_FOLLOW_FPS", "not-a-number"),
            ("MEASURE_FOLLOW_SEED", "9"),
            ("MEASURE_FOLLOW_RECORD", "/takes/one.midi"),
        ]
        .into_iter()
        .collect();

        let mut config = FollowConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(&mut config, &mut sources, |key| {
            vars.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.env.window_size, 12);
        assert_eq!(config.env.fps, 20);
        assert_eq!(config.env.seed, Some(9));
        assert_eq!(config.paths.record, Some(PathBuf::from("/takes/one.midi")));
        assert_eq!(
            sources.env_overrides,
            vec![
                "MEASURE_FOLLOW_RECORD".to_string(),
                "MEASURE_FOLLOW_WINDOW_SIZE".to_string(),
                "MEASURE_FOLLOW_SEED".to_string(),
            ]
        );
    }
}
