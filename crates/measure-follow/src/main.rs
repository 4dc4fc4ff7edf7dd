//! measure-follow - inspect configuration and data for the measure-following environment
//!
//! Subcommands:
//! - `measure-follow config` - Print the resolved configuration and its sources
//! - `measure-follow inspect [--start N]` - Load score and record, print episode geometry and ground truth

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use follow_conf::{ConfigSources, FollowConfig};
use measure_follow::{truth_timeline, GroundTruth, MidiPerformance, PerformanceSource, Score};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "measure-follow")]
#[command(about = "Measure-following environment tools")]
#[command(version)]
struct Cli {
    /// Config file (replaces ./measure-follow.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved configuration as TOML
    Config,

    /// Report score/record geometry and the ground-truth timeline
    Inspect {
        /// Print at most this many timeline rows
        #[arg(short, long, default_value = "40")]
        limit: usize,

        /// Start the timeline where an episode starting at this measure would
        #[arg(short, long)]
        start: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = FollowConfig::load_with_sources_from(cli.config.as_deref())
        .context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config => print_config(&config, &sources),
        Commands::Inspect { limit, start } => inspect(&config, limit, start)?,
    }

    Ok(())
}

fn print_config(config: &FollowConfig, sources: &ConfigSources) {
    print!("{}", config.to_toml());

    println!();
    if sources.files.is_empty() {
        println!("# sources: compiled defaults");
    } else {
        for file in &sources.files {
            println!("# source: {}", file.display());
        }
    }
    for var in &sources.env_overrides {
        println!("# env: {}", var);
    }
}

fn inspect(config: &FollowConfig, limit: usize, start: Option<usize>) -> Result<()> {
    let env = &config.env;

    let score_path = config
        .paths
        .score
        .as_deref()
        .context("paths.score is not set")?;
    let record_path = config
        .paths
        .record
        .as_deref()
        .context("paths.record is not set")?;

    let score = Score::from_path(score_path, env.fps, env.onset_only)
        .with_context(|| format!("loading score {}", score_path.display()))?;
    let record = MidiPerformance::from_path(record_path, env)
        .with_context(|| format!("loading record {}", record_path.display()))?;
    record.check_against(score.len());

    let frames = record.num_frames();
    let segment = record.segment_frames();
    let max_position = frames.saturating_sub(segment);

    println!("score:     {} ({} measures)", score_path.display(), score.len());
    println!("record:    {} ({} frames at {} fps)", record_path.display(), frames, env.fps);
    println!("window:    {} measures ({})", env.window_size, env.window_mode);
    if env.window_size > score.len() {
        println!("           window is wider than the score");
    }
    println!("segment:   {} frames, step {}, max position {}", segment, env.buffer_step_size, max_position);

    let start_position = match start {
        Some(measure) => record.position_of(measure).unwrap_or(0),
        None => 0,
    };
    match start {
        Some(measure) => println!(
            "start:     measure {} at position {}, truth revealed from there",
            measure, start_position
        ),
        None => println!("start:     position 0, truth revealed from there"),
    }
    println!();
    println!("{:>8}  {:>8}  truth", "position", "seconds");

    let timeline = truth_timeline(&*record, start_position, env.buffer_step_size);
    for (position, truth) in timeline.into_iter().take(limit) {
        let label = match truth {
            GroundTruth::Measure(m) => m.to_string(),
            GroundTruth::Stay => "stay".to_string(),
            GroundTruth::Slide => "slide".to_string(),
        };
        let seconds = position as f64 / env.fps as f64;
        println!("{:>8}  {:>8.2}  {}", position, seconds, label);
    }

    Ok(())
}
