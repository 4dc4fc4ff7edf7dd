//! Environments built from configuration over MIDI + CSV records on disk.

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{scale_midi, WholeSegmentAligner};
use follow_conf::FollowConfig;
use measure_follow::{
    Action, ActionDistribution, FollowError, GridRenderer, MeasureFollowingEnv, NullRenderer,
    ResetOptions, Score, Termination,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Four bars of 4/4 at 120 BPM: two seconds per bar, 80 frames at 10 fps.
fn write_fixture(dir: &Path, csv: &str) {
    std::fs::write(dir.join("score.mid"), scale_midi(4)).unwrap();
    std::fs::write(dir.join("take.mid"), scale_midi(4)).unwrap();
    std::fs::write(dir.join("take.csv"), csv).unwrap();
}

fn config(dir: &Path) -> FollowConfig {
    let mut config = FollowConfig::default();
    config.paths.score = Some(dir.join("score.mid"));
    config.paths.record = Some(dir.join("take.mid"));
    config.env.window_size = 2;
    config.env.memory_size = 2;
    config.env.fps = 10;
    config.env.buffer_duration = 1;
    config.env.buffer_step_size = 5;
    config.env.seed = Some(3);
    config
}

fn run(env: &mut MeasureFollowingEnv) -> (Vec<Option<Action>>, Option<Termination>) {
    let d = ActionDistribution::one_hot(0, 2).unwrap();
    let mut actions = Vec::new();
    for _ in 0..100 {
        let t = env.step(&d).unwrap();
        actions.push(t.true_action);
        if t.done {
            return (actions, t.info.termination);
        }
    }
    panic!("episode never ended");
}

fn start() -> ResetOptions {
    ResetOptions {
        start_measure: Some(0),
        window_head: None,
    }
}

#[test]
fn score_midi_splits_into_bars() {
    let score = Score::from_midi(&scale_midi(4), 10, true).unwrap();
    assert_eq!(score.len(), 4);

    let bar = score.measure(1).unwrap();
    // four quarter-note onsets, five frames apart
    assert_eq!(bar.sequence.frame_indices, vec![0, 5, 10, 15]);
    // every onset in bar 1 is C#
    assert_eq!(bar.pitch_histogram.0[1], 1.0);
}

#[test]
fn leaving_the_window_without_a_slide_fails_tracking() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), "seconds,measure\n0.0,0\n2.0,1\n4.0,2\n6.0,3\n");

    let mut env = MeasureFollowingEnv::from_config(
        &config(dir.path()),
        Arc::new(WholeSegmentAligner),
        Box::new(NullRenderer),
    )
    .unwrap();
    env.reset(None, &start()).unwrap();

    let (actions, termination) = run(&mut env);
    let m = |i| Some(Action::Measure(i));
    assert_eq!(actions, vec![m(0), m(0), m(0), m(1), m(1), m(1), m(1), None]);
    assert_eq!(termination, Some(Termination::TrackingFailure));
}

#[test]
fn slide_marker_carries_the_episode_to_completion() {
    let dir = TempDir::new().unwrap();
    write_fixture(
        dir.path(),
        "seconds,measure\n0.0,0\n2.0,1\n3.75,slide\n4.0,2\n6.0,3\n",
    );

    let mut env = MeasureFollowingEnv::from_config(
        &config(dir.path()),
        Arc::new(WholeSegmentAligner),
        Box::new(GridRenderer::new(Default::default())),
    )
    .unwrap();
    env.reset(None, &start()).unwrap();

    let (actions, termination) = run(&mut env);
    let m = |i| Some(Action::Measure(i));
    assert_eq!(
        actions,
        vec![
            m(0),
            m(0),
            m(0),
            m(1),
            m(1),
            m(1),
            Some(Action::Slide),
            m(0),
            m(0),
            m(0),
            m(0),
            m(1),
            m(1),
            m(1),
        ]
    );
    assert_eq!(termination, Some(Termination::Completed));
    assert_eq!(env.controller().window().range(), 2..4);
}

#[test]
fn json_score_is_accepted() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), "seconds,measure\n0.0,0\n");
    let hist = "[1,0,0,0,0,0,0,0,0,0,0,0]";
    let json = format!(
        r#"[{{"sequence": [[60]], "pitch_histogram": {hist}}},
            {{"sequence": [[60]], "pitch_histogram": {hist}}},
            {{"sequence": [[60]], "pitch_histogram": {hist}}}]"#
    );
    std::fs::write(dir.path().join("score.json"), json).unwrap();

    let mut config = config(dir.path());
    config.paths.score = Some(dir.path().join("score.json"));

    let mut env =
        MeasureFollowingEnv::from_config(&config, Arc::new(WholeSegmentAligner), Box::new(NullRenderer))
            .unwrap();
    let (obs, info) = env.reset(Some(1), &ResetOptions::default()).unwrap();
    assert_eq!(obs.similarity.shape(), (2, 3));
    assert_eq!(info.window.len(), 2);
}

#[test]
fn window_wider_than_score_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), "seconds,measure\n0.0,0\n");
    let mut config = config(dir.path());
    config.env.window_size = 5;

    let err = MeasureFollowingEnv::from_config(&config, Arc::new(WholeSegmentAligner), Box::new(NullRenderer))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        FollowError::WindowTooLarge {
            window_size: 5,
            measures: 4
        }
    ));
}

#[test]
fn missing_annotations_are_a_config_error() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), "seconds,measure\n0.0,0\n");
    std::fs::remove_file(dir.path().join("take.csv")).unwrap();

    let err = MeasureFollowingEnv::from_config(
        &config(dir.path()),
        Arc::new(WholeSegmentAligner),
        Box::new(NullRenderer),
    )
    .err()
    .unwrap();
    match err {
        FollowError::Io { path, .. } => assert!(path.ends_with("take.csv")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unset_paths_are_a_config_error() {
    let err = MeasureFollowingEnv::from_config(
        &FollowConfig::default(),
        Arc::new(WholeSegmentAligner),
        Box::new(NullRenderer),
    )
    .err()
    .unwrap();
    assert!(matches!(err, FollowError::InvalidConfig(_)));
}

#[test]
fn toml_config_file_drives_the_environment() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), "seconds,measure\n0.0,0\n2.0,1\n");
    let toml = format!(
        r#"
[paths]
score = "{score}"
record = "{record}"

[env]
window_size = 3
memory_size = 5
fps = 10
buffer_duration = 1
buffer_step_size = 5
window_mode = "dynamic"

[reward]
kind = "weighted_triangle"
backward_weight = 0.5
"#,
        score = dir.path().join("score.mid").display(),
        record = dir.path().join("take.mid").display(),
    );
    let config_path = dir.path().join("measure-follow.toml");
    std::fs::write(&config_path, toml).unwrap();

    let config = FollowConfig::load_from(Some(&config_path)).unwrap();
    let env =
        MeasureFollowingEnv::from_config(&config, Arc::new(WholeSegmentAligner), Box::new(NullRenderer))
            .unwrap();
    let shapes = env.observation_shapes();
    assert_eq!(shapes.similarity, (3, 3));
    assert_eq!(shapes.memory, (5, 5));
    assert_eq!(env.action_len(), 5);
}
