//! Capabilities the environment consumes: performance data and alignment.

use std::ops::Range;

use midi_record::{Frame, KeySequence, PitchHistogram};

/// Ground truth revealed as the performance advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundTruth {
    /// The performer is in this absolute measure.
    Measure(usize),
    /// Nothing from the score is being played.
    Stay,
    /// The visible window should move on.
    Slide,
}

/// Frames of performance visible in one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSegment {
    pub frames: Vec<Frame>,
    pub sequence: KeySequence,
    pub onset_only: bool,
}

impl PerformanceSegment {
    pub fn new(frames: Vec<Frame>, onset_only: bool) -> Self {
        let sequence = KeySequence::from_frames(&frames, onset_only);
        Self {
            frames,
            sequence,
            onset_only,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Pitch histogram of frames `head..tail`, clamped into the segment.
    pub fn histogram(&self, head: usize, tail: usize) -> PitchHistogram {
        PitchHistogram::over_range(&self.frames, head, tail, self.onset_only)
    }
}

/// A performance the environment can follow.
///
/// Implementations are read-only; one source can back many episodes.
pub trait PerformanceSource: Send + Sync {
    /// Total frames in the performance.
    fn num_frames(&self) -> usize;

    /// Frames per observed segment.
    fn segment_frames(&self) -> usize;

    /// The segment starting at `position`, padded with silence when the
    /// performance ends early.
    fn segment(&self, position: usize) -> PerformanceSegment;

    /// Ground truth for frames newly revealed since the previous query.
    ///
    /// `Slide` if a slide marker falls inside `frames`, otherwise the label
    /// in force at the last frame of the range.
    fn ground_truth(&self, frames: Range<usize>) -> GroundTruth;

    /// Frame position from which the performer is first heard in `measure`.
    fn position_of(&self, measure: usize) -> Option<usize>;
}

/// Ground truth an episode would read at each cursor position, starting
/// from `start` and moving `step` frames at a time.
///
/// Follows the controller: each row reveals frames from the end of the
/// previous segment, and sampling stops once the cursor reaches the last
/// position.
pub fn truth_timeline(
    source: &dyn PerformanceSource,
    start: usize,
    step: usize,
) -> Vec<(usize, GroundTruth)> {
    let segment = source.segment_frames();
    let max_position = source.num_frames().saturating_sub(segment);
    let mut position = start.min(max_position);
    let mut revealed = position;
    let mut rows = Vec::new();

    loop {
        let end = position + segment;
        rows.push((position, source.ground_truth(revealed..end.max(revealed))));
        revealed = revealed.max(end);

        position = (position + step.max(1)).min(max_position);
        if position >= max_position {
            break;
        }
    }
    rows
}

/// Result of aligning a score measure against a performance segment.
///
/// `start..end` indexes the target key sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alignment {
    pub distance: f64,
    pub start: usize,
    pub end: usize,
}

/// Sub-sequence alignment engine.
pub trait Aligner: Send + Sync {
    fn align(&self, query: &KeySequence, target: &KeySequence) -> Alignment;
}
