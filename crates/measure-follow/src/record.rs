//! Performance records: a performance MIDI plus its measure annotations.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use follow_conf::EnvConfig;
use midi_record::{Annotation, Frame, Label, PianoRoll, Timeline};
use tracing::{info, warn};

use crate::error::{read_file, FollowError, Result};
use crate::score::is_midi;
use crate::source::{GroundTruth, PerformanceSegment, PerformanceSource};

/// A performance MIDI rasterized at a fixed frame rate, with ground truth
/// from a `seconds,measure` annotation CSV.
#[derive(Debug, Clone)]
pub struct MidiPerformance {
    roll: PianoRoll,
    timeline: Timeline,
    segment_frames: usize,
    onset_only: bool,
}

impl MidiPerformance {
    pub fn from_bytes(
        midi: &[u8],
        annotations_csv: &str,
        fps: usize,
        segment_frames: usize,
        onset_only: bool,
    ) -> Result<Self> {
        if segment_frames == 0 {
            return Err(FollowError::InvalidConfig(
                "segment length must be positive".into(),
            ));
        }

        let (notes, context) = midi_record::parse(midi)?;
        if context.unclosed_notes > 0 {
            warn!(
                unclosed = context.unclosed_notes,
                "performance MIDI has notes without a note-off"
            );
        }
        let roll = PianoRoll::from_notes(&notes, &context, fps)?;
        let annotations = Annotation::parse_csv(annotations_csv)?;
        let timeline = Timeline::from_annotations(&annotations, roll.len(), fps);

        Ok(Self {
            roll,
            timeline,
            segment_frames,
            onset_only,
        })
    }

    /// Load `<stem>.mid(i)` and the `<stem>.csv` next to it.
    pub fn from_path(path: &Path, env: &EnvConfig) -> Result<Arc<Self>> {
        if !is_midi(path) {
            return Err(FollowError::InvalidConfig(format!(
                "performance record must be a .mid or .midi file: {}",
                path.display()
            )));
        }

        let midi = read_file(path)?;
        let csv_path = annotations_path(path);
        let csv_bytes = read_file(&csv_path)?;
        let csv = String::from_utf8_lossy(&csv_bytes);

        let record = Self::from_bytes(
            &midi,
            &csv,
            env.fps,
            env.segment_frames(),
            env.onset_only,
        )?;
        info!(
            path = %path.display(),
            frames = record.roll.len(),
            slides = record.timeline.slide_frames().len(),
            "loaded performance record"
        );
        Ok(Arc::new(record))
    }

    /// Warn about annotations that point past the end of the score.
    pub fn check_against(&self, score_len: usize) {
        if let Some(max) = self.timeline.max_measure() {
            if max >= score_len {
                warn!(
                    max_measure = max,
                    score_len, "annotations reference measures beyond the score"
                );
            }
        }
    }

    pub fn roll(&self) -> &PianoRoll {
        &self.roll
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    fn max_position(&self) -> usize {
        self.roll.len().saturating_sub(self.segment_frames)
    }
}

pub fn annotations_path(midi_path: &Path) -> PathBuf {
    midi_path.with_extension("csv")
}

impl PerformanceSource for MidiPerformance {
    fn num_frames(&self) -> usize {
        self.roll.len()
    }

    fn segment_frames(&self) -> usize {
        self.segment_frames
    }

    fn segment(&self, position: usize) -> PerformanceSegment {
        let mut frames = self
            .roll
            .slice(position..position + self.segment_frames)
            .to_vec();
        frames.resize(self.segment_frames, Frame::default());
        PerformanceSegment::new(frames, self.onset_only)
    }

    fn ground_truth(&self, frames: Range<usize>) -> GroundTruth {
        if self.timeline.slide_in(frames.clone()) {
            return GroundTruth::Slide;
        }
        match self.timeline.label_at(frames.end.saturating_sub(1)) {
            Label::Measure(m) => GroundTruth::Measure(m),
            Label::Stay | Label::Slide => GroundTruth::Stay,
        }
    }

    fn position_of(&self, measure: usize) -> Option<usize> {
        let first = self.timeline.first_frame_of(measure)?;
        let position = first.saturating_sub(self.segment_frames - 1);
        Some(position.min(self.max_position()))
    }
}
