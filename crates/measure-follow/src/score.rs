//! The score: an ordered, immutable list of measures with alignment features.

use std::path::Path;
use std::sync::Arc;

use midi_record::{key_bit, split_bars, KeySequence, PianoRoll, PitchHistogram, PITCH_CLASSES};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{read_file, FollowError, Result};

/// One measure of the score.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    /// Absolute position in the score.
    pub index: usize,
    pub sequence: KeySequence,
    pub pitch_histogram: PitchHistogram,
}

/// A measure as stored in a score JSON file.
///
/// `sequence` lists the MIDI pitches of each entry. `frame_indices` may be
/// omitted, in which case entries map one-to-one onto frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MeasureRecord {
    sequence: Vec<Vec<u8>>,
    #[serde(default)]
    frame_indices: Vec<usize>,
    pitch_histogram: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    measures: Vec<Measure>,
}

impl Score {
    pub fn new(measures: Vec<Measure>) -> Result<Arc<Self>> {
        if measures.is_empty() {
            return Err(FollowError::InvalidScore("score has no measures".into()));
        }
        Ok(Arc::new(Self { measures }))
    }

    /// Load precomputed measures from JSON.
    pub fn from_json(text: &str) -> Result<Arc<Self>> {
        let records: Vec<MeasureRecord> = serde_json::from_str(text)?;

        let mut measures = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let bins: [f64; PITCH_CLASSES] =
                record.pitch_histogram.as_slice().try_into().map_err(|_| {
                    FollowError::InvalidScore(format!(
                        "measure {index}: pitch_histogram needs {PITCH_CLASSES} bins, got {}",
                        record.pitch_histogram.len()
                    ))
                })?;

            let keys: Vec<_> = record
                .sequence
                .iter()
                .map(|pitches| pitches.iter().fold(0, |mask, &p| mask | key_bit(p)))
                .collect();
            let frame_indices = if record.frame_indices.is_empty() {
                (0..keys.len()).collect()
            } else if record.frame_indices.len() == keys.len() {
                record.frame_indices
            } else {
                return Err(FollowError::InvalidScore(format!(
                    "measure {index}: {} frame indices for {} sequence entries",
                    record.frame_indices.len(),
                    keys.len()
                )));
            };

            measures.push(Measure {
                index,
                sequence: KeySequence {
                    keys,
                    frame_indices,
                },
                pitch_histogram: PitchHistogram(bins),
            });
        }

        Self::new(measures)
    }

    /// Split a score MIDI file into bars and compute each bar's features.
    pub fn from_midi(bytes: &[u8], fps: usize, onset_only: bool) -> Result<Arc<Self>> {
        let (notes, context) = midi_record::parse(bytes)?;
        if context.unclosed_notes > 0 {
            warn!(unclosed = context.unclosed_notes, "score MIDI has notes without a note-off");
        }
        let roll = PianoRoll::from_notes(&notes, &context, fps)?;

        let measures: Vec<Measure> = split_bars(&context, fps)
            .into_iter()
            .enumerate()
            .map(|(index, frames)| {
                let frames = roll.slice(frames);
                Measure {
                    index,
                    sequence: KeySequence::from_frames(frames, onset_only),
                    pitch_histogram: PitchHistogram::from_frames(frames, onset_only),
                }
            })
            .collect();

        debug!(
            notes = notes.len(),
            frames = roll.len(),
            bars = measures.len(),
            "split score MIDI into bars"
        );
        Self::new(measures)
    }

    /// Load from disk: `.mid` / `.midi` files are split into bars, anything
    /// else is read as JSON.
    pub fn from_path(path: &Path, fps: usize, onset_only: bool) -> Result<Arc<Self>> {
        let bytes = read_file(path)?;
        let score = if is_midi(path) {
            Self::from_midi(&bytes, fps, onset_only)?
        } else {
            let text = String::from_utf8(bytes)
                .map_err(|e| FollowError::InvalidScore(format!("{}: {e}", path.display())))?;
            Self::from_json(&text)?
        };
        info!(path = %path.display(), measures = score.len(), "loaded score");
        Ok(score)
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn measure(&self, index: usize) -> Option<&Measure> {
        self.measures.get(index)
    }
}

pub(crate) fn is_midi(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("mid") || e.eq_ignore_ascii_case("midi"))
        .unwrap_or(false)
}
