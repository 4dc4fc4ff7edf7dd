//! Feature extraction for score following.
//!
//! Turns MIDI into the frame-level data the follower compares: a piano roll
//! sampled at a fixed frame rate, key sequences (one key mask per frame,
//! optionally onsets only), and 12-bin pitch-class histograms. Score MIDI can
//! be split into bars; performance MIDI comes with a CSV of measure entry
//! times that supplies ground truth.

pub mod annotations;
pub mod bars;
pub mod extract;
pub mod features;
pub mod note;
pub mod roll;

#[cfg(test)]
pub(crate) mod test_midi;

pub use annotations::{Annotation, Label, Timeline};
pub use bars::{bar_tick_ranges, split_bars};
pub use extract::{extract_notes, parse, MidiFileContext, TempoChange, TimeSignature};
pub use features::{euclidean, KeySequence, PitchHistogram, PITCH_CLASSES};
pub use note::TimedNote;
pub use roll::{key_bit, Frame, KeyMask, PianoRoll};

/// Errors from MIDI feature extraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("annotation line {line}: {message}")]
    Annotation { line: usize, message: String },

    #[error("frame rate must be positive")]
    ZeroFps,
}

pub type Result<T> = std::result::Result<T, Error>;
