//! Frame-sampled piano roll.
//!
//! Each frame holds two 128-bit key masks: keys sounding during the frame and
//! keys whose note starts in it. Bit `p` stands for MIDI pitch `p`.

use crate::extract::MidiFileContext;
use crate::note::TimedNote;
use crate::{Error, Result};
use std::ops::Range;

/// One bit per MIDI pitch.
pub type KeyMask = u128;

/// Bit for a single pitch.
pub fn key_bit(pitch: u8) -> KeyMask {
    1u128 << (pitch & 0x7F)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frame {
    pub active: KeyMask,
    pub onsets: KeyMask,
}

impl Frame {
    pub fn is_silent(&self) -> bool {
        self.active == 0
    }

    pub fn has_onset(&self) -> bool {
        self.onsets != 0
    }

    /// Pitches set in `mask`, lowest first.
    pub fn pitches(mask: KeyMask) -> impl Iterator<Item = u8> {
        (0u8..128).filter(move |&p| mask & key_bit(p) != 0)
    }
}

/// Piano roll sampled at `fps` frames per second.
#[derive(Debug, Clone, PartialEq)]
pub struct PianoRoll {
    fps: usize,
    frames: Vec<Frame>,
}

impl PianoRoll {
    /// Rasterize notes into frames.
    ///
    /// A note occupies `floor(onset * fps) .. max(onset_frame + 1, ceil(offset * fps))`,
    /// so even zero-length notes leave an onset behind.
    pub fn from_notes(notes: &[TimedNote], context: &MidiFileContext, fps: usize) -> Result<Self> {
        if fps == 0 {
            return Err(Error::ZeroFps);
        }

        let rate = fps as f64;
        let spans: Vec<(usize, usize, u8)> = notes
            .iter()
            .map(|note| {
                let onset = (context.tick_to_seconds(note.onset_tick) * rate).floor() as usize;
                let offset = (context.tick_to_seconds(note.offset_tick) * rate).ceil() as usize;
                (onset, offset.max(onset + 1), note.pitch)
            })
            .collect();

        let file_frames = (context.duration_seconds() * rate).ceil() as usize;
        let len = spans
            .iter()
            .map(|&(_, end, _)| end)
            .max()
            .unwrap_or(0)
            .max(file_frames);

        let mut frames = vec![Frame::default(); len];
        for (onset, end, pitch) in spans {
            let bit = key_bit(pitch);
            frames[onset].onsets |= bit;
            for frame in &mut frames[onset..end] {
                frame.active |= bit;
            }
        }

        Ok(Self { fps, frames })
    }

    pub fn from_frames(fps: usize, frames: Vec<Frame>) -> Self {
        Self { fps, frames }
    }

    pub fn fps(&self) -> usize {
        self.fps
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Frames in `range`, clipped to the roll.
    pub fn slice(&self, range: Range<usize>) -> &[Frame] {
        let end = range.end.min(self.frames.len());
        let start = range.start.min(end);
        &self.frames[start..end]
    }

    /// Frame index containing `seconds`.
    pub fn frame_at(&self, seconds: f64) -> usize {
        (seconds.max(0.0) * self.fps as f64).floor() as usize
    }
}
