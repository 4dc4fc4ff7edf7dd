//! Shared fixtures: hand-built MIDI files, stub aligners, scripted sources.

#![allow(dead_code)]

use std::ops::Range;
use std::sync::Arc;

use measure_follow::{
    Aligner, Alignment, GroundTruth, Measure, PerformanceSegment, PerformanceSource, Score,
};
use midi_record::{Frame, KeySequence, PitchHistogram};

fn vlq(mut value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push(((value & 0x7F) as u8) | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    bytes
}

fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// Format 1, 480 ppq, 120 BPM, 4/4. `notes` are `(pitch, onset_tick, duration_ticks)`.
pub fn midi(notes: &[(u8, u32, u32)]) -> Vec<u8> {
    let mut header = Vec::new();
    header.extend_from_slice(&1u16.to_be_bytes());
    header.extend_from_slice(&2u16.to_be_bytes());
    header.extend_from_slice(&480u16.to_be_bytes());

    let conductor = [
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo 500000
        0x00, 0xFF, 0x58, 0x04, 0x04, 0x02, 0x18, 0x08, // 4/4
        0x00, 0xFF, 0x2F, 0x00,
    ];

    let mut events: Vec<(u32, bool, u8)> = Vec::new();
    for &(pitch, onset, duration) in notes {
        events.push((onset, true, pitch));
        events.push((onset + duration, false, pitch));
    }
    events.sort_by_key(|&(tick, is_on, pitch)| (tick, is_on, pitch));

    let mut track = Vec::new();
    let mut last = 0u32;
    for (tick, is_on, pitch) in events {
        track.extend(vlq(tick - last));
        last = tick;
        let status = if is_on { 0x90 } else { 0x80 };
        track.extend_from_slice(&[status, pitch, if is_on { 0x64 } else { 0 }]);
    }
    track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    let mut out = chunk(b"MThd", &header);
    out.extend(chunk(b"MTrk", &conductor));
    out.extend(chunk(b"MTrk", &track));
    out
}

/// One quarter note per beat for `bars` bars of 4/4, pitch rising per bar.
pub fn scale_midi(bars: u32) -> Vec<u8> {
    let notes: Vec<(u8, u32, u32)> = (0..bars * 4)
        .map(|beat| (60 + (beat / 4) as u8, beat * 480, 480))
        .collect();
    midi(&notes)
}

/// Aligns every query to the whole target with zero cost.
pub struct WholeSegmentAligner;

impl Aligner for WholeSegmentAligner {
    fn align(&self, _query: &KeySequence, target: &KeySequence) -> Alignment {
        Alignment {
            distance: 0.0,
            start: 0,
            end: target.len(),
        }
    }
}

/// One scripted label per frame; silent segments.
pub struct Scripted {
    pub labels: Vec<GroundTruth>,
    pub segment_frames: usize,
}

impl PerformanceSource for Scripted {
    fn num_frames(&self) -> usize {
        self.labels.len()
    }

    fn segment_frames(&self) -> usize {
        self.segment_frames
    }

    fn segment(&self, _position: usize) -> PerformanceSegment {
        PerformanceSegment::new(vec![Frame::default(); self.segment_frames], true)
    }

    fn ground_truth(&self, frames: Range<usize>) -> GroundTruth {
        let end = frames.end.min(self.labels.len());
        let start = frames.start.min(end);
        if self.labels[start..end].contains(&GroundTruth::Slide) {
            return GroundTruth::Slide;
        }
        self.labels[end.saturating_sub(1)]
    }

    fn position_of(&self, measure: usize) -> Option<usize> {
        let first = self
            .labels
            .iter()
            .position(|l| *l == GroundTruth::Measure(measure))?;
        Some(first.saturating_sub(self.segment_frames - 1))
    }
}

/// `n` featureless measures.
pub fn blank_score(n: usize) -> Arc<Score> {
    Score::new(
        (0..n)
            .map(|index| Measure {
                index,
                sequence: KeySequence::default(),
                pitch_histogram: PitchHistogram::default(),
            })
            .collect(),
    )
    .unwrap()
}
