use std::ops::Range;

/// Position of the observed segment within the performance, in frames.
///
/// The segment covers `position..position + segment_frames`. `position`
/// never exceeds `max_position`, the last position at which a full segment
/// still fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceCursor {
    position: usize,
    step_size: usize,
    max_position: usize,
    segment_frames: usize,
}

impl PerformanceCursor {
    pub fn new(total_frames: usize, segment_frames: usize, step_size: usize) -> Self {
        Self {
            position: 0,
            step_size,
            max_position: total_frames.saturating_sub(segment_frames),
            segment_frames,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn max_position(&self) -> usize {
        self.max_position
    }

    pub fn step_size(&self) -> usize {
        self.step_size
    }

    pub fn segment_frames(&self) -> usize {
        self.segment_frames
    }

    /// Frames of the current segment.
    pub fn segment(&self) -> Range<usize> {
        self.position..self.position + self.segment_frames
    }

    pub fn reset(&mut self, position: usize) {
        self.position = position.min(self.max_position);
    }

    pub fn advance(&mut self) {
        self.position = (self.position + self.step_size).min(self.max_position);
    }

    pub fn done(&self) -> bool {
        self.position >= self.max_position
    }
}
