//! Similarity observations between window measures and the performance.

use std::sync::Arc;

use midi_record::euclidean;

use crate::matrix::Matrix;
use crate::score::Measure;
use crate::source::{Aligner, PerformanceSegment};

/// Columns per window slot: similarity, normalized offset, normalized span.
pub const SIMILARITY_COLUMNS: usize = 3;

/// Value of every cell once an episode is done.
pub const SENTINEL: f64 = 0.0;

/// Builds the `width x 3` similarity matrix for one step.
#[derive(Clone)]
pub struct SimilarityBuilder {
    aligner: Arc<dyn Aligner>,
    threshold: f64,
}

impl SimilarityBuilder {
    pub fn new(aligner: Arc<dyn Aligner>, threshold: f64) -> Self {
        Self { aligner, threshold }
    }

    /// Map a combined distance into `(0, 1]`; `threshold` sits at one half.
    pub fn similarity(&self, distance: f64) -> f64 {
        self.threshold / (self.threshold + distance.max(0.0))
    }

    pub fn sentinel(rows: usize) -> Matrix {
        Matrix::filled(rows, SIMILARITY_COLUMNS, SENTINEL)
    }

    /// One row per visible measure; rows past `measures.len()` keep the
    /// sentinel.
    pub fn build(&self, measures: &[Measure], segment: &PerformanceSegment, rows: usize) -> Matrix {
        let mut matrix = Self::sentinel(rows);
        let n = segment.len();

        for (i, measure) in measures.iter().take(rows).enumerate() {
            let alignment = self.aligner.align(&measure.sequence, &segment.sequence);

            let frames = segment
                .sequence
                .frame_range(alignment.start, alignment.end);
            let (head, tail) = (frames.start, frames.end);

            let histogram = segment.histogram(head, tail);
            let distance = alignment.distance + euclidean(&measure.pitch_histogram, &histogram);

            let offset = if n > 1 {
                head as f64 / (n - 1) as f64
            } else {
                0.0
            };
            let span = if n > 0 {
                (tail - head) as f64 / n as f64
            } else {
                0.0
            };

            matrix
                .row_mut(i)
                .copy_from_slice(&[self.similarity(distance), offset, span]);
        }

        matrix
    }
}
