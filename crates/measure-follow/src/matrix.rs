use serde::Serialize;

/// Dense row-major matrix of `f64`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.cols.max(1)).take(self.rows)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Drop row 0, move every other row up by one, and write `last` into
    /// the freed final row.
    pub fn shift_up(&mut self, last: &[f64]) {
        if self.rows == 0 {
            return;
        }
        self.data.copy_within(self.cols.., 0);
        let tail = (self.rows - 1) * self.cols;
        self.data[tail..].copy_from_slice(&last[..self.cols]);
    }
}

/// What the agent sees after `reset` and every `step`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// `width x 3`: similarity, normalized offset, normalized span.
    pub similarity: Matrix,
    /// `memory_size x (width + 2)`: past action distributions, oldest first.
    pub memory: Matrix,
}
