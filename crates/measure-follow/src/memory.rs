use crate::action::ActionDistribution;
use crate::matrix::Matrix;

/// Rolling buffer of the agent's recent action distributions.
///
/// Row 0 is the oldest; the last row is the most recent. A reset fills every
/// row with a delta on the stay slot.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyMemory {
    matrix: Matrix,
    width: usize,
}

impl PolicyMemory {
    pub fn new(depth: usize, width: usize) -> Self {
        let mut memory = Self {
            matrix: Matrix::filled(depth, width + 2, 0.0),
            width,
        };
        memory.reset();
        memory
    }

    pub fn reset(&mut self) {
        self.matrix.fill(0.0);
        for row in 0..self.matrix.shape().0 {
            self.matrix.row_mut(row)[self.width] = 1.0;
        }
    }

    pub fn push(&mut self, distribution: &ActionDistribution) {
        self.matrix.shift_up(distribution.as_slice());
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn depth(&self) -> usize {
        self.matrix.shape().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn starts_as_stay_delta() {
        let memory = PolicyMemory::new(3, 4);
        for row in memory.matrix().rows() {
            assert_eq!(row, &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn push_shifts_by_one_row() {
        let mut memory = PolicyMemory::new(3, 2);
        let a = ActionDistribution::one_hot(0, 2).unwrap();
        let b = ActionDistribution::new(vec![0.25, 0.25, 0.25, 0.25], 2).unwrap();

        memory.push(&a);
        let before = memory.matrix().clone();
        memory.push(&b);

        assert_eq!(memory.matrix().row(2), b.as_slice());
        assert_eq!(memory.matrix().row(1), before.row(2));
        assert_eq!(memory.matrix().row(0), before.row(1));
    }

    #[test]
    fn reset_restores_delta() {
        let mut memory = PolicyMemory::new(2, 2);
        memory.push(&ActionDistribution::one_hot(1, 2).unwrap());
        memory.reset();
        assert_eq!(memory, PolicyMemory::new(2, 2));
    }
}
