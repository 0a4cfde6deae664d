//! Row-stochastic stage-to-stage transition probabilities.

use serde::Serialize;

use super::EngineError;

/// Amount added to a committed transition's cell before renormalizing.
pub const REINFORCEMENT_INCREMENT: f64 = 0.1;

/// Square matrix of move probabilities indexed by stage position.
///
/// Every row sums to 1. Reinforcement is a heuristic increment followed by
/// renormalization, not a Bayesian posterior update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionMatrix {
    rows: Vec<Vec<f64>>,
}

impl TransitionMatrix {
    /// Uniform prior: every cell is `1 / size`.
    pub fn uniform(size: usize) -> Self {
        let p = if size == 0 { 0.0 } else { 1.0 / size as f64 };
        Self {
            rows: vec![vec![p; size]; size],
        }
    }

    /// Builds a matrix from non-negative weights; each row is normalized.
    ///
    /// Rows must be square, finite, non-negative and have a positive sum.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, EngineError> {
        let size = rows.len();
        let mut normalized = Vec::with_capacity(size);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(EngineError::invalid_row(
                    i,
                    format!("expected {} columns, got {}", size, row.len()),
                ));
            }
            if row.iter().any(|p| !p.is_finite() || *p < 0.0) {
                return Err(EngineError::invalid_row(i, "weights must be finite and non-negative"));
            }
            let sum: f64 = row.iter().sum();
            if sum <= 0.0 {
                return Err(EngineError::invalid_row(i, "weights sum to zero"));
            }
            normalized.push(row.into_iter().map(|p| p / sum).collect());
        }

        Ok(Self { rows: normalized })
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn probability(&self, from: usize, to: usize) -> f64 {
        self.rows[from][to]
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Adds `increment` to `from -> to` and renormalizes row `from`.
    pub fn reinforce(&mut self, from: usize, to: usize, increment: f64) {
        let row = &mut self.rows[from];
        row[to] += increment;
        normalize(row);
    }

    /// Grows the matrix by one stage.
    ///
    /// The new row is uniform at `1 / n`; every existing row gains a `1 / n`
    /// column and is renormalized.
    pub fn grow(&mut self) {
        let size = self.rows.len() + 1;
        let p = 1.0 / size as f64;
        for row in self.rows.iter_mut() {
            row.push(p);
            normalize(row);
        }
        self.rows.push(vec![p; size]);
    }

    /// True when every row sums to 1 within `tolerance`.
    pub fn is_row_stochastic(&self, tolerance: f64) -> bool {
        self.rows
            .iter()
            .all(|row| (row.iter().sum::<f64>() - 1.0).abs() <= tolerance)
    }
}

fn normalize(row: &mut [f64]) {
    let sum: f64 = row.iter().sum();
    if sum > 0.0 {
        row.iter_mut().for_each(|p| *p /= sum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn uniform_matrix_has_equal_cells() {
        let m = TransitionMatrix::uniform(4);
        assert_eq!(m.size(), 4);
        assert!(m.rows().iter().flatten().all(|p| (*p - 0.25).abs() < TOLERANCE));
        assert!(m.is_row_stochastic(TOLERANCE));
    }

    #[test]
    fn from_rows_normalizes_weights() {
        let m = TransitionMatrix::from_rows(vec![vec![1.0, 3.0], vec![2.0, 2.0]]).unwrap();
        assert!((m.probability(0, 1) - 0.75).abs() < TOLERANCE);
        assert!((m.probability(1, 0) - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = TransitionMatrix::from_rows(vec![vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRow { row: 1, .. }));
    }

    #[test]
    fn from_rows_rejects_negative_weights() {
        assert!(TransitionMatrix::from_rows(vec![vec![-1.0, 2.0], vec![1.0, 1.0]]).is_err());
    }

    #[test]
    fn from_rows_rejects_all_zero_row() {
        assert!(TransitionMatrix::from_rows(vec![vec![0.0, 0.0], vec![1.0, 1.0]]).is_err());
    }

    #[test]
    fn reinforce_increases_target_and_keeps_row_stochastic() {
        let mut m = TransitionMatrix::uniform(3);
        let before = m.probability(0, 2);
        m.reinforce(0, 2, REINFORCEMENT_INCREMENT);
        assert!(m.probability(0, 2) > before);
        assert!(m.is_row_stochastic(TOLERANCE));
        // other rows untouched
        assert_eq!(m.row(1), TransitionMatrix::uniform(3).row(1));
    }

    #[test]
    fn grow_adds_uniform_row_and_renormalizes_columns() {
        let mut m = TransitionMatrix::uniform(2);
        m.grow();
        assert_eq!(m.size(), 3);
        assert!(m.row(2).iter().all(|p| (*p - 1.0 / 3.0).abs() < TOLERANCE));
        assert!(m.rows().iter().all(|row| row.len() == 3));
        assert!(m.is_row_stochastic(TOLERANCE));
    }

    #[test]
    fn grow_preserves_relative_weights_of_existing_rows() {
        let mut m = TransitionMatrix::from_rows(vec![vec![3.0, 1.0], vec![1.0, 1.0]]).unwrap();
        m.grow();
        let ratio = m.probability(0, 0) / m.probability(0, 1);
        assert!((ratio - 3.0).abs() < TOLERANCE);
    }

    proptest! {
        #[test]
        fn repeated_reinforcement_stays_row_stochastic(
            size in 1usize..8,
            steps in proptest::collection::vec((0usize..8, 0usize..8), 0..100),
        ) {
            let mut m = TransitionMatrix::uniform(size);
            for (from, to) in steps {
                m.reinforce(from % size, to % size, REINFORCEMENT_INCREMENT);
            }
            prop_assert!(m.is_row_stochastic(1e-9));
        }
    }
}
