//! Minimum-cost assignment over the composite separation metric.
//!
//! Backs the opt-in `AssignmentStrategy::Optimal` matching mode. The default
//! greedy pass in `matcher` never calls into this module.

use ndarray::ArrayView2;
use pathfinding::prelude::{kuhn_munkres_min, Matrix};

/// Result of a minimum-cost assignment.
#[derive(Debug, Clone)]
pub struct AssignmentResult {
    /// `(old_idx, new_idx)` pairs.
    pub assignments: Vec<(usize, usize)>,
    /// Old tracks left without a candidate.
    pub unassigned_rows: Vec<usize>,
    /// New detections left without a track.
    pub unassigned_cols: Vec<usize>,
}

/// Kuhn-Munkres solver over a dense cost matrix.
pub struct AssignmentSolver;

impl AssignmentSolver {
    /// Solve the assignment problem, rejecting pairs whose cost is not
    /// finite or exceeds `limit`.
    ///
    /// Rows index old tracks, columns index new detections.
    pub fn solve(cost_matrix: ArrayView2<f64>, limit: f64) -> AssignmentResult {
        let num_rows = cost_matrix.nrows();
        let num_cols = cost_matrix.ncols();

        if num_rows == 0 || num_cols == 0 {
            return AssignmentResult {
                assignments: Vec::new(),
                unassigned_rows: (0..num_rows).collect(),
                unassigned_cols: (0..num_cols).collect(),
            };
        }

        // Integer costs for the pathfinding solver; invalid pairs get a
        // sentinel weight that the threshold filter removes afterwards.
        let scale = 1000.0;
        let invalid = 1_000_000_000i64;
        let size = num_rows.max(num_cols);
        let mut weights = Matrix::new(size, size, invalid);
        for i in 0..num_rows {
            for j in 0..num_cols {
                let cost = cost_matrix[[i, j]];
                if cost.is_finite() && cost <= limit {
                    weights[(i, j)] = (cost * scale) as i64;
                }
            }
        }

        let (_, raw) = kuhn_munkres_min(&weights);

        let assignments: Vec<(usize, usize)> = raw
            .iter()
            .enumerate()
            .filter(|&(i, &j)| i < num_rows && j < num_cols && weights[(i, j)] < invalid)
            .map(|(i, &j)| (i, j))
            .collect();

        let unassigned_rows = (0..num_rows)
            .filter(|&i| !assignments.iter().any(|&(r, _)| r == i))
            .collect();
        let unassigned_cols = (0..num_cols)
            .filter(|&j| !assignments.iter().any(|&(_, c)| c == j))
            .collect();

        AssignmentResult {
            assignments,
            unassigned_rows,
            unassigned_cols,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn picks_the_cheaper_diagonal() {
        let cost = array![[1.0, 10.0], [10.0, 1.0]];
        let result = AssignmentSolver::solve(cost.view(), 100.0);
        assert_eq!(result.assignments, vec![(0, 0), (1, 1)]);
        assert!(result.unassigned_rows.is_empty());
        assert!(result.unassigned_cols.is_empty());
    }

    #[test]
    fn limit_filters_expensive_pairs() {
        let cost = array![[1.0, f64::INFINITY], [50.0, 40.0]];
        let result = AssignmentSolver::solve(cost.view(), 10.0);
        assert_eq!(result.assignments, vec![(0, 0)]);
        assert_eq!(result.unassigned_rows, vec![1]);
        assert_eq!(result.unassigned_cols, vec![1]);
    }

    #[test]
    fn rectangular_matrices_pad_cleanly() {
        let cost = array![[5.0, 1.0, 9.0]];
        let result = AssignmentSolver::solve(cost.view(), 100.0);
        assert_eq!(result.assignments, vec![(0, 1)]);
        assert_eq!(result.unassigned_cols, vec![0, 2]);
    }

    #[test]
    fn global_optimum_beats_greedy_order() {
        // Row 0 slightly prefers col 0, but giving col 0 to row 1 is better
        // overall.
        let cost = array![[1.0, 2.0], [1.5, 100.0]];
        let result = AssignmentSolver::solve(cost.view(), 1000.0);
        assert_eq!(result.assignments, vec![(0, 1), (1, 0)]);
    }
}
