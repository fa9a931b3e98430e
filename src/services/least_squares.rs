//! Dense linear least squares on top of nalgebra's SVD.
//!
//! Columns are scaled to unit norm before the decomposition; a singular
//! value below `RANK_TOLERANCE` times the largest one marks the system rank
//! deficient and the solve fails rather than returning a minimum-norm vector
//! the caller would mistake for a fit.

use nalgebra::{DMatrix, DVector};

use crate::domain::errors::{DomainError, DomainResult};

const RANK_TOLERANCE: f64 = 1e-10;

/// Minimise `|A c - y|^2` for `c`.
///
/// `design` is `A` with one row per observation; it needs at least as many
/// rows as columns.
pub fn solve(mut design: DMatrix<f64>, y: &DVector<f64>) -> DomainResult<DVector<f64>> {
    let (n, p) = design.shape();
    if n == 0 || n != y.len() {
        return Err(DomainError::FitFailure(format!(
            "design has {n} rows but {} observations",
            y.len()
        )));
    }
    if p == 0 {
        return Err(DomainError::FitFailure("design has no columns".to_string()));
    }
    if n < p {
        return Err(DomainError::FitFailure(format!(
            "{n} observations cannot determine {p} parameters"
        )));
    }

    let mut scale = DVector::zeros(p);
    for (j, mut column) in design.column_iter_mut().enumerate() {
        let norm = column.norm();
        if !norm.is_finite() || norm == 0.0 {
            return Err(DomainError::FitFailure(format!("column {j} is degenerate")));
        }
        column.unscale_mut(norm);
        scale[j] = norm;
    }

    let svd = design.svd(true, true);
    let largest = svd.singular_values.iter().copied().fold(0.0, f64::max);
    let eps = RANK_TOLERANCE * largest;
    let rank = svd.rank(eps);
    if rank < p {
        return Err(DomainError::FitFailure(format!(
            "rank deficient: rank {rank} for {p} parameters"
        )));
    }

    let scaled = svd
        .solve(y, eps)
        .map_err(|e| DomainError::FitFailure(e.to_string()))?;
    let c = scaled.component_div(&scale);
    if c.iter().any(|v| !v.is_finite()) {
        return Err(DomainError::FitFailure("solution is not finite".to_string()));
    }
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design(rows: &[&[f64]]) -> DMatrix<f64> {
        let p = rows[0].len();
        DMatrix::from_fn(rows.len(), p, |i, j| rows[i][j])
    }

    #[test]
    fn test_exact_line() {
        let a = DMatrix::from_fn(5, 2, |i, j| if j == 0 { 1.0 } else { i as f64 });
        let y = DVector::from_fn(5, |i, _| 2.0f64.mul_add(i as f64, 3.0));

        let c = solve(a, &y).unwrap();
        assert!((c[0] - 3.0).abs() < 1e-10);
        assert!((c[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_overdetermined_mean() {
        let a = DMatrix::from_element(4, 1, 1.0);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0, 6.0]);

        let c = solve(a, &y).unwrap();
        assert!((c[0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_columns_fail() {
        let a = design(&[&[1.0, 2.0], &[1.0, 2.0], &[1.0, 2.0]]);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(matches!(solve(a, &y), Err(DomainError::FitFailure(_))));
    }

    #[test]
    fn test_zero_column_fails() {
        let a = design(&[&[1.0, 0.0], &[1.0, 0.0], &[1.0, 0.0]]);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(solve(a, &y).is_err());
    }

    #[test]
    fn test_underdetermined_fails() {
        let a = design(&[&[1.0, 1.0, 1.0]]);
        assert!(solve(a, &DVector::from_vec(vec![1.0])).is_err());
    }

    #[test]
    fn test_mismatched_observations_fail() {
        let a = design(&[&[1.0], &[1.0]]);
        assert!(solve(a, &DVector::from_vec(vec![1.0])).is_err());
    }

    #[test]
    fn test_negative_leading_entry() {
        let a = design(&[&[-1.0, 1.0], &[-1.0, 2.0], &[-1.0, 4.0]]);
        let y = DVector::from_vec(vec![0.0, 1.0, 3.0]);

        let c = solve(a, &y).unwrap();
        // y = x - 1  =>  -1 * c0 = -1
        assert!((c[0] - 1.0).abs() < 1e-10);
        assert!((c[1] - 1.0).abs() < 1e-10);
    }
}
