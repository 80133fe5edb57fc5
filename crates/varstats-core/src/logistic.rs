//! L2-regularized logistic regression.
//!
//! Deterministic full-batch gradient descent: with a handful of material
//! features there is nothing to gain from a stochastic solver, and identical
//! input must produce identical piece values. The step size is derived from
//! the Lipschitz bound of the logistic loss, so the fit needs no tuning.

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Inverse regularization strength (larger = weaker penalty).
    pub cost: f64,
    pub max_iter: usize,
    /// Stop once the gradient norm falls below this.
    pub tolerance: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            cost: 10.0,
            max_iter: 1000,
            tolerance: 1e-8,
        }
    }
}

/// Fitted model: one coefficient per feature column plus an intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    /// Predicted probability of the positive class.
    pub fn predict(&self, row: &[f64]) -> f64 {
        let z = self.intercept
            + row
                .iter()
                .zip(&self.coefficients)
                .map(|(x, w)| x * w)
                .sum::<f64>();
        sigmoid(z)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Fit `labels` (in `[0, 1]`) against `rows`. All rows must have the same
/// width; the intercept is left unpenalized.
pub fn fit(rows: &[Vec<f64>], labels: &[f64], config: &FitConfig) -> Result<LogisticModel> {
    if rows.is_empty() {
        return Err(Error::EmptySample);
    }
    if rows.len() != labels.len() {
        return Err(Error::ShapeMismatch {
            rows: rows.len(),
            labels: labels.len(),
        });
    }
    let width = rows[0].len();
    debug_assert!(rows.iter().all(|r| r.len() == width));

    let n = rows.len() as f64;
    // Mean loss + weights penalty of ||w||^2 / (2 C n), matching a
    // liblinear-style objective with cost C.
    let ridge = 1.0 / (config.cost * n);

    // Constant step size from the curvature bound: the logistic loss has
    // second derivative <= 1/4, so the mean loss is (max ||x||^2 / 4)-smooth.
    let max_norm_sq = rows
        .iter()
        .map(|r| 1.0 + r.iter().map(|x| x * x).sum::<f64>())
        .fold(0.0_f64, f64::max);
    let step = 1.0 / (0.25 * max_norm_sq + ridge);

    let mut weights = vec![0.0; width];
    let mut intercept = 0.0;
    let mut grad = vec![0.0; width];

    for _ in 0..config.max_iter {
        grad.iter_mut().for_each(|g| *g = 0.0);
        let mut grad_intercept = 0.0;
        for (row, &label) in rows.iter().zip(labels) {
            let z = intercept
                + row
                    .iter()
                    .zip(&weights)
                    .map(|(x, w)| x * w)
                    .sum::<f64>();
            let err = sigmoid(z) - label;
            grad_intercept += err;
            for (g, x) in grad.iter_mut().zip(row) {
                *g += err * x;
            }
        }
        grad_intercept /= n;
        let mut norm_sq = grad_intercept * grad_intercept;
        for (g, w) in grad.iter_mut().zip(&weights) {
            *g = *g / n + ridge * w;
            norm_sq += *g * *g;
        }
        for (w, g) in weights.iter_mut().zip(&grad) {
            *w -= step * g;
        }
        intercept -= step * grad_intercept;
        if norm_sq.sqrt() < config.tolerance {
            break;
        }
    }

    Ok(LogisticModel {
        coefficients: weights,
        intercept,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(100.0) > 0.99);
        assert!(sigmoid(-100.0) < 0.01);
    }

    #[test]
    fn test_single_feature_sign() {
        // Material up => win, material down => loss.
        let rows: Vec<Vec<f64>> = vec![vec![1.0], vec![2.0], vec![-1.0], vec![-2.0]];
        let labels = vec![1.0, 1.0, 0.0, 0.0];
        let model = fit(&rows, &labels, &FitConfig::default()).unwrap();
        assert!(model.coefficients[0] > 0.5);
        assert!(model.intercept.abs() < 0.1);
        assert!(model.predict(&[2.0]) > 0.8);
        assert!(model.predict(&[-2.0]) < 0.2);
    }

    #[test]
    fn test_relative_feature_strength() {
        // A queen edge decides more games than a pawn edge in this toy corpus.
        let rows = vec![
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, -1.0],
            vec![-1.0, 0.0],
            vec![-1.0, 0.0],
            vec![-1.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, -1.0],
        ];
        let labels = vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let model = fit(&rows, &labels, &FitConfig::default()).unwrap();
        assert!(model.coefficients[0] > model.coefficients[1]);
        assert!(model.coefficients[1] > 0.0);
    }

    #[test]
    fn test_deterministic() {
        let rows = vec![vec![1.0, 2.0], vec![-2.0, 0.5], vec![0.0, -1.0]];
        let labels = vec![1.0, 0.0, 0.0];
        let a = fit(&rows, &labels, &FitConfig::default()).unwrap();
        let b = fit(&rows, &labels, &FitConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shape_checks() {
        assert!(matches!(
            fit(&[], &[], &FitConfig::default()),
            Err(Error::EmptySample)
        ));
        assert!(matches!(
            fit(&[vec![1.0]], &[1.0, 0.0], &FitConfig::default()),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
