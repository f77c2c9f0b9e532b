use serde::{Deserialize, Serialize};

// ── RegressionResult ──────────────────────────────────────────────────────────

/// Fitted line `y = slope·x + intercept`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; `0.0` when undefined.
    pub r2: f64,
}

impl RegressionResult {
    /// Raw (unclamped, unrounded) value of the line at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Projected count at `x`: negative values clamp to zero, then round.
    pub fn project_count(&self, x: f64) -> u64 {
        self.predict(x).max(0.0).round() as u64
    }

    pub fn is_upward(&self) -> bool {
        self.slope > 0.0
    }
}

// ── Least squares ─────────────────────────────────────────────────────────────

/// Ordinary least-squares fit via the closed-form normal equations.
///
/// * `slope = (nΣxy − ΣxΣy) / (nΣx² − (Σx)²)`
/// * `intercept = (Σy − slope·Σx) / n`
///
/// Degenerate inputs do not fail:
/// * no points → all zero;
/// * all `x` identical (e.g. a single window) → slope `0`, intercept `mean(y)`.
///
/// Only the first `min(xs.len(), ys.len())` pairs are used.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> RegressionResult {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return RegressionResult::default();
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let nf = n as f64;

    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
    let sum_xx: f64 = xs.iter().map(|x| x * x).sum();

    let denominator = nf * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return RegressionResult {
            slope: 0.0,
            intercept: sum_y / nf,
            r2: 0.0,
        };
    }

    let slope = (nf * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / nf;

    let mean_y = sum_y / nf;
    let ss_tot: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    let r2 = if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };

    RegressionResult {
        slope,
        intercept,
        r2,
    }
}

/// Convenience wrapper for evenly spaced series: `x = 0, 1, 2, …`.
pub fn fit_counts(counts: &[u64]) -> RegressionResult {
    let xs: Vec<f64> = (0..counts.len()).map(|i| i as f64).collect();
    let ys: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    linear_regression(&xs, &ys)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
