//! Held-out scoring metrics

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score computed on the held-out partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Mean squared error (lower is better)
    MeanSquaredError,
    /// Fraction of exactly matching predictions (higher is better)
    Accuracy,
}

impl Metric {
    /// Score predictions against the true values
    ///
    /// Returns NaN for empty input.
    pub fn score(&self, y_true: &[f64], y_pred: &[f64]) -> f64 {
        let n = y_true.len().min(y_pred.len());
        if n == 0 {
            return f64::NAN;
        }

        let pairs = y_true.iter().zip(y_pred);
        match self {
            Metric::MeanSquaredError => pairs.map(|(t, p)| (t - p) * (t - p)).sum::<f64>() / n as f64,
            Metric::Accuracy => pairs.filter(|(t, p)| t == p).count() as f64 / n as f64,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::MeanSquaredError => write!(f, "mean_squared_error"),
            Metric::Accuracy => write!(f, "accuracy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_squared_error() {
        assert_eq!(Metric::MeanSquaredError.score(&[1.0, 2.0], &[1.0, 4.0]), 2.0);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(Metric::Accuracy.score(&[0.0, 1.0, 1.0, 2.0], &[0.0, 1.0, 2.0, 2.0]), 0.75);
    }

    #[test]
    fn test_empty_is_nan() {
        assert!(Metric::Accuracy.score(&[], &[]).is_nan());
    }
}
