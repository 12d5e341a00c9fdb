//! Pearson correlation over the numeric columns of a table

use crate::table::Table;
use serde::{Deserialize, Serialize};

/// Square correlation matrix labelled by column name
///
/// Undefined entries (fewer than two complete pairs, zero variance) are NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Correlation between two named columns
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Columns whose non-missing values are all numeric (or boolean), with at least one value
pub fn numeric_columns(table: &Table) -> Vec<String> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let mut values = table.rows().iter().map(|row| &row[*i]).filter(|v| !v.is_missing()).peekable();
            values.peek().is_some() && values.all(|v| v.is_numeric())
        })
        .map(|(_, name)| name.clone())
        .collect()
}

/// Pairwise Pearson correlation of every numeric column
pub fn correlation_matrix(table: &Table) -> CorrelationMatrix {
    let columns = numeric_columns(table);
    let data: Vec<Vec<f64>> = columns
        .iter()
        .map(|name| {
            let idx = table.column_index(name).unwrap_or_default();
            table
                .rows()
                .iter()
                .map(|row| row[idx].as_f64().unwrap_or(f64::NAN))
                .collect()
        })
        .collect();

    let n = columns.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&data[i], &data[j]);
            // The diagonal is exactly 1 wherever the column varies
            let r = if i == j && !r.is_nan() { 1.0 } else { r };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix { columns, values }
}

/// Pearson correlation over pairwise-complete observations
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .collect();

    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let divisor = (sxx * syy).sqrt();
    if divisor == 0.0 {
        return f64::NAN;
    }

    (sxy / divisor).clamp(-1.0, 1.0)
}
