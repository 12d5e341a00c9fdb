//! Allow-listed pipeline steps
//!
//! The step vocabulary is closed: a pipeline can only ever contain the variants of
//! `StepKind`, each constructed here from plain parameter values.
//!
//! | Kind               | Role        | Parameters                          |
//! |--------------------|-------------|-------------------------------------|
//! | `SimpleImputer`    | transformer | `strategy`, `fill_value`            |
//! | `StandardScaler`   | transformer | `with_mean`, `with_std`             |
//! | `LinearRegression` | estimator   | `fit_intercept`                     |
//! | `GaussianNB`       | estimator   | `var_smoothing`                     |
//!
//! All steps work on row-major `f64` matrices with NaN marking a missing value.

use super::metrics::Metric;
use crate::error::{CarrierError, Result};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Step parameters keyed by parameter name
pub type StepParams = BTreeMap<String, JsonValue>;

/// The allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    SimpleImputer,
    StandardScaler,
    LinearRegression,
    GaussianNb,
}

impl StepKind {
    pub const ALL: [StepKind; 4] = [
        StepKind::SimpleImputer,
        StepKind::StandardScaler,
        StepKind::LinearRegression,
        StepKind::GaussianNb,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StepKind::SimpleImputer => "SimpleImputer",
            StepKind::StandardScaler => "StandardScaler",
            StepKind::LinearRegression => "LinearRegression",
            StepKind::GaussianNb => "GaussianNB",
        }
    }

    /// Names of every allowed step kind
    pub fn allowed() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.name()).collect()
    }

    /// Construct a fresh, unfitted step from its own parameters
    pub fn build(&self, params: &StepParams) -> Result<Step> {
        Ok(match self {
            StepKind::SimpleImputer => Step::SimpleImputer(SimpleImputer::from_params(params)?),
            StepKind::StandardScaler => Step::StandardScaler(StandardScaler::from_params(params)?),
            StepKind::LinearRegression => {
                Step::LinearRegression(LinearRegression::from_params(params)?)
            }
            StepKind::GaussianNb => Step::GaussianNb(GaussianNb::from_params(params)?),
        })
    }
}

impl FromStr for StepKind {
    type Err = CarrierError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| CarrierError::DisallowedStep {
                kind: s.to_string(),
                allowed: Self::allowed(),
            })
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A constructed step
#[derive(Debug, Clone)]
pub enum Step {
    SimpleImputer(SimpleImputer),
    StandardScaler(StandardScaler),
    LinearRegression(LinearRegression),
    GaussianNb(GaussianNb),
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::SimpleImputer(_) => StepKind::SimpleImputer,
            Step::StandardScaler(_) => StepKind::StandardScaler,
            Step::LinearRegression(_) => StepKind::LinearRegression,
            Step::GaussianNb(_) => StepKind::GaussianNb,
        }
    }

    /// Full parameter set, defaults included
    pub fn params(&self) -> StepParams {
        match self {
            Step::SimpleImputer(s) => s.params(),
            Step::StandardScaler(s) => s.params(),
            Step::LinearRegression(s) => s.params(),
            Step::GaussianNb(s) => s.params(),
        }
    }

    pub fn is_estimator(&self) -> bool {
        matches!(self, Step::LinearRegression(_) | Step::GaussianNb(_))
    }

    /// Metric used to score this estimator when none is given
    pub fn default_metric(&self) -> Option<Metric> {
        match self {
            Step::LinearRegression(_) => Some(Metric::MeanSquaredError),
            Step::GaussianNb(_) => Some(Metric::Accuracy),
            _ => None,
        }
    }

    /// Fit a transformer and return the transformed training data
    pub fn fit_transform(&mut self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        match self {
            Step::SimpleImputer(s) => {
                s.fit(x);
                s.transform(x)
            }
            Step::StandardScaler(s) => {
                s.fit(x);
                s.transform(x)
            }
            other => Err(CarrierError::InvalidPipeline(format!(
                "{} is an estimator, not a transformer",
                other.kind()
            ))),
        }
    }

    pub fn transform(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        match self {
            Step::SimpleImputer(s) => s.transform(x),
            Step::StandardScaler(s) => s.transform(x),
            other => Err(CarrierError::InvalidPipeline(format!(
                "{} is an estimator, not a transformer",
                other.kind()
            ))),
        }
    }

    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        match self {
            Step::LinearRegression(s) => s.fit(x, y),
            Step::GaussianNb(s) => s.fit(x, y),
            other => Err(CarrierError::InvalidPipeline(format!(
                "{} is a transformer, not an estimator",
                other.kind()
            ))),
        }
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        match self {
            Step::LinearRegression(s) => s.predict(x),
            Step::GaussianNb(s) => s.predict(x),
            other => Err(CarrierError::InvalidPipeline(format!(
                "{} is a transformer, not an estimator",
                other.kind()
            ))),
        }
    }
}

/// Reads typed parameters for one step and rejects unknown ones
struct ParamReader<'a> {
    step: &'static str,
    params: &'a StepParams,
}

impl<'a> ParamReader<'a> {
    fn new(step: &'static str, params: &'a StepParams, known: &[&str]) -> Result<Self> {
        if let Some(unknown) = params.keys().find(|k| !known.contains(&k.as_str())) {
            return Err(CarrierError::InvalidStepParameter {
                step: step.to_string(),
                param: unknown.clone(),
                reason: format!("unknown parameter, expected one of: {}", known.join(", ")),
            });
        }
        Ok(Self { step, params })
    }

    fn invalid(&self, param: &str, reason: &str) -> CarrierError {
        CarrierError::InvalidStepParameter {
            step: self.step.to_string(),
            param: param.to_string(),
            reason: reason.to_string(),
        }
    }

    fn bool(&self, name: &str, default: bool) -> Result<bool> {
        match self.params.get(name) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| self.invalid(name, "expected a boolean")),
        }
    }

    fn f64(&self, name: &str, default: f64) -> Result<f64> {
        match self.params.get(name) {
            None => Ok(default),
            Some(v) => v.as_f64().ok_or_else(|| self.invalid(name, "expected a number")),
        }
    }

    fn opt_f64(&self, name: &str) -> Result<Option<f64>> {
        match self.params.get(name) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or_else(|| self.invalid(name, "expected a number or null")),
        }
    }

    fn string(&self, name: &str, default: &str) -> Result<String> {
        match self.params.get(name) {
            None => Ok(default.to_string()),
            Some(v) => v
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| self.invalid(name, "expected a string")),
        }
    }
}

fn num_columns(x: &[Vec<f64>]) -> usize {
    x.first().map(Vec::len).unwrap_or(0)
}

/// Non-missing values of one column
fn present(x: &[Vec<f64>], col: usize) -> Vec<f64> {
    x.iter().map(|row| row[col]).filter(|v| !v.is_nan()).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance
fn variance(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64
}

fn check_width(x: &[Vec<f64>], expected: usize, step: &'static str) -> Result<()> {
    if let Some(row) = x.iter().find(|row| row.len() != expected) {
        return Err(CarrierError::InvalidPipeline(format!(
            "{} fitted on {} features, got {}",
            step,
            expected,
            row.len()
        )));
    }
    Ok(())
}

fn check_complete(x: &[Vec<f64>], step: &'static str) -> Result<()> {
    if x.iter().flatten().any(|v| v.is_nan()) {
        return Err(CarrierError::InvalidPipeline(format!(
            "{} input contains missing values, add a SimpleImputer before it",
            step
        )));
    }
    Ok(())
}

/// Imputation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImputeStrategy {
    Mean,
    Median,
    MostFrequent,
    Constant,
}

impl ImputeStrategy {
    fn name(&self) -> &'static str {
        match self {
            ImputeStrategy::Mean => "mean",
            ImputeStrategy::Median => "median",
            ImputeStrategy::MostFrequent => "most_frequent",
            ImputeStrategy::Constant => "constant",
        }
    }
}

/// Replaces missing values with a per-column statistic learned at fit time
#[derive(Debug, Clone)]
pub struct SimpleImputer {
    pub strategy: ImputeStrategy,
    pub fill_value: Option<f64>,
    statistics: Option<Vec<f64>>,
}

impl SimpleImputer {
    const NAME: &'static str = "SimpleImputer";

    pub fn new(strategy: ImputeStrategy, fill_value: Option<f64>) -> Self {
        Self {
            strategy,
            fill_value,
            statistics: None,
        }
    }

    fn from_params(params: &StepParams) -> Result<Self> {
        let reader = ParamReader::new(Self::NAME, params, &["strategy", "fill_value"])?;
        let strategy = match reader.string("strategy", "mean")?.as_str() {
            "mean" => ImputeStrategy::Mean,
            "median" => ImputeStrategy::Median,
            "most_frequent" => ImputeStrategy::MostFrequent,
            "constant" => ImputeStrategy::Constant,
            _ => {
                return Err(reader.invalid(
                    "strategy",
                    "expected one of: mean, median, most_frequent, constant",
                ))
            }
        };
        Ok(Self::new(strategy, reader.opt_f64("fill_value")?))
    }

    fn params(&self) -> StepParams {
        let mut params = StepParams::new();
        params.insert("strategy".into(), JsonValue::from(self.strategy.name()));
        params.insert(
            "fill_value".into(),
            self.fill_value.map(JsonValue::from).unwrap_or(JsonValue::Null),
        );
        params
    }

    fn fit(&mut self, x: &[Vec<f64>]) {
        let statistics = (0..num_columns(x))
            .map(|col| {
                let values = present(x, col);
                let fallback = self.fill_value.unwrap_or(0.0);
                // Columns without any observed value are filled with the fallback
                if values.is_empty() {
                    return fallback;
                }
                match self.strategy {
                    ImputeStrategy::Mean => mean(&values),
                    ImputeStrategy::Median => median(values),
                    ImputeStrategy::MostFrequent => most_frequent(values),
                    ImputeStrategy::Constant => fallback,
                }
            })
            .collect();
        self.statistics = Some(statistics);
    }

    fn transform(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let statistics = self.statistics.as_ref().ok_or(CarrierError::NotFitted(Self::NAME))?;
        check_width(x, statistics.len(), Self::NAME)?;

        Ok(x.iter()
            .map(|row| {
                row.iter()
                    .zip(statistics)
                    .map(|(v, s)| if v.is_nan() { *s } else { *v })
                    .collect()
            })
            .collect())
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Most frequent value, smallest on ties
fn most_frequent(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let mut best = values[0];
    let mut best_count = 0;
    let mut i = 0;
    while i < values.len() {
        let j = values[i..].iter().position(|v| *v != values[i]).map_or(values.len(), |p| i + p);
        if j - i > best_count {
            best = values[i];
            best_count = j - i;
        }
        i = j;
    }
    best
}

/// Centers and scales each column
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub with_mean: bool,
    pub with_std: bool,
    /// Per-column (mean, scale)
    fitted: Option<Vec<(f64, f64)>>,
}

impl StandardScaler {
    const NAME: &'static str = "StandardScaler";

    pub fn new(with_mean: bool, with_std: bool) -> Self {
        Self {
            with_mean,
            with_std,
            fitted: None,
        }
    }

    fn from_params(params: &StepParams) -> Result<Self> {
        let reader = ParamReader::new(Self::NAME, params, &["with_mean", "with_std"])?;
        Ok(Self::new(reader.bool("with_mean", true)?, reader.bool("with_std", true)?))
    }

    fn params(&self) -> StepParams {
        let mut params = StepParams::new();
        params.insert("with_mean".into(), JsonValue::from(self.with_mean));
        params.insert("with_std".into(), JsonValue::from(self.with_std));
        params
    }

    fn fit(&mut self, x: &[Vec<f64>]) {
        let fitted = (0..num_columns(x))
            .map(|col| {
                let values = present(x, col);
                if values.is_empty() {
                    return (0.0, 1.0);
                }
                let m = mean(&values);
                let std = variance(&values, m).sqrt();
                let center = if self.with_mean { m } else { 0.0 };
                // Constant columns are left unscaled
                let scale = if self.with_std && std > 0.0 { std } else { 1.0 };
                (center, scale)
            })
            .collect();
        self.fitted = Some(fitted);
    }

    fn transform(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let fitted = self.fitted.as_ref().ok_or(CarrierError::NotFitted(Self::NAME))?;
        check_width(x, fitted.len(), Self::NAME)?;

        Ok(x.iter()
            .map(|row| {
                row.iter()
                    .zip(fitted)
                    .map(|(v, (center, scale))| (v - center) / scale)
                    .collect()
            })
            .collect())
    }
}

/// Ordinary least squares
#[derive(Debug, Clone)]
pub struct LinearRegression {
    pub fit_intercept: bool,
    /// (coefficients, intercept)
    fitted: Option<(Vec<f64>, f64)>,
}

impl LinearRegression {
    const NAME: &'static str = "LinearRegression";

    pub fn new(fit_intercept: bool) -> Self {
        Self {
            fit_intercept,
            fitted: None,
        }
    }

    fn from_params(params: &StepParams) -> Result<Self> {
        let reader = ParamReader::new(Self::NAME, params, &["fit_intercept"])?;
        Ok(Self::new(reader.bool("fit_intercept", true)?))
    }

    fn params(&self) -> StepParams {
        let mut params = StepParams::new();
        params.insert("fit_intercept".into(), JsonValue::from(self.fit_intercept));
        params
    }

    /// Fitted coefficients and intercept
    pub fn coefficients(&self) -> Option<(&[f64], f64)> {
        self.fitted.as_ref().map(|(c, i)| (c.as_slice(), *i))
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        check_complete(x, Self::NAME)?;
        if y.iter().any(|v| v.is_nan()) {
            return Err(CarrierError::InvalidPipeline("target contains missing values".into()));
        }
        if x.is_empty() {
            return Err(CarrierError::InsufficientData { rows: 0, min: 1 });
        }

        let p = num_columns(x);
        let (x_mean, y_mean) = if self.fit_intercept {
            let x_mean = (0..p).map(|c| mean(&present(x, c))).collect::<Vec<_>>();
            (x_mean, mean(y))
        } else {
            (vec![0.0; p], 0.0)
        };

        // Normal equations on centered data: (XᵀX) b = Xᵀy
        let mut a = vec![vec![0.0; p]; p];
        let mut b = vec![0.0; p];
        for (row, target) in x.iter().zip(y) {
            let xc: Vec<f64> = row.iter().zip(&x_mean).map(|(v, m)| v - m).collect();
            let yc = target - y_mean;
            for i in 0..p {
                b[i] += xc[i] * yc;
                for j in 0..p {
                    a[i][j] += xc[i] * xc[j];
                }
            }
        }

        let coef = solve_least_squares(a, b);
        let intercept = y_mean - coef.iter().zip(&x_mean).map(|(c, m)| c * m).sum::<f64>();
        self.fitted = Some((coef, intercept));
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let (coef, intercept) = self.fitted.as_ref().ok_or(CarrierError::NotFitted(Self::NAME))?;
        check_width(x, coef.len(), Self::NAME)?;
        check_complete(x, Self::NAME)?;

        Ok(x.iter()
            .map(|row| intercept + row.iter().zip(coef).map(|(v, c)| v * c).sum::<f64>())
            .collect())
    }
}

/// Gauss-Jordan elimination with partial pivoting
///
/// Columns without a usable pivot (rank deficiency) get a zero coefficient.
fn solve_least_squares(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    let scale = (0..n).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    let eps = if scale > 0.0 { scale * 1e-10 } else { 1e-12 };

    let mut pivots = Vec::new();
    let mut row = 0;
    for col in 0..n {
        if row == n {
            break;
        }
        let best = (row..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(row);
        if a[best][col].abs() <= eps {
            continue;
        }
        a.swap(row, best);
        b.swap(row, best);

        for other in 0..n {
            if other == row {
                continue;
            }
            let factor = a[other][col] / a[row][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[other][k] -= factor * a[row][k];
            }
            b[other] -= factor * b[row];
        }

        pivots.push((row, col));
        row += 1;
    }

    let mut solution = vec![0.0; n];
    for (r, c) in pivots {
        solution[c] = b[r] / a[r][c];
    }
    solution
}

/// Gaussian naive Bayes classifier
#[derive(Debug, Clone)]
pub struct GaussianNb {
    pub var_smoothing: f64,
    fitted: Option<GaussianNbModel>,
}

#[derive(Debug, Clone)]
struct GaussianNbModel {
    classes: Vec<f64>,
    log_priors: Vec<f64>,
    means: Vec<Vec<f64>>,
    variances: Vec<Vec<f64>>,
}

impl GaussianNb {
    const NAME: &'static str = "GaussianNB";

    pub fn new(var_smoothing: f64) -> Self {
        Self {
            var_smoothing,
            fitted: None,
        }
    }

    fn from_params(params: &StepParams) -> Result<Self> {
        let reader = ParamReader::new(Self::NAME, params, &["var_smoothing"])?;
        let var_smoothing = reader.f64("var_smoothing", 1e-9)?;
        if var_smoothing < 0.0 {
            return Err(reader.invalid("var_smoothing", "must not be negative"));
        }
        Ok(Self::new(var_smoothing))
    }

    fn params(&self) -> StepParams {
        let mut params = StepParams::new();
        params.insert("var_smoothing".into(), JsonValue::from(self.var_smoothing));
        params
    }

    /// Class labels seen at fit time, ascending
    pub fn classes(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|m| m.classes.as_slice())
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        check_complete(x, Self::NAME)?;
        if y.iter().any(|v| v.is_nan()) {
            return Err(CarrierError::InvalidPipeline("target contains missing values".into()));
        }
        if x.is_empty() {
            return Err(CarrierError::InsufficientData { rows: 0, min: 1 });
        }

        let p = num_columns(x);
        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(f64::total_cmp);
        classes.dedup();

        let max_variance = (0..p)
            .map(|c| {
                let values = present(x, c);
                variance(&values, mean(&values))
            })
            .fold(0.0, f64::max);
        // Keep variances strictly positive even for constant features
        let epsilon = (self.var_smoothing * max_variance).max(f64::EPSILON);

        let mut log_priors = Vec::with_capacity(classes.len());
        let mut means = Vec::with_capacity(classes.len());
        let mut variances = Vec::with_capacity(classes.len());

        for class in &classes {
            let members: Vec<&Vec<f64>> = x.iter().zip(y).filter(|(_, t)| *t == class).map(|(r, _)| r).collect();
            log_priors.push((members.len() as f64 / y.len() as f64).ln());

            let class_means: Vec<f64> = (0..p)
                .map(|c| members.iter().map(|r| r[c]).sum::<f64>() / members.len() as f64)
                .collect();
            let class_vars: Vec<f64> = (0..p)
                .map(|c| {
                    members.iter().map(|r| (r[c] - class_means[c]).powi(2)).sum::<f64>()
                        / members.len() as f64
                        + epsilon
                })
                .collect();

            means.push(class_means);
            variances.push(class_vars);
        }

        self.fitted = Some(GaussianNbModel {
            classes,
            log_priors,
            means,
            variances,
        });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let model = self.fitted.as_ref().ok_or(CarrierError::NotFitted(Self::NAME))?;
        check_width(x, model.means.first().map(Vec::len).unwrap_or(0), Self::NAME)?;
        check_complete(x, Self::NAME)?;

        Ok(x.iter()
            .map(|row| {
                let mut best = (f64::NEG_INFINITY, model.classes[0]);
                for k in 0..model.classes.len() {
                    let log_likelihood: f64 = row
                        .iter()
                        .zip(&model.means[k])
                        .zip(&model.variances[k])
                        .map(|((v, m), var)| {
                            -0.5 * (2.0 * std::f64::consts::PI * var).ln() - (v - m).powi(2) / (2.0 * var)
                        })
                        .sum();
                    let score = model.log_priors[k] + log_likelihood;
                    if score > best.0 {
                        best = (score, model.classes[k]);
                    }
                }
                best.1
            })
            .collect())
    }
}
