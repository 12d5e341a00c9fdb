//! Pipeline reconstruction
//!
//! Pipelines arrive from outside as a description: an ordered list of named steps plus a
//! flat parameter map whose keys look like `<step name>__<param>`. Nothing in the
//! description is executed as-is. Instead the pipeline is rebuilt from scratch:
//!
//! ```text
//! INPUT -> EXTRACT -> VALIDATE -> REBUILD -> OUTPUT
//!            |           |           |
//!            |           |           +-- fresh step per entry, own params only
//!            |           +-- every kind checked against the allow-list first
//!            +-- composite keys split on the first "__", grouped by step
//! ```
//!
//! A single disallowed kind aborts the whole reconstruction, so no partially built
//! pipeline ever exists.
//!
//! # Example
//!
//! ```
//! use fedcarrier::pipeline::{reconstruct_pipeline, PipelineDescription};
//!
//! let description: PipelineDescription = serde_json::from_str(r#"{
//!     "steps": [
//!         {"name": "standardscaler", "kind": "StandardScaler"},
//!         {"name": "linearregression", "kind": "LinearRegression"}
//!     ],
//!     "params": {"standardscaler__with_mean": false}
//! }"#).unwrap();
//!
//! let pipeline = reconstruct_pipeline(&description).unwrap();
//! assert_eq!(pipeline.len(), 2);
//! assert_eq!(pipeline.params()["standardscaler__with_mean"], serde_json::json!(false));
//! ```

pub mod metrics;
pub mod steps;

use crate::error::{CarrierError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

pub use metrics::Metric;
pub use steps::{Step, StepKind, StepParams};

/// Separator between step name and parameter name in composite keys
pub const PARAM_SEPARATOR: &str = "__";

/// One entry of a pipeline description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDescription {
    /// Name of the step within the pipeline
    pub name: String,
    /// Step kind, checked against the allow-list
    pub kind: String,
}

/// Externally supplied pipeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineDescription {
    pub steps: Vec<StepDescription>,

    /// Flat parameters; composite keys are routed to steps, the rest are ignored
    #[serde(default)]
    pub params: BTreeMap<String, JsonValue>,
}

/// Rebuild a description into a pipeline of trusted, freshly constructed steps
pub fn reconstruct_pipeline(description: &PipelineDescription) -> Result<Pipeline> {
    // VALIDATE before anything else looks at the description
    let kinds = description
        .steps
        .iter()
        .map(|step| step.kind.parse::<StepKind>())
        .collect::<Result<Vec<_>>>()?;

    // EXTRACT
    let mut step_params = split_step_params(&description.params);

    let mut names = HashSet::new();
    for step in &description.steps {
        if !names.insert(step.name.as_str()) {
            return Err(CarrierError::InvalidPipeline(format!(
                "duplicate step name '{}'",
                step.name
            )));
        }
    }
    if let Some(orphan) = step_params.keys().find(|name| !names.contains(name.as_str())) {
        return Err(CarrierError::InvalidPipeline(format!(
            "parameters given for unknown step '{}'",
            orphan
        )));
    }

    // REBUILD
    let mut steps = Vec::with_capacity(kinds.len());
    for (step, kind) in description.steps.iter().zip(kinds) {
        let params = step_params.remove(&step.name).unwrap_or_default();
        debug!(step = %step.name, %kind, params = params.len(), "Rebuilding step");
        steps.push((step.name.clone(), kind.build(&params)?));
    }

    Ok(Pipeline::new(steps))
}

/// Group composite `<step>__<param>` keys by step name
///
/// Keys without the separator are pipeline-level and dropped. Only the first separator
/// splits, so nested keys stay with the outer step.
pub fn split_step_params(params: &BTreeMap<String, JsonValue>) -> BTreeMap<String, StepParams> {
    let mut grouped: BTreeMap<String, StepParams> = BTreeMap::new();

    for (key, value) in params {
        if let Some((step, param)) = key.split_once(PARAM_SEPARATOR) {
            grouped
                .entry(step.to_string())
                .or_default()
                .insert(param.to_string(), value.clone());
        }
    }

    grouped
}

/// Ordered sequence of named steps; transformers first, one estimator last
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<(String, Step)>,
}

impl Pipeline {
    pub fn new(steps: Vec<(String, Step)>) -> Self {
        Self { steps }
    }

    /// Build a pipeline naming each step after its lowercased kind
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self::new(
            steps
                .into_iter()
                .map(|s| (s.kind().name().to_lowercase(), s))
                .collect(),
        )
    }

    pub fn steps(&self) -> &[(String, Step)] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step-scoped parameters as composite `<step>__<param>` keys
    pub fn params(&self) -> BTreeMap<String, JsonValue> {
        self.steps
            .iter()
            .flat_map(|(name, step)| {
                step.params()
                    .into_iter()
                    .map(move |(param, value)| (format!("{}{}{}", name, PARAM_SEPARATOR, param), value))
            })
            .collect()
    }

    /// Describe the pipeline in the same form it can be rebuilt from
    pub fn describe(&self) -> PipelineDescription {
        PipelineDescription {
            steps: self
                .steps
                .iter()
                .map(|(name, step)| StepDescription {
                    name: name.clone(),
                    kind: step.kind().name().to_string(),
                })
                .collect(),
            params: self.params(),
        }
    }

    /// Metric of the final estimator
    pub fn default_metric(&self) -> Result<Metric> {
        self.estimator()?
            .default_metric()
            .ok_or_else(|| CarrierError::InvalidPipeline("final step has no metric".into()))
    }

    fn estimator(&self) -> Result<&Step> {
        self.check_shape()?;
        self.steps
            .last()
            .map(|(_, step)| step)
            .ok_or_else(|| CarrierError::InvalidPipeline("pipeline has no steps".into()))
    }

    fn check_shape(&self) -> Result<()> {
        let Some(((last_name, last), rest)) = self.steps.split_last() else {
            return Err(CarrierError::InvalidPipeline("pipeline has no steps".into()));
        };
        if !last.is_estimator() {
            return Err(CarrierError::InvalidPipeline(format!(
                "final step '{}' ({}) is not an estimator",
                last_name,
                last.kind()
            )));
        }
        if let Some((name, step)) = rest.iter().find(|(_, s)| s.is_estimator()) {
            return Err(CarrierError::InvalidPipeline(format!(
                "intermediate step '{}' ({}) is not a transformer",
                name,
                step.kind()
            )));
        }
        Ok(())
    }

    /// Fit every transformer in order, then the estimator on the transformed data
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.check_shape()?;
        if x.len() != y.len() {
            return Err(CarrierError::InvalidPipeline(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }

        let width = x.first().map(Vec::len).unwrap_or(0);
        if let Some((row, values)) = x.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(CarrierError::InvalidPipeline(format!(
                "row {} has {} features, expected {}",
                row,
                values.len(),
                width
            )));
        }

        let ((estimator_name, estimator), transformers) = self
            .steps
            .split_last_mut()
            .ok_or_else(|| CarrierError::InvalidPipeline("pipeline has no steps".into()))?;

        let mut data = x.to_vec();
        for (name, step) in transformers.iter_mut() {
            debug!(step = %name, "Fitting transformer");
            data = step.fit_transform(&data)?;
        }

        debug!(step = %estimator_name, rows = data.len(), "Fitting estimator");
        estimator.fit(&data, y)
    }

    /// Transform with every fitted transformer, then predict
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let estimator = self.estimator()?;

        let mut data = x.to_vec();
        for (_, step) in &self.steps[..self.steps.len() - 1] {
            data = step.transform(&data)?;
        }

        estimator.predict(&data)
    }
}
