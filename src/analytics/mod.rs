//! Master-side analytics operations
//!
//! Each operation is one dispatch round trip followed by an aggregation:
//!
//! - **column_names**: `column_names` on every peer, union of the results
//! - **correlation_matrix**: `get_data` on every peer, inner join, Pearson correlation
//! - **fit_model**: `get_data` on every peer, inner join, seeded split, fit and score
//!
//! The joined table only ever exists inside one call.

pub mod correlation;
pub mod split;

use crate::aggregate::{ensure_min_rows, join_results, union_column_names};
use crate::client::{PeerClient, PeerId};
use crate::config::MasterConfig;
use crate::dispatch::TaskDispatcher;
use crate::error::Result;
use crate::node::{METHOD_COLUMN_NAMES, METHOD_GET_DATA};
use crate::pipeline::{Metric, Pipeline};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info};

pub use correlation::CorrelationMatrix;
pub use split::{train_test_split, Split};

/// Outcome of fitting a pipeline on the joined peer data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Metric the held-out rows were scored with
    pub metric: Metric,

    /// Held-out score
    pub score: f64,

    /// Rows used for fitting
    pub train_rows: usize,

    /// Rows held out for scoring
    pub test_rows: usize,
}

/// Analytics over a collaboration of peers
pub struct Analytics<C: PeerClient> {
    client: C,
    config: MasterConfig,
}

impl<C: PeerClient> Analytics<C> {
    pub fn new(client: C, config: MasterConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn dispatcher(&self) -> TaskDispatcher<'_, C> {
        TaskDispatcher::new(
            &self.client,
            Duration::from_millis(self.config.poll_interval_ms),
        )
    }

    /// Union of the column names of every peer outside `excluded_peers`
    pub async fn column_names(
        &self,
        excluded_peers: &[PeerId],
        max_attempts: u32,
    ) -> Result<BTreeSet<String>> {
        let result = self
            .dispatcher()
            .dispatch(METHOD_COLUMN_NAMES, excluded_peers, max_attempts)
            .await?;

        let names = union_column_names(&result.payloads)?;
        info!(columns = names.len(), "Collected column names");
        Ok(names)
    }

    /// Pearson correlation of every numeric column of the joined peer data
    ///
    /// `join_keys` empty means natural join.
    pub async fn correlation_matrix(
        &self,
        join_keys: &[String],
        max_attempts: u32,
    ) -> Result<CorrelationMatrix> {
        let joined = self.joined_data(join_keys, max_attempts).await?;

        let matrix = correlation::correlation_matrix(&joined);
        info!(
            rows = joined.num_rows(),
            columns = matrix.len(),
            "Computed correlation matrix"
        );
        Ok(matrix)
    }

    /// Fit `pipeline` on the joined peer data and score it on held-out rows
    ///
    /// The held-out rows never reach `Pipeline::fit`. The metric is the configured one,
    /// else the default of the final estimator.
    pub async fn fit_model(
        &self,
        pipeline: &mut Pipeline,
        features: &[String],
        target: &str,
        join_keys: &[String],
        max_attempts: u32,
    ) -> Result<FitReport> {
        // Resolve the metric first so a bad pipeline fails before any dispatch
        let metric = match self.config.metric {
            Some(metric) => metric,
            None => pipeline.default_metric()?,
        };

        let joined = self.joined_data(join_keys, max_attempts).await?;

        let x = joined.numeric_matrix(features)?;
        let y: Vec<f64> = joined
            .numeric_matrix(&[target.to_string()])?
            .into_iter()
            .map(|row| row[0])
            .collect();

        let split = train_test_split(
            joined.num_rows(),
            self.config.test_fraction,
            self.config.split_seed,
        )?;
        debug!(
            train = split.train.len(),
            test = split.test.len(),
            seed = self.config.split_seed,
            "Split joined rows"
        );

        let (x_train, y_train) = select(&x, &y, &split.train);
        let (x_test, y_test) = select(&x, &y, &split.test);

        pipeline.fit(&x_train, &y_train)?;
        let predictions = pipeline.predict(&x_test)?;
        let score = metric.score(&y_test, &predictions);

        info!(
            %metric,
            score,
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            "Fitted model"
        );

        Ok(FitReport {
            metric,
            score,
            train_rows: split.train.len(),
            test_rows: split.test.len(),
        })
    }

    /// Alias of [`Analytics::fit_model`]
    pub async fn train_model(
        &self,
        pipeline: &mut Pipeline,
        features: &[String],
        target: &str,
        join_keys: &[String],
        max_attempts: u32,
    ) -> Result<FitReport> {
        self.fit_model(pipeline, features, target, join_keys, max_attempts)
            .await
    }

    /// Broadcast `get_data`, join the tables and apply the minimum-row guard
    async fn joined_data(&self, join_keys: &[String], max_attempts: u32) -> Result<Table> {
        let result = self
            .dispatcher()
            .dispatch(METHOD_GET_DATA, &[], max_attempts)
            .await?;

        let joined = join_results(result.payloads, join_keys)?;
        ensure_min_rows(&joined, self.config.min_rows)?;

        debug!(
            rows = joined.num_rows(),
            columns = joined.num_columns(),
            "Joined peer data"
        );
        Ok(joined)
    }
}

fn select(x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
    indices.iter().map(|&i| (x[i].clone(), y[i])).unzip()
}
