//! Error types
//!
//! Every master-side operation either returns a complete aggregate or fails with one of
//! these errors. Nothing is retried here except the completion poll in the dispatcher.

use crate::client::{PeerId, TaskId};
use thiserror::Error;

/// Result type used throughout fedcarrier
pub type Result<T> = std::result::Result<T, CarrierError>;

/// Errors raised by dispatch, aggregation, analytics and pipeline reconstruction
#[derive(Debug, Error)]
pub enum CarrierError {
    /// Peer task did not complete within the retry budget
    #[error("task timeout for method '{method}' (task id: {task_id}, attempts: {attempts})")]
    TaskTimeout {
        task_id: TaskId,
        method: String,
        attempts: u32,
    },

    /// Every peer was excluded, there is nobody to send the task to
    #[error("no peers left to dispatch '{method}' to (excluded: {excluded:?})")]
    NoPeers { method: String, excluded: Vec<PeerId> },

    /// A requested join or identifier key is absent from a table
    #[error("key '{key}' not found in table {table}")]
    MissingJoinKey { key: String, table: usize },

    /// Natural join found nothing to join on
    #[error("tables {left} and {right} have no columns in common to join on")]
    NoCommonColumns { left: usize, right: usize },

    /// An identifier column holds a missing value
    #[error("identifier column '{column}' has a missing value in row {row}")]
    NullIdentifierValue { column: String, row: usize },

    /// Pipeline step kind outside the allow-list
    #[error("step '{kind}' is not allowed, allowed steps: {}", .allowed.join(", "))]
    DisallowedStep {
        kind: String,
        allowed: Vec<&'static str>,
    },

    /// Joined data is too small to compute anything meaningful
    #[error("insufficient data: {rows} rows, at least {min} required")]
    InsufficientData { rows: usize, min: usize },

    /// Table is malformed (duplicate column, ragged row)
    #[error("invalid table: {0}")]
    InvalidTable(String),

    /// Peer returned a payload of the wrong shape for the method
    #[error("unexpected payload from peer result {index}: expected {expected}, got {found}")]
    UnexpectedPayload {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// Column requested by an operation is absent from the joined table
    #[error("column '{0}' not found")]
    MissingColumn(String),

    /// Column requested as numeric input holds a non-numeric value
    #[error("column '{column}' holds a non-numeric value in row {row}")]
    NonNumericColumn { column: String, row: usize },

    /// Salt is not exactly 128 characters
    #[error("salt must be 128 characters long, got {0}")]
    InvalidSalt(usize),

    /// Pipeline step parameter is unknown or has the wrong type
    #[error("invalid parameter '{param}' for step '{step}': {reason}")]
    InvalidStepParameter {
        step: String,
        param: String,
        reason: String,
    },

    /// Pipeline cannot be fitted as described
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// Predict or transform called before fit
    #[error("step '{0}' used before it was fitted")]
    NotFitted(&'static str),

    /// Node asked to run a method it does not provide
    #[error("unknown node method '{0}'")]
    UnknownMethod(String),

    /// Peer coordination backend failure
    #[error("peer client error: {0}")]
    Client(String),
}
