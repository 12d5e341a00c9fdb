//! fedcarrier - federated analytics master
//!
//! A master process asks every peer of a collaboration to run one named method on its
//! local data, waits until all peers are done, then combines the partial results into
//! one answer.
//!
//! # Architecture
//!
//! - **Peer client**: narrow async trait over the coordination backend (`client`)
//! - **Dispatch**: submit a task and poll it to completion with bounded retries (`dispatch`)
//! - **Aggregation**: union of column names, multi-key inner join of tables (`aggregate`)
//! - **Analytics**: column names, correlation matrix, model fitting (`analytics`)
//! - **Pipelines**: allow-list reconstruction of declarative learning pipelines (`pipeline`)
//! - **Identifier hashing**: salted SHA-512 of personal identifiers (`encryption`)

pub mod aggregate;
pub mod analytics;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod encryption;
pub mod error;
pub mod node;
pub mod output;
pub mod pipeline;
pub mod table;
pub mod util;

// Re-export commonly used types
pub use analytics::{Analytics, CorrelationMatrix, FitReport};
pub use client::{LocalCollaboration, Payload, PeerClient, PeerId, TaskId};
pub use config::Config;
pub use dispatch::{TaskDispatcher, TaskResult};
pub use error::{CarrierError, Result};
pub use pipeline::{reconstruct_pipeline, Pipeline, PipelineDescription};
pub use table::{Table, Value};
