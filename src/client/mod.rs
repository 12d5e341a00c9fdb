//! Peer coordination client
//!
//! The master never talks to peers directly. It goes through a `PeerClient`, an opaque
//! capability that can enumerate the peers of a collaboration, submit a task to some of
//! them, report whether the task is complete and hand back the per-peer results.
//!
//! # Implementations
//!
//! - `local::LocalCollaboration`: in-process peers, each holding a local table
//! - `mock::MockClient`: scripted responses with call recording, for tests

pub mod local;
pub mod mock;

use crate::error::Result;
use crate::table::Table;
use serde::{Deserialize, Serialize};

pub use local::LocalCollaboration;
pub use mock::MockClient;

/// Peer identifier within a collaboration
pub type PeerId = u64;

/// Task identifier assigned by the coordination backend
pub type TaskId = u64;

/// One peer's answer to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Flat list of column names (schema discovery)
    ColumnNames(Vec<String>),
    /// Tabular relation
    Table(Table),
}

impl Payload {
    /// Short name of the payload shape, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::ColumnNames(_) => "column names",
            Payload::Table(_) => "table",
        }
    }
}

/// Completion state of a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskStatus {
    pub complete: bool,
}

/// A task as submitted: method plus target peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub method: String,
    pub target_peers: Vec<PeerId>,
}

/// Capability to run tasks on the peers of a collaboration
///
/// Exactly the four operations the dispatcher needs. Backend failures are reported as
/// `CarrierError::Client`.
#[allow(async_fn_in_trait)]
pub trait PeerClient {
    /// All peers in the caller's collaboration, the caller's own peer included
    async fn list_peers_in_collaboration(&self) -> Result<Vec<PeerId>>;

    /// Create a task running `method` on `target_peers`
    async fn submit_task(&self, method: &str, target_peers: &[PeerId]) -> Result<TaskId>;

    /// Current completion state of a task
    async fn get_task_status(&self, task_id: TaskId) -> Result<TaskStatus>;

    /// Per-peer results, in target order
    async fn get_task_results(&self, task_id: TaskId) -> Result<Vec<Payload>>;
}
