//! In-process collaboration
//!
//! Holds one local table per peer and runs node methods directly when a task is submitted.
//! Lets the master operations run end to end on a single machine, the same code path as
//! against a remote backend.

use super::{Payload, PeerClient, PeerId, TaskId, TaskStatus};
use crate::error::{CarrierError, Result};
use crate::node;
use crate::table::Table;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Outcome of a task run by the local peers
#[derive(Debug)]
struct LocalTask {
    method: String,
    results: std::result::Result<Vec<Payload>, String>,
}

/// Collaboration of in-process peers
#[derive(Debug)]
pub struct LocalCollaboration {
    /// Peer id -> local data, iterated in id order
    peers: BTreeMap<PeerId, Table>,

    /// Submitted tasks
    tasks: Mutex<HashMap<TaskId, LocalTask>>,

    /// Next task id
    next_task_id: AtomicU64,
}

impl LocalCollaboration {
    pub fn new() -> Self {
        Self {
            peers: BTreeMap::new(),
            tasks: Mutex::new(HashMap::new()),
            next_task_id: AtomicU64::new(1),
        }
    }

    /// Add a peer holding `data`, replacing any peer with the same id
    pub fn with_peer(mut self, id: PeerId, data: Table) -> Self {
        self.peers.insert(id, data);
        self
    }

    pub fn num_peers(&self) -> usize {
        self.peers.len()
    }

    fn tasks(&self) -> Result<MutexGuard<'_, HashMap<TaskId, LocalTask>>> {
        self.tasks
            .lock()
            .map_err(|_| CarrierError::Client("task table lock poisoned".to_string()))
    }

    /// Run `method` on every target, stopping at the first failing peer
    fn run_on_peers(&self, method: &str, target_peers: &[PeerId]) -> std::result::Result<Vec<Payload>, String> {
        target_peers
            .iter()
            .map(|id| {
                let data = &self.peers[id];
                node::run_method(method, data).map_err(|e| format!("peer {} failed: {}", id, e))
            })
            .collect()
    }
}

impl Default for LocalCollaboration {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerClient for LocalCollaboration {
    async fn list_peers_in_collaboration(&self) -> Result<Vec<PeerId>> {
        Ok(self.peers.keys().copied().collect())
    }

    async fn submit_task(&self, method: &str, target_peers: &[PeerId]) -> Result<TaskId> {
        if let Some(unknown) = target_peers.iter().find(|id| !self.peers.contains_key(*id)) {
            return Err(CarrierError::Client(format!(
                "peer {} is not part of the collaboration",
                unknown
            )));
        }

        let task_id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let results = self.run_on_peers(method, target_peers);
        if let Err(ref e) = results {
            warn!(task_id, method, "Local task failed: {}", e);
        } else {
            debug!(task_id, method, peers = target_peers.len(), "Local task finished");
        }

        self.tasks()?.insert(
            task_id,
            LocalTask {
                method: method.to_string(),
                results,
            },
        );

        Ok(task_id)
    }

    async fn get_task_status(&self, task_id: TaskId) -> Result<TaskStatus> {
        // Local peers run synchronously on submit, a known task is always complete
        if self.tasks()?.contains_key(&task_id) {
            Ok(TaskStatus { complete: true })
        } else {
            Err(CarrierError::Client(format!("unknown task {}", task_id)))
        }
    }

    async fn get_task_results(&self, task_id: TaskId) -> Result<Vec<Payload>> {
        // Results are handed out once, the task is forgotten afterwards
        let task = self
            .tasks()?
            .remove(&task_id)
            .ok_or_else(|| CarrierError::Client(format!("unknown task {}", task_id)))?;

        task.results.map_err(|e| {
            CarrierError::Client(format!("task {} ({}) failed: {}", task_id, task.method, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collaboration() -> LocalCollaboration {
        let t1 = Table::from_columns(vec![("id", vec![1.into()]), ("a", vec![10.into()])]).unwrap();
        let t2 = Table::from_columns(vec![("id", vec![1.into()]), ("b", vec![20.into()])]).unwrap();
        LocalCollaboration::new().with_peer(2, t2).with_peer(1, t1)
    }

    #[tokio::test]
    async fn test_lists_peers_in_id_order() {
        let collab = collaboration();
        assert_eq!(collab.list_peers_in_collaboration().await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_runs_method_on_targets_in_order() {
        let collab = collaboration();
        let task = collab.submit_task("column_names", &[2, 1]).await.unwrap();

        assert!(collab.get_task_status(task).await.unwrap().complete);
        let results = collab.get_task_results(task).await.unwrap();
        assert_eq!(
            results,
            vec![
                Payload::ColumnNames(vec!["id".into(), "b".into()]),
                Payload::ColumnNames(vec!["id".into(), "a".into()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_results_are_fetched_once() {
        let collab = collaboration();
        let task = collab.submit_task("get_data", &[1]).await.unwrap();

        assert_eq!(collab.get_task_results(task).await.unwrap().len(), 1);
        assert!(matches!(
            collab.get_task_results(task).await,
            Err(CarrierError::Client(_))
        ));
        assert!(collab.get_task_status(task).await.is_err());
    }

    #[tokio::test]
    async fn test_task_ids_are_unique() {
        let collab = collaboration();
        let first = collab.submit_task("get_data", &[1]).await.unwrap();
        let second = collab.submit_task("get_data", &[1]).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_peer_rejected() {
        let collab = collaboration();
        assert!(matches!(
            collab.submit_task("get_data", &[7]).await,
            Err(CarrierError::Client(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_method_surfaces_on_results() {
        let collab = collaboration();
        let task = collab.submit_task("bogus", &[1]).await.unwrap();
        assert!(matches!(
            collab.get_task_results(task).await,
            Err(CarrierError::Client(_))
        ));
    }
}
