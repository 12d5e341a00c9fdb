//! Task dispatch
//!
//! The dispatcher is the master's half of the peer protocol:
//!
//! ```text
//! Master                        Backend / Peers
//!   |                                 |
//!   |---- list peers ---------------->|
//!   |<--- [1, 2, 3] ------------------|
//!   |                                 |
//!   |---- submit(method, [2, 3]) ---->|   peers run `method` locally
//!   |<--- task id --------------------|
//!   |                                 |
//!   |---- status(task id) ----------->|   repeated, one poll interval apart,
//!   |<--- {complete} -----------------|   at most `max_attempts` times
//!   |                                 |
//!   |---- results(task id) ---------->|
//!   |<--- [payload 2, payload 3] -----|
//! ```
//!
//! The call blocks (asynchronously) for the whole round trip and does no work on the
//! payloads. A task that is still incomplete after the last attempt is a `TaskTimeout`;
//! the results of such a task are never fetched.

use crate::client::{Payload, PeerClient, PeerId, TaskId};
use crate::error::{CarrierError, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Results of one completed task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    /// Backend task id
    pub task_id: TaskId,

    /// Method the peers ran
    pub method: String,

    /// One payload per targeted peer, in backend order
    pub payloads: Vec<Payload>,
}

/// Submits a task to a set of peers and waits for it to complete
pub struct TaskDispatcher<'a, C: PeerClient> {
    client: &'a C,

    /// Wait between two status polls
    poll_interval: Duration,
}

impl<'a, C: PeerClient> TaskDispatcher<'a, C> {
    pub fn new(client: &'a C, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    /// Run `method` on every peer of the collaboration except `excluded_peers`
    ///
    /// Polls completion at most `max_attempts` times. The first complete poll ends the
    /// wait without sleeping again.
    pub async fn dispatch(
        &self,
        method: &str,
        excluded_peers: &[PeerId],
        max_attempts: u32,
    ) -> Result<TaskResult> {
        let peers = self.client.list_peers_in_collaboration().await?;
        let targets = target_peers(&peers, excluded_peers);
        if targets.is_empty() {
            return Err(CarrierError::NoPeers {
                method: method.to_string(),
                excluded: excluded_peers.to_vec(),
            });
        }

        info!(method, targets = ?targets, "Dispatching node tasks");
        let task_id = self.client.submit_task(method, &targets).await?;

        info!(task_id, "Waiting for results");
        self.wait_for_completion(task_id, method, max_attempts).await?;

        info!(task_id, "Obtaining results");
        let payloads = self.client.get_task_results(task_id).await?;

        Ok(TaskResult {
            task_id,
            method: method.to_string(),
            payloads,
        })
    }

    /// Poll until complete or out of attempts
    async fn wait_for_completion(&self, task_id: TaskId, method: &str, max_attempts: u32) -> Result<()> {
        for attempt in 1..=max_attempts {
            let status = self.client.get_task_status(task_id).await?;
            if status.complete {
                debug!(task_id, attempt, "Task complete");
                return Ok(());
            }

            // No wait after the final attempt
            if attempt < max_attempts {
                debug!(task_id, attempt, max_attempts, "Task not complete yet");
                sleep(self.poll_interval).await;
            }
        }

        Err(CarrierError::TaskTimeout {
            task_id,
            method: method.to_string(),
            attempts: max_attempts,
        })
    }
}

/// All peers minus the excluded ones, collaboration order preserved
pub fn target_peers(peers: &[PeerId], excluded: &[PeerId]) -> Vec<PeerId> {
    peers
        .iter()
        .copied()
        .filter(|id| !excluded.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{Completion, MockClient};

    const TRIES: u32 = 1;

    fn client() -> MockClient {
        let client = MockClient::new();
        client.set_peers(vec![1, 2, 3]);
        client.set_results(vec![Payload::ColumnNames(vec!["column1".into()])]);
        client
    }

    #[test]
    fn test_target_peers_excludes() {
        assert_eq!(target_peers(&[1, 2, 3], &[1]), vec![2, 3]);
        assert_eq!(target_peers(&[1, 2, 3], &[]), vec![1, 2, 3]);
        assert_eq!(target_peers(&[1, 2, 3], &[4]), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_dispatch_broadcasts_by_default() {
        let client = client();
        let dispatcher = TaskDispatcher::new(&client, Duration::ZERO);

        let result = dispatcher.dispatch("column_names", &[], TRIES).await.unwrap();

        assert_eq!(result.task_id, 1);
        assert_eq!(result.payloads.len(), 1);
        let submitted = client.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].method, "column_names");
        assert_eq!(submitted[0].target_peers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_dispatch_excludes_own_peer() {
        let client = client();
        let dispatcher = TaskDispatcher::new(&client, Duration::ZERO);

        dispatcher.dispatch("column_names", &[1], TRIES).await.unwrap();

        assert_eq!(client.submitted()[0].target_peers, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_dispatch_all_excluded_is_error() {
        let client = client();
        let dispatcher = TaskDispatcher::new(&client, Duration::ZERO);

        let result = dispatcher.dispatch("column_names", &[1, 2, 3], TRIES).await;

        assert!(matches!(result, Err(CarrierError::NoPeers { .. })));
        assert!(client.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_timeout_skips_results() {
        let client = client();
        client.set_task_id(42);
        client.set_completion(Completion::Never);
        let dispatcher = TaskDispatcher::new(&client, Duration::ZERO);

        let result = dispatcher.dispatch("column_names", &[], 5).await;

        match result {
            Err(CarrierError::TaskTimeout { task_id, attempts, .. }) => {
                assert_eq!(task_id, 42);
                assert_eq!(attempts, 5);
            }
            other => panic!("Expected TaskTimeout, got {:?}", other),
        }
        assert_eq!(client.status_calls(), 5);
        assert_eq!(client.result_calls(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_stops_polling_when_complete() {
        let client = client();
        client.set_completion(Completion::AfterPolls(3));
        let dispatcher = TaskDispatcher::new(&client, Duration::from_millis(1));

        dispatcher.dispatch("column_names", &[], 10).await.unwrap();

        assert_eq!(client.status_calls(), 3);
        assert_eq!(client.result_calls(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_propagates_client_error() {
        let client = client();
        client.set_failure(Some("unauthorized".to_string()));
        let dispatcher = TaskDispatcher::new(&client, Duration::ZERO);

        let result = dispatcher.dispatch("column_names", &[], TRIES).await;
        assert!(matches!(result, Err(CarrierError::Client(_))));
    }
}
