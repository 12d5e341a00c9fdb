//! Mock peer client for testing
//!
//! Returns scripted answers without any peers behind it and records every call, so tests
//! can check what the dispatcher submitted and how often it polled.
//!
//! # Example
//!
//! ```
//! use fedcarrier::client::{MockClient, Payload, PeerClient};
//!
//! # tokio_test_block_on(async {
//! let client = MockClient::new();
//! client.set_peers(vec![1, 2, 3]);
//! client.set_results(vec![Payload::ColumnNames(vec!["a".into()])]);
//!
//! let task_id = client.submit_task("column_names", &[2, 3]).await.unwrap();
//! assert!(client.get_task_status(task_id).await.unwrap().complete);
//! assert_eq!(client.submitted()[0].target_peers, vec![2, 3]);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

use super::{Payload, PeerClient, PeerId, TaskId, TaskRequest, TaskStatus};
use crate::error::{CarrierError, Result};
use std::sync::{Arc, Mutex};

/// When the mock reports a task as complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every status poll reports complete
    Immediately,
    /// The n-th status poll (1-based) and later report complete
    AfterPolls(u32),
    /// Never completes
    Never,
}

/// Mock peer client
///
/// Cloning shares the recorded state, so a test can hand one clone to the code under test
/// and inspect the other.
#[derive(Clone)]
pub struct MockClient {
    /// Peers returned by `list_peers_in_collaboration`
    peers: Arc<Mutex<Vec<PeerId>>>,

    /// Id handed out by `submit_task`
    task_id: Arc<Mutex<TaskId>>,

    /// Completion behavior
    completion: Arc<Mutex<Completion>>,

    /// Results returned by `get_task_results`
    results: Arc<Mutex<Vec<Payload>>>,

    /// Error message returned by every call when set
    failure: Arc<Mutex<Option<String>>>,

    /// Every submitted task
    submitted: Arc<Mutex<Vec<TaskRequest>>>,

    /// Number of status polls
    status_calls: Arc<Mutex<u32>>,

    /// Number of result fetches
    result_calls: Arc<Mutex<u32>>,
}

impl MockClient {
    /// Create a mock with one peer (id 1), task id 1, immediate completion and no results
    pub fn new() -> Self {
        Self {
            peers: Arc::new(Mutex::new(vec![1])),
            task_id: Arc::new(Mutex::new(1)),
            completion: Arc::new(Mutex::new(Completion::Immediately)),
            results: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            submitted: Arc::new(Mutex::new(Vec::new())),
            status_calls: Arc::new(Mutex::new(0)),
            result_calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn set_peers(&self, peers: Vec<PeerId>) {
        *self.peers.lock().unwrap() = peers;
    }

    pub fn set_task_id(&self, task_id: TaskId) {
        *self.task_id.lock().unwrap() = task_id;
    }

    pub fn set_completion(&self, completion: Completion) {
        *self.completion.lock().unwrap() = completion;
    }

    pub fn set_results(&self, results: Vec<Payload>) {
        *self.results.lock().unwrap() = results;
    }

    /// Make every call fail with a client error
    pub fn set_failure(&self, message: Option<String>) {
        *self.failure.lock().unwrap() = message;
    }

    /// Tasks submitted so far
    pub fn submitted(&self) -> Vec<TaskRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> u32 {
        *self.status_calls.lock().unwrap()
    }

    pub fn result_calls(&self) -> u32 {
        *self.result_calls.lock().unwrap()
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.lock().unwrap().as_ref() {
            Some(message) => Err(CarrierError::Client(message.clone())),
            None => Ok(()),
        }
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerClient for MockClient {
    async fn list_peers_in_collaboration(&self) -> Result<Vec<PeerId>> {
        self.check_failure()?;
        Ok(self.peers.lock().unwrap().clone())
    }

    async fn submit_task(&self, method: &str, target_peers: &[PeerId]) -> Result<TaskId> {
        self.check_failure()?;
        self.submitted.lock().unwrap().push(TaskRequest {
            method: method.to_string(),
            target_peers: target_peers.to_vec(),
        });
        Ok(*self.task_id.lock().unwrap())
    }

    async fn get_task_status(&self, task_id: TaskId) -> Result<TaskStatus> {
        self.check_failure()?;
        if task_id != *self.task_id.lock().unwrap() {
            return Err(CarrierError::Client(format!("unknown task {}", task_id)));
        }

        let mut calls = self.status_calls.lock().unwrap();
        *calls += 1;

        let complete = match *self.completion.lock().unwrap() {
            Completion::Immediately => true,
            Completion::AfterPolls(n) => *calls >= n,
            Completion::Never => false,
        };

        Ok(TaskStatus { complete })
    }

    async fn get_task_results(&self, task_id: TaskId) -> Result<Vec<Payload>> {
        self.check_failure()?;
        if task_id != *self.task_id.lock().unwrap() {
            return Err(CarrierError::Client(format!("unknown task {}", task_id)));
        }

        *self.result_calls.lock().unwrap() += 1;
        Ok(self.results.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_submissions() {
        let client = MockClient::new();
        client.set_peers(vec![1, 2]);

        let id = client.submit_task("get_data", &[1, 2]).await.unwrap();
        assert_eq!(id, 1);

        let submitted = client.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].method, "get_data");
        assert_eq!(submitted[0].target_peers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_mock_completes_after_polls() {
        let client = MockClient::new();
        client.set_completion(Completion::AfterPolls(3));

        assert!(!client.get_task_status(1).await.unwrap().complete);
        assert!(!client.get_task_status(1).await.unwrap().complete);
        assert!(client.get_task_status(1).await.unwrap().complete);
        assert_eq!(client.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let client = MockClient::new();
        client.set_failure(Some("backend down".to_string()));

        let result = client.list_peers_in_collaboration().await;
        assert!(matches!(result, Err(CarrierError::Client(m)) if m == "backend down"));
    }

    #[tokio::test]
    async fn test_mock_unknown_task() {
        let client = MockClient::new();
        assert!(client.get_task_status(99).await.is_err());
        assert!(client.get_task_results(99).await.is_err());
    }
}
