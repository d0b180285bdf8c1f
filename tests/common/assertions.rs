//! Waiting helpers for pipeline outcomes

use repo_keeper::{Event, ProjectId, ProjectKeeper};
use std::time::Duration;
use tokio::sync::broadcast;

/// Result of waiting for a pipeline to finish
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// All artifacts produced
    Completed,
    /// Pipeline failed with error
    Failed(String),
    /// Timeout waiting for completion
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait on an existing subscription for `id` to complete or fail
///
/// Subscribe before the upload so no event is missed.
pub async fn wait_for_outcome(
    events: &mut broadcast::Receiver<Event>,
    id: ProjectId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Completed { id: event_id, .. }) if event_id == id => {
                    return WaitResult::Completed;
                }
                Ok(Event::Failed {
                    id: event_id,
                    error,
                    ..
                }) if event_id == id => {
                    return WaitResult::Failed(error);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    return WaitResult::ChannelClosed;
                }
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Poll the catalog until `id` reaches a terminal status
pub async fn wait_until_terminal(
    keeper: &ProjectKeeper,
    id: ProjectId,
    timeout: Duration,
) -> repo_keeper::ProjectInfo {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let info = keeper
            .get_project(&id.to_string())
            .await
            .expect("project exists");
        if info.status.is_terminal() {
            return info;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "project {id} stuck in {}",
            info.status
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
