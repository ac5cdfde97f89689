use crate::core::entity::{ExecutionStatus, ResultStatus};
use crate::core::error::Error;
use crate::storage::ExecutionStore;

use super::{harness, online_agent, paws};

#[tokio::test]
async fn cancel_skips_every_pending_and_running_result() {
    let h = harness(&[online_agent("agent-a")]).await;
    let launch = h
        .engine
        .start_execution("scn-1", &paws(&["agent-a"]), false)
        .await
        .unwrap();

    h.engine
        .update_result_by_id(&launch.tasks[0].result_id, ResultStatus::Running, "", None)
        .await
        .unwrap();

    h.engine.cancel_execution(&launch.execution.id).await.unwrap();

    let execution = h.engine.get_execution(&launch.execution.id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Cancelled);
    assert!(execution.completed_at.is_some());

    let results = h
        .execution_store
        .find_results_by_execution(&launch.execution.id)
        .await
        .unwrap();
    assert!(results.iter().all(|r| r.status == ResultStatus::Skipped));
    assert!(results.iter().all(|r| r.completed_at.is_some()));
}

#[tokio::test]
async fn cancel_preserves_results_that_already_finished() {
    let h = harness(&[online_agent("agent-a")]).await;
    let launch = h
        .engine
        .start_execution("scn-1", &paws(&["agent-a"]), false)
        .await
        .unwrap();

    h.engine
        .update_result_by_id(&launch.tasks[0].result_id, ResultStatus::Blocked, "stopped", Some(1))
        .await
        .unwrap();

    h.engine.cancel_execution(&launch.execution.id).await.unwrap();

    let results = h
        .engine
        .get_execution_results(&launch.execution.id)
        .await
        .unwrap();
    let finished = results
        .iter()
        .find(|r| r.id == launch.tasks[0].result_id)
        .unwrap();
    assert_eq!(finished.status, ResultStatus::Blocked);
    assert_eq!(finished.output, "stopped");

    let skipped = results
        .iter()
        .find(|r| r.id == launch.tasks[1].result_id)
        .unwrap();
    assert_eq!(skipped.status, ResultStatus::Skipped);
}

#[tokio::test]
async fn cancelled_execution_has_no_score() {
    let h = harness(&[online_agent("agent-a")]).await;
    let launch = h
        .engine
        .start_execution("scn-1", &paws(&["agent-a"]), false)
        .await
        .unwrap();

    h.engine.cancel_execution(&launch.execution.id).await.unwrap();

    let execution = h.engine.get_execution(&launch.execution.id).await.unwrap();
    assert!(execution.score.is_none());
}

#[tokio::test]
async fn cancelling_twice_is_an_invalid_state_error() {
    let h = harness(&[online_agent("agent-a")]).await;
    let launch = h
        .engine
        .start_execution("scn-1", &paws(&["agent-a"]), false)
        .await
        .unwrap();

    h.engine.cancel_execution(&launch.execution.id).await.unwrap();
    let err = h
        .engine
        .cancel_execution(&launch.execution.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn cancelling_a_completed_execution_is_rejected() {
    let h = harness(&[online_agent("agent-a")]).await;
    let launch = h
        .engine
        .start_execution("scn-1", &paws(&["agent-a"]), false)
        .await
        .unwrap();

    for task in &launch.tasks {
        h.engine
            .update_result_by_id(&task.result_id, ResultStatus::Successful, "", Some(0))
            .await
            .unwrap();
    }

    let err = h
        .engine
        .cancel_execution(&launch.execution.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn cancelling_an_unknown_execution_is_not_found() {
    let h = harness(&[online_agent("agent-a")]).await;
    let err = h.engine.cancel_execution("no-such-exec").await.unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "execution", .. }));
}
