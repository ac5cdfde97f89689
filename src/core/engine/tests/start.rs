use crate::core::entity::{AgentStatus, ExecutionStatus, ResultStatus};
use crate::core::error::Error;

use super::{harness, online_agent, paws};

#[tokio::test]
async fn start_creates_running_execution_with_pending_results() {
    let h = harness(&[online_agent("agent-a")]).await;

    let launch = h
        .engine
        .start_execution("scn-1", &paws(&["agent-a"]), false)
        .await
        .unwrap();

    assert_eq!(launch.execution.status, ExecutionStatus::Running);
    assert!(launch.execution.score.is_none());
    assert_eq!(launch.tasks.len(), 2);

    let results = h
        .engine
        .get_execution_results(&launch.execution.id)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.status == ResultStatus::Pending));
    assert!(results.iter().all(|r| r.completed_at.is_none()));
}

#[tokio::test]
async fn dispatch_tasks_carry_resolved_executor_and_command() {
    let h = harness(&[online_agent("agent-a")]).await;

    let launch = h
        .engine
        .start_execution("scn-1", &paws(&["agent-a"]), false)
        .await
        .unwrap();

    let first = &launch.tasks[0];
    assert_eq!(first.technique_id, "T1082");
    assert_eq!(first.agent_paw, "agent-a");
    assert_eq!(first.command, "run T1082");
    assert_eq!(first.executor, "sh");
    assert_eq!(first.timeout_secs, 60);
    assert!(!first.result_id.is_empty());
}

#[tokio::test]
async fn tasks_follow_phase_order_per_agent_pair() {
    let h = harness(&[online_agent("agent-a"), online_agent("agent-b")]).await;

    let launch = h
        .engine
        .start_execution("scn-1", &paws(&["agent-a", "agent-b"]), false)
        .await
        .unwrap();

    let order: Vec<(&str, &str)> = launch
        .tasks
        .iter()
        .map(|t| (t.technique_id.as_str(), t.agent_paw.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("T1082", "agent-a"),
            ("T1082", "agent-b"),
            ("T1059", "agent-a"),
            ("T1059", "agent-b"),
        ]
    );
}

#[tokio::test]
async fn unknown_scenario_aborts_before_any_write() {
    let h = harness(&[online_agent("agent-a")]).await;

    let err = h
        .engine
        .start_execution("scn-missing", &paws(&["agent-a"]), false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "scenario", .. }));
    assert!(h.engine.get_recent_executions(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_agent_aborts_before_any_write() {
    let h = harness(&[online_agent("agent-a")]).await;

    let err = h
        .engine
        .start_execution("scn-1", &paws(&["agent-a", "agent-ghost"]), false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "agent", .. }));
    assert!(h.engine.get_recent_executions(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn offline_agent_aborts_the_whole_call() {
    let mut offline = online_agent("agent-b");
    offline.status = AgentStatus::Offline;
    let h = harness(&[online_agent("agent-a"), offline]).await;

    let err = h
        .engine
        .start_execution("scn-1", &paws(&["agent-a", "agent-b"]), false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AgentOffline(paw) if paw == "agent-b"));
    assert!(h.engine.get_recent_executions(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn recent_executions_are_returned_newest_first() {
    let h = harness(&[online_agent("agent-a")]).await;

    let first = h
        .engine
        .start_execution("scn-1", &paws(&["agent-a"]), false)
        .await
        .unwrap();
    let second = h
        .engine
        .start_execution("scn-1", &paws(&["agent-a"]), false)
        .await
        .unwrap();

    let recent = h.engine.get_recent_executions(1).await.unwrap();
    assert_eq!(recent.len(), 1);
    // Both started within the same instant on a fast machine; newest-first
    // ordering must still pick one of the two, and limit must hold.
    assert!(recent[0].id == first.execution.id || recent[0].id == second.execution.id);

    let all = h.engine.get_recent_executions(10).await.unwrap();
    assert_eq!(all.len(), 2);
}
