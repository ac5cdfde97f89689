use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::score::SecurityScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "running" => Some(ExecutionStatus::Running),
            "completed" => Some(ExecutionStatus::Completed),
            "cancelled" => Some(ExecutionStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Cancelled)
    }
}

/// Completed and Cancelled are absorbing; once reached, no transition out.
pub fn can_transition(from: ExecutionStatus, to: ExecutionStatus) -> bool {
    match from {
        ExecutionStatus::Running => to.is_terminal(),
        ExecutionStatus::Completed | ExecutionStatus::Cancelled => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Pending,
    Running,
    Blocked,
    Detected,
    Successful,
    Skipped,
}

impl ResultStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultStatus::Pending => "pending",
            ResultStatus::Running => "running",
            ResultStatus::Blocked => "blocked",
            ResultStatus::Detected => "detected",
            ResultStatus::Successful => "successful",
            ResultStatus::Skipped => "skipped",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ResultStatus::Pending),
            "running" => Some(ResultStatus::Running),
            "blocked" => Some(ResultStatus::Blocked),
            "detected" => Some(ResultStatus::Detected),
            "successful" => Some(ResultStatus::Successful),
            "skipped" => Some(ResultStatus::Skipped),
            _ => None,
        }
    }

    /// Everything except Pending and Running is terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResultStatus::Pending | ResultStatus::Running)
    }
}

/// One run of a scenario against a set of agents. Created directly in
/// Running; there is no persisted created/pending state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub scenario_id: String,
    pub agent_paws: Vec<String>,
    pub status: ExecutionStatus,
    pub safe_mode: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set exactly once, when the execution completes.
    pub score: Option<SecurityScore>,
}

impl Execution {
    pub fn new(scenario_id: &str, agent_paws: Vec<String>, safe_mode: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            scenario_id: scenario_id.to_string(),
            agent_paws,
            status: ExecutionStatus::Running,
            safe_mode,
            started_at: Utc::now(),
            completed_at: None,
            score: None,
        }
    }
}

/// The outcome of one technique on one agent within an execution.
/// `completed_at` is written exactly once, on the first terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: String,
    pub execution_id: String,
    pub technique_id: String,
    pub agent_paw: String,
    pub status: ResultStatus,
    #[serde(default)]
    pub output: String,
    pub exit_code: Option<i32>,
    pub detected: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionResult {
    pub fn pending(execution_id: &str, technique_id: &str, agent_paw: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            execution_id: execution_id.to_string(),
            technique_id: technique_id.to_string(),
            agent_paw: agent_paw.to_string(),
            status: ResultStatus::Pending,
            output: String::new(),
            exit_code: None,
            detected: false,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_can_reach_both_terminal_states() {
        assert!(can_transition(ExecutionStatus::Running, ExecutionStatus::Completed));
        assert!(can_transition(ExecutionStatus::Running, ExecutionStatus::Cancelled));
    }

    #[test]
    fn terminal_states_are_absorbing() {
        for terminal in [ExecutionStatus::Completed, ExecutionStatus::Cancelled] {
            for to in [
                ExecutionStatus::Running,
                ExecutionStatus::Completed,
                ExecutionStatus::Cancelled,
            ] {
                assert!(
                    !can_transition(terminal, to),
                    "expected {:?} -> {:?} to be rejected",
                    terminal,
                    to
                );
            }
        }
    }

    #[test]
    fn terminal_result_set_excludes_pending_and_running() {
        assert!(!ResultStatus::Pending.is_terminal());
        assert!(!ResultStatus::Running.is_terminal());
        assert!(ResultStatus::Blocked.is_terminal());
        assert!(ResultStatus::Detected.is_terminal());
        assert!(ResultStatus::Successful.is_terminal());
        assert!(ResultStatus::Skipped.is_terminal());
    }

    #[test]
    fn status_strings_round_trip() {
        for s in [
            ResultStatus::Pending,
            ResultStatus::Running,
            ResultStatus::Blocked,
            ResultStatus::Detected,
            ResultStatus::Successful,
            ResultStatus::Skipped,
        ] {
            assert_eq!(ResultStatus::from_status(s.as_str()), Some(s));
        }
        assert_eq!(ResultStatus::from_status("exploded"), None);
    }

    #[test]
    fn new_execution_starts_running_without_score() {
        let e = Execution::new("scn-1", vec!["paw-a".to_string()], true);
        assert_eq!(e.status, ExecutionStatus::Running);
        assert!(e.score.is_none());
        assert!(e.completed_at.is_none());
        assert!(e.safe_mode);
    }
}
