//! Store interfaces the execution core depends on, plus the bundled
//! implementations: in-memory (tests, embedding) and sqlite (durable).
//!
//! The engine never assumes a storage format; anything implementing these
//! traits can back it.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::entity::{
    Agent, Execution, ExecutionResult, Scenario, Schedule, ScheduleRun, Technique,
};
use crate::core::error::Result;

/// Directory of enrolled agents.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn find_by_paw(&self, paw: &str) -> Result<Option<Agent>>;
    /// Batch lookup; returns only the agents that exist. One query, never N+1.
    async fn find_by_paws(&self, paws: &[String]) -> Result<Vec<Agent>>;
    async fn find_all(&self) -> Result<Vec<Agent>>;
    async fn save(&self, agent: &Agent) -> Result<()>;
}

/// Scenario catalog.
#[async_trait]
pub trait ScenarioStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Scenario>>;
    async fn save(&self, scenario: &Scenario) -> Result<()>;
}

/// Technique catalog.
#[async_trait]
pub trait TechniqueStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Technique>>;
    async fn save(&self, technique: &Technique) -> Result<()>;
}

/// Durable execution and result rows. A result update must be persisted
/// before the engine's next completion check reads it back.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn create_execution(&self, execution: &Execution) -> Result<()>;
    async fn update_execution(&self, execution: &Execution) -> Result<()>;
    async fn find_execution_by_id(&self, id: &str) -> Result<Option<Execution>>;
    async fn find_recent_executions(&self, limit: usize) -> Result<Vec<Execution>>;

    async fn create_result(&self, result: &ExecutionResult) -> Result<()>;
    async fn update_result(&self, result: &ExecutionResult) -> Result<()>;
    async fn find_result_by_id(&self, id: &str) -> Result<Option<ExecutionResult>>;
    async fn find_results_by_execution(&self, execution_id: &str)
        -> Result<Vec<ExecutionResult>>;
}

/// Schedules and their run history.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn create(&self, schedule: &Schedule) -> Result<()>;
    async fn update(&self, schedule: &Schedule) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Schedule>>;
    async fn find_all(&self) -> Result<Vec<Schedule>>;
    async fn find_by_scenario_id(&self, scenario_id: &str) -> Result<Vec<Schedule>>;
    /// Active schedules whose next_run_at is at or before `now`.
    async fn find_active_schedules_due(&self, now: DateTime<Utc>) -> Result<Vec<Schedule>>;

    async fn create_run(&self, run: &ScheduleRun) -> Result<()>;
    async fn find_runs_by_schedule_id(
        &self,
        schedule_id: &str,
        limit: usize,
    ) -> Result<Vec<ScheduleRun>>;
}
