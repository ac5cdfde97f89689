//! Domain entities: agents, techniques, scenarios, executions and schedules.

pub mod agent;
pub mod execution;
pub mod scenario;
pub mod schedule;
pub mod score;
pub mod technique;

pub use agent::{Agent, AgentStatus};
pub use execution::{
    can_transition, Execution, ExecutionResult, ExecutionStatus, ResultStatus,
};
pub use scenario::{Phase, Scenario};
pub use schedule::{
    is_valid_cron_expr, next_cron_run, Schedule, ScheduleFrequency, ScheduleRun,
    ScheduleRunStatus, ScheduleStatus,
};
pub use score::SecurityScore;
pub use technique::{ExecutorSpec, Technique};
