//! Recurring and one-shot campaign scheduling.
//!
//! A single cooperative polling loop scans Active schedules, and for each
//! due schedule advances its next-run slot and triggers the execution engine
//! in one logical step, so overlapping ticks can never double-fire a slot.
//! `run_now` is the out-of-band path and leaves cadence bookkeeping alone.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::core::engine::{DispatchTask, ExecutionEngine, ExecutionLaunch};
use crate::core::entity::{
    is_valid_cron_expr, Execution, Schedule, ScheduleFrequency, ScheduleRun, ScheduleStatus,
};
use crate::core::error::{Error, Result};
use crate::storage::{AgentStore, ScheduleStore};

/// Delivery seam for scheduled executions: the transport layer implements
/// this to receive the dispatch list the engine produced.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn dispatch(&self, execution: &Execution, tasks: &[DispatchTask]) -> Result<()>;
}

/// Dispatcher that drops tasks on the floor; embedders that poll results
/// through another channel, and tests, use this.
pub struct NullDispatcher;

#[async_trait]
impl TaskDispatcher for NullDispatcher {
    async fn dispatch(&self, _execution: &Execution, _tasks: &[DispatchTask]) -> Result<()> {
        Ok(())
    }
}

/// Fields accepted when creating a schedule.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub name: String,
    pub description: String,
    pub scenario_id: String,
    /// Empty targets every online agent at trigger time.
    pub agent_paw: String,
    pub frequency: ScheduleFrequency,
    pub cron_expr: String,
    pub safe_mode: bool,
    pub created_by: String,
}

pub struct ScheduleService {
    schedule_store: Arc<dyn ScheduleStore>,
    agent_store: Arc<dyn AgentStore>,
    engine: Arc<ExecutionEngine>,
    dispatcher: Arc<dyn TaskDispatcher>,
}

impl ScheduleService {
    pub fn new(
        schedule_store: Arc<dyn ScheduleStore>,
        agent_store: Arc<dyn AgentStore>,
        engine: Arc<ExecutionEngine>,
        dispatcher: Arc<dyn TaskDispatcher>,
    ) -> Self {
        Self {
            schedule_store,
            agent_store,
            engine,
            dispatcher,
        }
    }

    /// Validates scheduling fields, computes the initial next-run slot and
    /// persists the schedule as Active.
    pub async fn create_schedule(&self, new: NewSchedule) -> Result<Schedule> {
        if new.scenario_id.trim().is_empty() {
            return Err(Error::Validation("scenario_id is required".to_string()));
        }
        if new.name.trim().is_empty() {
            return Err(Error::Validation("name is required".to_string()));
        }
        if new.frequency == ScheduleFrequency::Cron && !is_valid_cron_expr(&new.cron_expr) {
            return Err(Error::Validation(format!(
                "invalid cron expression: {:?}",
                new.cron_expr
            )));
        }

        let now = Utc::now();
        let mut schedule = Schedule {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            description: new.description,
            scenario_id: new.scenario_id,
            agent_paw: new.agent_paw,
            frequency: new.frequency,
            cron_expr: new.cron_expr,
            safe_mode: new.safe_mode,
            status: ScheduleStatus::Active,
            next_run_at: None,
            last_run_at: None,
            last_run_id: String::new(),
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        schedule.next_run_at = schedule.calculate_next_run(now);

        self.schedule_store.create(&schedule).await?;
        info!(schedule_id = %schedule.id, frequency = schedule.frequency.as_str(), "schedule created");
        Ok(schedule)
    }

    pub async fn get_schedule(&self, id: &str) -> Result<Schedule> {
        self.schedule_store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("schedule", id))
    }

    pub async fn list_schedules(&self) -> Result<Vec<Schedule>> {
        self.schedule_store.find_all().await
    }

    pub async fn find_by_scenario(&self, scenario_id: &str) -> Result<Vec<Schedule>> {
        self.schedule_store.find_by_scenario_id(scenario_id).await
    }

    pub async fn list_runs(&self, schedule_id: &str, limit: usize) -> Result<Vec<ScheduleRun>> {
        self.schedule_store
            .find_runs_by_schedule_id(schedule_id, limit)
            .await
    }

    pub async fn update_schedule(&self, schedule: &Schedule) -> Result<()> {
        if schedule.frequency == ScheduleFrequency::Cron && !is_valid_cron_expr(&schedule.cron_expr)
        {
            return Err(Error::Validation(format!(
                "invalid cron expression: {:?}",
                schedule.cron_expr
            )));
        }
        let mut updated = schedule.clone();
        updated.updated_at = Utc::now();
        self.schedule_store.update(&updated).await
    }

    pub async fn delete_schedule(&self, id: &str) -> Result<()> {
        // Ensure the id exists so deletes surface NotFound like other ops.
        self.get_schedule(id).await?;
        self.schedule_store.delete(id).await
    }

    pub async fn pause(&self, id: &str) -> Result<()> {
        let mut schedule = self.get_schedule(id).await?;
        if schedule.status != ScheduleStatus::Active {
            return Err(Error::InvalidState(format!(
                "schedule {} cannot be paused: status is {}",
                id,
                schedule.status.as_str()
            )));
        }
        schedule.status = ScheduleStatus::Paused;
        schedule.updated_at = Utc::now();
        self.schedule_store.update(&schedule).await
    }

    /// Resume keeps the stored next_run_at: a schedule paused past its slot
    /// fires once on the next tick ("catch-up once"), then advances from the
    /// stored slot as usual.
    pub async fn resume(&self, id: &str) -> Result<()> {
        let mut schedule = self.get_schedule(id).await?;
        if schedule.status != ScheduleStatus::Paused {
            return Err(Error::InvalidState(format!(
                "schedule {} cannot be resumed: status is {}",
                id,
                schedule.status.as_str()
            )));
        }
        schedule.status = ScheduleStatus::Active;
        schedule.updated_at = Utc::now();
        self.schedule_store.update(&schedule).await
    }

    /// Out-of-band trigger: records a run and starts an execution
    /// immediately without touching next_run_at/last_run_at.
    pub async fn run_now(&self, id: &str) -> Result<ScheduleRun> {
        let schedule = self.get_schedule(id).await?;
        let started_at = Utc::now();

        let run = match self.trigger(&schedule).await {
            Ok(launch) => ScheduleRun::completed(&schedule.id, &launch.execution.id, started_at),
            Err(err) => ScheduleRun::failed(&schedule.id, &err.to_string(), started_at),
        };
        self.schedule_store.create_run(&run).await?;
        Ok(run)
    }

    /// One poll pass: fire every Active schedule whose slot is due.
    ///
    /// Per schedule, the slot is consumed (next_run_at advanced from the
    /// stored slot, last_run_at stamped, schedule persisted) before the
    /// engine is invoked; a failed trigger is recorded on the run but the
    /// slot stays consumed. Returns the number of schedules fired.
    pub async fn tick(&self, now: chrono::DateTime<Utc>) -> Result<usize> {
        let due = self.schedule_store.find_active_schedules_due(now).await?;
        let mut fired = 0;

        for mut schedule in due {
            if !schedule.is_ready_to_run(now) {
                continue;
            }

            // Advance from the stored slot, not wall clock, to avoid drift.
            let from = schedule.next_run_at.unwrap_or(now);
            schedule.last_run_at = Some(now);
            schedule.next_run_at = schedule.calculate_next_run(from);
            schedule.updated_at = now;
            if let Err(err) = self.schedule_store.update(&schedule).await {
                error!(schedule_id = %schedule.id, error = %err, "failed to consume due slot");
                continue;
            }

            let run = match self.trigger(&schedule).await {
                Ok(launch) => {
                    schedule.last_run_id = launch.execution.id.clone();
                    if let Err(err) = self.schedule_store.update(&schedule).await {
                        error!(schedule_id = %schedule.id, error = %err, "failed to record last run id");
                    }
                    ScheduleRun::completed(&schedule.id, &launch.execution.id, now)
                }
                Err(err) => {
                    error!(schedule_id = %schedule.id, error = %err, "scheduled execution failed to start");
                    ScheduleRun::failed(&schedule.id, &err.to_string(), now)
                }
            };
            if let Err(err) = self.schedule_store.create_run(&run).await {
                error!(schedule_id = %schedule.id, error = %err, "failed to record schedule run");
            }
            fired += 1;
        }

        if fired > 0 {
            debug!(fired, "scheduler tick fired schedules");
        }
        Ok(fired)
    }

    /// Poll loop driver. Single consumer, non-reentrant: the next tick only
    /// starts after the previous pass finished.
    pub async fn run_loop(&self, poll_interval: Duration, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = poll_interval.as_secs(), "scheduler loop started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("scheduler loop stopped");
                    return;
                }
                _ = interval.tick() => {
                    if let Err(err) = self.tick(Utc::now()).await {
                        error!(error = %err, "scheduler tick failed");
                    }
                }
            }
        }
    }

    /// Resolve the target paw set and start the execution; hand the dispatch
    /// list to the transport seam.
    async fn trigger(&self, schedule: &Schedule) -> Result<ExecutionLaunch> {
        let paws = if schedule.agent_paw.trim().is_empty() {
            self.agent_store
                .find_all()
                .await?
                .into_iter()
                .filter(|a| a.is_online())
                .map(|a| a.paw)
                .collect::<Vec<_>>()
        } else {
            vec![schedule.agent_paw.clone()]
        };
        if paws.is_empty() {
            return Err(Error::NoExecutableTasks);
        }

        let launch = self
            .engine
            .start_execution(&schedule.scenario_id, &paws, schedule.safe_mode)
            .await?;
        self.dispatcher
            .dispatch(&launch.execution, &launch.tasks)
            .await?;
        Ok(launch)
    }
}
