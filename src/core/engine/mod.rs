//! Execution lifecycle: create, ingest results, auto-complete, cancel.
//!
//! Per execution the state machine is `Running -> {Completed, Cancelled}`;
//! per result `Pending -> Running -> {Blocked, Detected, Successful,
//! Skipped}`. The engine never talks to an agent: `start_execution` returns
//! dispatch instructions for the external transport, and outcomes come back
//! through `update_result_by_id`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::entity::{
    can_transition, Execution, ExecutionResult, ExecutionStatus, ResultStatus,
};
use crate::core::error::{Error, Result};
use crate::core::planner::ExecutionPlanner;
use crate::core::score::ScoreCalculator;
use crate::storage::{AgentStore, ExecutionStore, ScenarioStore, TechniqueStore};

/// Everything the transport needs to deliver one task to one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchTask {
    pub result_id: String,
    pub agent_paw: String,
    pub technique_id: String,
    pub command: String,
    pub executor: String,
    pub timeout_secs: u32,
    pub cleanup: String,
}

/// The created execution plus its dispatch list.
#[derive(Debug, Clone)]
pub struct ExecutionLaunch {
    pub execution: Execution,
    pub tasks: Vec<DispatchTask>,
}

pub struct ExecutionEngine {
    execution_store: Arc<dyn ExecutionStore>,
    scenario_store: Arc<dyn ScenarioStore>,
    technique_store: Arc<dyn TechniqueStore>,
    agent_store: Arc<dyn AgentStore>,
    planner: ExecutionPlanner,
    calculator: ScoreCalculator,
}

impl ExecutionEngine {
    pub fn new(
        execution_store: Arc<dyn ExecutionStore>,
        scenario_store: Arc<dyn ScenarioStore>,
        technique_store: Arc<dyn TechniqueStore>,
        agent_store: Arc<dyn AgentStore>,
    ) -> Self {
        let planner = ExecutionPlanner::new(technique_store.clone(), agent_store.clone());
        Self {
            execution_store,
            scenario_store,
            technique_store,
            agent_store,
            planner,
            calculator: ScoreCalculator::new(),
        }
    }

    /// Start a new execution of `scenario_id` against `agent_paws`.
    ///
    /// Validation is all-or-nothing and happens before any write: the
    /// scenario must exist and every requested paw must resolve to a known,
    /// online agent (agents are loaded in one batch query). After the
    /// Execution row is created, per-task Pending result rows are written in
    /// plan order; a mid-batch persistence failure propagates without
    /// rolling back rows already written.
    pub async fn start_execution(
        &self,
        scenario_id: &str,
        agent_paws: &[String],
        safe_mode: bool,
    ) -> Result<ExecutionLaunch> {
        let scenario = self
            .scenario_store
            .find_by_id(scenario_id)
            .await?
            .ok_or_else(|| Error::not_found("scenario", scenario_id))?;

        let agents = self.agent_store.find_by_paws(agent_paws).await?;
        let agent_map: HashMap<&str, _> =
            agents.iter().map(|a| (a.paw.as_str(), a)).collect();

        for paw in agent_paws {
            let agent = agent_map
                .get(paw.as_str())
                .ok_or_else(|| Error::not_found("agent", paw))?;
            if !agent.is_online() {
                return Err(Error::AgentOffline(paw.clone()));
            }
        }

        let plan = self.planner.plan(&scenario, &agents, safe_mode).await?;

        let execution = Execution::new(scenario_id, agent_paws.to_vec(), safe_mode);
        self.execution_store.create_execution(&execution).await?;
        info!(
            execution_id = %execution.id,
            scenario_id,
            tasks = plan.tasks.len(),
            safe_mode,
            "execution started"
        );

        let mut tasks = Vec::with_capacity(plan.tasks.len());
        for planned in &plan.tasks {
            let result = ExecutionResult::pending(
                &execution.id,
                &planned.technique_id,
                &planned.agent_paw,
            );
            self.execution_store.create_result(&result).await?;

            // Re-resolve the interpreter for dispatch; "sh" when resolution
            // fails (catalog may have changed under us, soft policy applies).
            let executor = match self.technique_store.find_by_id(&planned.technique_id).await {
                Ok(Some(technique)) => agent_map
                    .get(planned.agent_paw.as_str())
                    .and_then(|agent| {
                        technique.executor_for_platform(&agent.platform, &agent.executors)
                    })
                    .map(|spec| spec.interpreter)
                    .unwrap_or_else(|| "sh".to_string()),
                _ => "sh".to_string(),
            };

            tasks.push(DispatchTask {
                result_id: result.id,
                agent_paw: planned.agent_paw.clone(),
                technique_id: planned.technique_id.clone(),
                command: planned.command.clone(),
                executor,
                timeout_secs: planned.timeout_secs,
                cleanup: planned.cleanup.clone(),
            });
        }

        Ok(ExecutionLaunch { execution, tasks })
    }

    /// Ingest one outcome from the transport.
    ///
    /// The first terminal write sets `completed_at`; a later update for a
    /// result that already reached a terminal status is ignored (logged),
    /// preserving cancelled-run forensics. Every call, ignored or not,
    /// re-runs the completion check; a failed check is swallowed and retried
    /// on the next report, so a duplicate report can still complete an
    /// execution whose final check was lost.
    pub async fn update_result_by_id(
        &self,
        result_id: &str,
        status: ResultStatus,
        output: &str,
        exit_code: Option<i32>,
    ) -> Result<()> {
        let mut result = self
            .execution_store
            .find_result_by_id(result_id)
            .await?
            .ok_or_else(|| Error::not_found("result", result_id))?;

        if result.status.is_terminal() {
            warn!(
                result_id,
                current = result.status.as_str(),
                incoming = status.as_str(),
                "ignoring update for already-terminal result"
            );
            // Still fall through to the completion check: a duplicate report
            // may be the only remaining trigger after a check that failed
            // when the last result went terminal.
        } else {
            result.status = status;
            result.output = output.to_string();
            result.exit_code = exit_code;
            result.detected = status == ResultStatus::Detected;
            if status.is_terminal() {
                result.completed_at = Some(Utc::now());
            }
            self.execution_store.update_result(&result).await?;
        }

        if let Err(err) = self.check_and_complete(&result.execution_id).await {
            warn!(
                execution_id = %result.execution_id,
                error = %err,
                "completion check failed; will retry on next result update"
            );
        }
        Ok(())
    }

    /// Complete the execution iff it has at least one result and every
    /// result has left Pending/Running.
    async fn check_and_complete(&self, execution_id: &str) -> Result<()> {
        let results = self
            .execution_store
            .find_results_by_execution(execution_id)
            .await?;

        let all_done = !results.is_empty() && results.iter().all(|r| r.status.is_terminal());
        if all_done {
            self.complete_execution(execution_id, &results).await?;
        }
        Ok(())
    }

    /// Idempotent Completed transition: concurrent completion checks may
    /// both observe "all terminal", so an already-terminal execution is a
    /// no-op rather than a double write.
    async fn complete_execution(
        &self,
        execution_id: &str,
        results: &[ExecutionResult],
    ) -> Result<()> {
        let mut execution = self
            .execution_store
            .find_execution_by_id(execution_id)
            .await?
            .ok_or_else(|| Error::not_found("execution", execution_id))?;

        if !can_transition(execution.status, ExecutionStatus::Completed) {
            return Ok(());
        }

        let score = self.calculator.calculate(results);
        execution.status = ExecutionStatus::Completed;
        execution.score = Some(score);
        execution.completed_at = Some(Utc::now());
        self.execution_store.update_execution(&execution).await?;
        info!(
            execution_id,
            overall = score.overall,
            blocked = score.blocked,
            detected = score.detected,
            successful = score.successful,
            "execution completed"
        );
        Ok(())
    }

    /// Cancel a running execution: every result still in Pending/Running
    /// becomes Skipped with `completed_at` set now; results that already
    /// reached a terminal status keep their outcome. Cancellation is
    /// bookkeeping only; work already delivered to an agent is not
    /// interrupted.
    pub async fn cancel_execution(&self, execution_id: &str) -> Result<()> {
        let mut execution = self
            .execution_store
            .find_execution_by_id(execution_id)
            .await?
            .ok_or_else(|| Error::not_found("execution", execution_id))?;

        if !can_transition(execution.status, ExecutionStatus::Cancelled) {
            return Err(Error::InvalidState(format!(
                "execution {} cannot be cancelled: status is {}",
                execution_id,
                execution.status.as_str()
            )));
        }

        let now = Utc::now();
        let results = self
            .execution_store
            .find_results_by_execution(execution_id)
            .await?;
        for mut result in results {
            if result.status.is_terminal() {
                continue;
            }
            result.status = ResultStatus::Skipped;
            result.completed_at = Some(now);
            self.execution_store.update_result(&result).await?;
        }

        execution.status = ExecutionStatus::Cancelled;
        execution.completed_at = Some(now);
        self.execution_store.update_execution(&execution).await?;
        info!(execution_id, "execution cancelled");
        Ok(())
    }

    pub async fn get_execution(&self, id: &str) -> Result<Execution> {
        self.execution_store
            .find_execution_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("execution", id))
    }

    pub async fn get_execution_results(
        &self,
        execution_id: &str,
    ) -> Result<Vec<ExecutionResult>> {
        self.execution_store
            .find_results_by_execution(execution_id)
            .await
    }

    pub async fn get_recent_executions(&self, limit: usize) -> Result<Vec<Execution>> {
        self.execution_store.find_recent_executions(limit).await
    }
}

#[cfg(test)]
mod tests;
