//! In-memory store implementations backed by `tokio::sync::RwLock` maps.
//! Insertion order is preserved for executions, results and runs so read
//! paths stay deterministic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::core::entity::{
    Agent, Execution, ExecutionResult, Scenario, Schedule, ScheduleRun, ScheduleStatus,
    Technique,
};
use crate::core::error::Result;

use super::{AgentStore, ExecutionStore, ScenarioStore, ScheduleStore, TechniqueStore};

#[derive(Default)]
pub struct MemoryAgentStore {
    agents: RwLock<HashMap<String, Agent>>,
}

impl MemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn remove(&self, paw: &str) {
        self.agents.write().await.remove(paw);
    }
}

#[async_trait]
impl AgentStore for MemoryAgentStore {
    async fn find_by_paw(&self, paw: &str) -> Result<Option<Agent>> {
        Ok(self.agents.read().await.get(paw).cloned())
    }

    async fn find_by_paws(&self, paws: &[String]) -> Result<Vec<Agent>> {
        let agents = self.agents.read().await;
        Ok(paws.iter().filter_map(|p| agents.get(p).cloned()).collect())
    }

    async fn find_all(&self) -> Result<Vec<Agent>> {
        Ok(self.agents.read().await.values().cloned().collect())
    }

    async fn save(&self, agent: &Agent) -> Result<()> {
        self.agents
            .write()
            .await
            .insert(agent.paw.clone(), agent.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryScenarioStore {
    scenarios: RwLock<HashMap<String, Scenario>>,
}

impl MemoryScenarioStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScenarioStore for MemoryScenarioStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Scenario>> {
        Ok(self.scenarios.read().await.get(id).cloned())
    }

    async fn save(&self, scenario: &Scenario) -> Result<()> {
        self.scenarios
            .write()
            .await
            .insert(scenario.id.clone(), scenario.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTechniqueStore {
    techniques: RwLock<HashMap<String, Technique>>,
}

impl MemoryTechniqueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TechniqueStore for MemoryTechniqueStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Technique>> {
        Ok(self.techniques.read().await.get(id).cloned())
    }

    async fn save(&self, technique: &Technique) -> Result<()> {
        self.techniques
            .write()
            .await
            .insert(technique.id.clone(), technique.clone());
        Ok(())
    }
}

#[derive(Default)]
struct ExecutionTables {
    executions: Vec<Execution>,
    results: Vec<ExecutionResult>,
}

#[derive(Default)]
pub struct MemoryExecutionStore {
    tables: RwLock<ExecutionTables>,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn create_execution(&self, execution: &Execution) -> Result<()> {
        self.tables.write().await.executions.push(execution.clone());
        Ok(())
    }

    async fn update_execution(&self, execution: &Execution) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(slot) = tables.executions.iter_mut().find(|e| e.id == execution.id) {
            *slot = execution.clone();
        }
        Ok(())
    }

    async fn find_execution_by_id(&self, id: &str) -> Result<Option<Execution>> {
        Ok(self
            .tables
            .read()
            .await
            .executions
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn find_recent_executions(&self, limit: usize) -> Result<Vec<Execution>> {
        let tables = self.tables.read().await;
        let mut executions = tables.executions.clone();
        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        executions.truncate(limit);
        Ok(executions)
    }

    async fn create_result(&self, result: &ExecutionResult) -> Result<()> {
        self.tables.write().await.results.push(result.clone());
        Ok(())
    }

    async fn update_result(&self, result: &ExecutionResult) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(slot) = tables.results.iter_mut().find(|r| r.id == result.id) {
            *slot = result.clone();
        }
        Ok(())
    }

    async fn find_result_by_id(&self, id: &str) -> Result<Option<ExecutionResult>> {
        Ok(self
            .tables
            .read()
            .await
            .results
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn find_results_by_execution(
        &self,
        execution_id: &str,
    ) -> Result<Vec<ExecutionResult>> {
        Ok(self
            .tables
            .read()
            .await
            .results
            .iter()
            .filter(|r| r.execution_id == execution_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct ScheduleTables {
    schedules: Vec<Schedule>,
    runs: Vec<ScheduleRun>,
}

#[derive(Default)]
pub struct MemoryScheduleStore {
    tables: RwLock<ScheduleTables>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn create(&self, schedule: &Schedule) -> Result<()> {
        self.tables.write().await.schedules.push(schedule.clone());
        Ok(())
    }

    async fn update(&self, schedule: &Schedule) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(slot) = tables.schedules.iter_mut().find(|s| s.id == schedule.id) {
            *slot = schedule.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.tables.write().await.schedules.retain(|s| s.id != id);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Schedule>> {
        Ok(self
            .tables
            .read()
            .await
            .schedules
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<Schedule>> {
        Ok(self.tables.read().await.schedules.clone())
    }

    async fn find_by_scenario_id(&self, scenario_id: &str) -> Result<Vec<Schedule>> {
        Ok(self
            .tables
            .read()
            .await
            .schedules
            .iter()
            .filter(|s| s.scenario_id == scenario_id)
            .cloned()
            .collect())
    }

    async fn find_active_schedules_due(&self, now: DateTime<Utc>) -> Result<Vec<Schedule>> {
        Ok(self
            .tables
            .read()
            .await
            .schedules
            .iter()
            .filter(|s| s.status == ScheduleStatus::Active)
            .filter(|s| s.next_run_at.map(|next| next <= now).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn create_run(&self, run: &ScheduleRun) -> Result<()> {
        self.tables.write().await.runs.push(run.clone());
        Ok(())
    }

    async fn find_runs_by_schedule_id(
        &self,
        schedule_id: &str,
        limit: usize,
    ) -> Result<Vec<ScheduleRun>> {
        let tables = self.tables.read().await;
        let mut runs: Vec<ScheduleRun> = tables
            .runs
            .iter()
            .filter(|r| r.schedule_id == schedule_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit);
        Ok(runs)
    }
}
