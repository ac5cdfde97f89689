//! Turns a scenario plus target agents into an ordered execution plan.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::entity::{Agent, Scenario};
use crate::core::error::{Error, Result};
use crate::storage::{AgentStore, TechniqueStore};

/// One dispatchable unit: a technique resolved against a compatible agent.
/// `order` is a single global counter across all phases so dispatch order is
/// a total order, never reset per phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTask {
    pub technique_id: String,
    pub agent_paw: String,
    pub phase: String,
    pub order: usize,
    pub command: String,
    pub cleanup: String,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub id: String,
    pub tasks: Vec<PlannedTask>,
}

pub struct ExecutionPlanner {
    technique_store: Arc<dyn TechniqueStore>,
    agent_store: Arc<dyn AgentStore>,
}

impl ExecutionPlanner {
    pub fn new(
        technique_store: Arc<dyn TechniqueStore>,
        agent_store: Arc<dyn AgentStore>,
    ) -> Self {
        Self {
            technique_store,
            agent_store,
        }
    }

    /// Walk phases and techniques in declared order, emitting one task per
    /// compatible (technique, agent) pair.
    ///
    /// Techniques missing from the catalog are logged and skipped; partial
    /// scenario coverage beats aborting the whole plan. Unsafe techniques
    /// are dropped under safe mode. A plan with zero tasks is the only hard
    /// planning failure.
    pub async fn plan(
        &self,
        scenario: &Scenario,
        target_agents: &[Agent],
        safe_mode: bool,
    ) -> Result<ExecutionPlan> {
        let mut tasks = Vec::new();
        let mut order = 0usize;

        for phase in &scenario.phases {
            for technique_id in &phase.techniques {
                let technique = match self.technique_store.find_by_id(technique_id).await? {
                    Some(t) => t,
                    None => {
                        warn!(technique_id, "skipping technique: not found in catalog");
                        continue;
                    }
                };

                if safe_mode && !technique.is_safe {
                    debug!(technique_id, "skipping unsafe technique in safe mode");
                    continue;
                }

                for agent in target_agents {
                    if !agent.is_compatible(&technique) {
                        continue;
                    }
                    let spec =
                        match technique.executor_for_platform(&agent.platform, &agent.executors) {
                            Some(spec) => spec,
                            None => continue,
                        };

                    tasks.push(PlannedTask {
                        technique_id: technique_id.clone(),
                        agent_paw: agent.paw.clone(),
                        phase: phase.name.clone(),
                        order,
                        command: spec.command,
                        cleanup: spec.cleanup,
                        timeout_secs: spec.timeout_secs,
                    });
                    order += 1;
                }
            }
        }

        if tasks.is_empty() {
            return Err(Error::NoExecutableTasks);
        }

        Ok(ExecutionPlan {
            id: Uuid::new_v4().to_string(),
            tasks,
        })
    }

    /// Stricter pre-dispatch pass: every referenced agent must still exist,
    /// be online and remain compatible. Guards the window between planning
    /// and dispatch where an agent may have dropped offline.
    pub async fn validate_plan(&self, plan: &ExecutionPlan) -> Result<()> {
        for task in &plan.tasks {
            let agent = self
                .agent_store
                .find_by_paw(&task.agent_paw)
                .await?
                .ok_or_else(|| Error::not_found("agent", &task.agent_paw))?;

            if !agent.is_online() {
                return Err(Error::AgentOffline(task.agent_paw.clone()));
            }

            let technique = self
                .technique_store
                .find_by_id(&task.technique_id)
                .await?
                .ok_or_else(|| Error::not_found("technique", &task.technique_id))?;

            if !agent.is_compatible(&technique) {
                return Err(Error::Validation(format!(
                    "agent {} is not compatible with technique {}",
                    task.agent_paw, task.technique_id
                )));
            }
        }
        Ok(())
    }
}
