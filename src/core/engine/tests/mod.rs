//! Engine tests over in-memory stores, split by concern.

mod cancellation;
mod start;

use std::sync::Arc;

use crate::core::entity::{
    Agent, AgentStatus, ExecutorSpec, Phase, Scenario, Technique,
};
use crate::storage::memory::{
    MemoryAgentStore, MemoryExecutionStore, MemoryScenarioStore, MemoryTechniqueStore,
};
use crate::storage::{AgentStore, ScenarioStore, TechniqueStore};

use super::ExecutionEngine;

pub(super) struct Harness {
    pub engine: ExecutionEngine,
    pub execution_store: Arc<MemoryExecutionStore>,
}

pub(super) fn online_agent(paw: &str) -> Agent {
    Agent {
        paw: paw.to_string(),
        hostname: format!("{paw}-host"),
        platform: "linux".to_string(),
        executors: vec!["sh".to_string()],
        status: AgentStatus::Online,
        last_seen: None,
    }
}

pub(super) fn safe_technique(id: &str) -> Technique {
    let mut t = Technique::new(id, id);
    t.platforms = vec!["linux".to_string()];
    t.tactics = vec!["discovery".to_string()];
    t.executors.insert(
        "linux".to_string(),
        ExecutorSpec {
            interpreter: "sh".to_string(),
            command: format!("run {id}"),
            cleanup: String::new(),
            timeout_secs: 60,
        },
    );
    t
}

pub(super) fn two_phase_scenario() -> Scenario {
    Scenario {
        id: "scn-1".to_string(),
        name: "kill chain".to_string(),
        description: String::new(),
        phases: vec![
            Phase {
                name: "discovery".to_string(),
                techniques: vec!["T1082".to_string()],
            },
            Phase {
                name: "execution".to_string(),
                techniques: vec!["T1059".to_string()],
            },
        ],
    }
}

/// Engine wired to fresh in-memory stores, seeded with the two-phase
/// scenario, its techniques, and the given agents.
pub(super) async fn harness(agents: &[Agent]) -> Harness {
    let execution_store = Arc::new(MemoryExecutionStore::new());
    let scenario_store = Arc::new(MemoryScenarioStore::new());
    let technique_store = Arc::new(MemoryTechniqueStore::new());
    let agent_store = Arc::new(MemoryAgentStore::new());

    scenario_store.save(&two_phase_scenario()).await.unwrap();
    technique_store.save(&safe_technique("T1082")).await.unwrap();
    technique_store.save(&safe_technique("T1059")).await.unwrap();
    for agent in agents {
        agent_store.save(agent).await.unwrap();
    }

    let engine = ExecutionEngine::new(
        execution_store.clone(),
        scenario_store,
        technique_store,
        agent_store.clone(),
    );
    Harness {
        engine,
        execution_store,
    }
}

pub(super) fn paws(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
