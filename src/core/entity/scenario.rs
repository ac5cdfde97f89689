use serde::{Deserialize, Serialize};

/// One step of a scenario's kill chain: a named phase listing technique ids
/// in the order the author wants them attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub techniques: Vec<String>,
}

/// An ordered sequence of phases. Phase order and in-phase technique order
/// are author-declared and preserved through planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub phases: Vec<Phase>,
}
