use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How a technique runs on one platform: the interpreter to invoke, the
/// command itself, an optional cleanup command, and a time limit the dispatch
/// layer enforces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorSpec {
    pub interpreter: String,
    pub command: String,
    #[serde(default)]
    pub cleanup: String,
    pub timeout_secs: u32,
}

/// A single attack behavior (MITRE ATT&CK technique) with per-platform
/// executors and a safety classification. `tactics` keeps the author's
/// kill-chain ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technique {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tactics: Vec<String>,
    pub platforms: Vec<String>,
    /// Keyed by lowercase platform name.
    pub executors: HashMap<String, ExecutorSpec>,
    /// Safe techniques are non-destructive and allowed under safe mode.
    pub is_safe: bool,
}

impl Technique {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            tactics: Vec::new(),
            platforms: Vec::new(),
            executors: HashMap::new(),
            is_safe: true,
        }
    }

    /// Resolve the executor for a platform, honoring agent-advertised
    /// interpreter overrides: when the agent lists interpreters and the
    /// platform entry's interpreter is not among them, the agent's first
    /// interpreter is substituted while command, cleanup and timeout are
    /// kept. Returns `None` when the technique has no entry for the platform.
    pub fn executor_for_platform(
        &self,
        platform: &str,
        agent_executors: &[String],
    ) -> Option<ExecutorSpec> {
        let spec = self
            .executors
            .iter()
            .find(|(p, _)| p.eq_ignore_ascii_case(platform))
            .map(|(_, spec)| spec)?;

        if agent_executors.is_empty()
            || agent_executors
                .iter()
                .any(|e| e.eq_ignore_ascii_case(&spec.interpreter))
        {
            return Some(spec.clone());
        }

        let mut resolved = spec.clone();
        resolved.interpreter = agent_executors[0].clone();
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn technique_with(platform: &str, interpreter: &str) -> Technique {
        let mut t = Technique::new("T1059", "Command and Scripting Interpreter");
        t.platforms = vec![platform.to_string()];
        t.executors.insert(
            platform.to_string(),
            ExecutorSpec {
                interpreter: interpreter.to_string(),
                command: "whoami".to_string(),
                cleanup: "true".to_string(),
                timeout_secs: 30,
            },
        );
        t
    }

    #[test]
    fn resolves_platform_entry() {
        let t = technique_with("linux", "sh");
        let spec = t.executor_for_platform("linux", &["sh".to_string()]).unwrap();
        assert_eq!(spec.interpreter, "sh");
        assert_eq!(spec.command, "whoami");
    }

    #[test]
    fn platform_lookup_ignores_case() {
        let t = technique_with("Windows", "powershell");
        assert!(t
            .executor_for_platform("windows", &["powershell".to_string()])
            .is_some());
    }

    #[test]
    fn unknown_platform_yields_none() {
        let t = technique_with("linux", "sh");
        assert!(t.executor_for_platform("darwin", &[]).is_none());
    }

    #[test]
    fn agent_override_substitutes_interpreter() {
        let t = technique_with("linux", "bash");
        let spec = t
            .executor_for_platform("linux", &["zsh".to_string()])
            .unwrap();
        assert_eq!(spec.interpreter, "zsh");
        assert_eq!(spec.command, "whoami");
        assert_eq!(spec.timeout_secs, 30);
    }

    #[test]
    fn empty_agent_list_keeps_platform_interpreter() {
        let t = technique_with("linux", "bash");
        let spec = t.executor_for_platform("linux", &[]).unwrap();
        assert_eq!(spec.interpreter, "bash");
    }
}
