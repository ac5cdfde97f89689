use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::technique::Technique;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Online,
    Offline,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Online => "online",
            AgentStatus::Offline => "offline",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "online" => Some(AgentStatus::Online),
            "offline" => Some(AgentStatus::Offline),
            _ => None,
        }
    }
}

/// A remote endpoint identified by its unique paw. Agents execute dispatched
/// commands and report back through the transport layer; this core only reads
/// their metadata to decide what can run where.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub paw: String,
    pub hostname: String,
    pub platform: String,
    /// Command interpreters the agent advertises (e.g. "sh", "powershell").
    pub executors: Vec<String>,
    pub status: AgentStatus,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Agent {
    pub fn is_online(&self) -> bool {
        self.status == AgentStatus::Online
    }

    /// Platform must match one of the technique's supported platforms and the
    /// technique must resolve an executor the agent can run.
    pub fn is_compatible(&self, technique: &Technique) -> bool {
        let platform_ok = technique
            .platforms
            .iter()
            .any(|p| p.eq_ignore_ascii_case(&self.platform));
        platform_ok
            && technique
                .executor_for_platform(&self.platform, &self.executors)
                .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::technique::{ExecutorSpec, Technique};

    fn linux_technique() -> Technique {
        let mut t = Technique::new("T1082", "System Information Discovery");
        t.platforms = vec!["linux".to_string()];
        t.executors.insert(
            "linux".to_string(),
            ExecutorSpec {
                interpreter: "sh".to_string(),
                command: "uname -a".to_string(),
                cleanup: String::new(),
                timeout_secs: 60,
            },
        );
        t
    }

    fn agent(platform: &str, executors: &[&str]) -> Agent {
        Agent {
            paw: "paw-1".to_string(),
            hostname: "host-1".to_string(),
            platform: platform.to_string(),
            executors: executors.iter().map(|s| s.to_string()).collect(),
            status: AgentStatus::Online,
            last_seen: None,
        }
    }

    #[test]
    fn compatible_when_platform_and_executor_match() {
        assert!(agent("linux", &["sh"]).is_compatible(&linux_technique()));
    }

    #[test]
    fn platform_match_is_case_insensitive() {
        assert!(agent("Linux", &["sh"]).is_compatible(&linux_technique()));
    }

    #[test]
    fn incompatible_on_platform_mismatch() {
        assert!(!agent("windows", &["powershell"]).is_compatible(&linux_technique()));
    }

    #[test]
    fn status_round_trip() {
        assert_eq!(AgentStatus::from_status("online"), Some(AgentStatus::Online));
        assert_eq!(AgentStatus::from_status("offline"), Some(AgentStatus::Offline));
        assert_eq!(AgentStatus::from_status("sleeping"), None);
        assert_eq!(AgentStatus::Online.as_str(), "online");
    }
}
