//! Agent activity hints shown in the agent swarm panel.
//!
//! This is a best-effort display map, not a mirror of backend state: a
//! response marks the orchestrator `Active` and a timer flips it back to
//! `Standby`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MASTER_ORCHESTRATOR: &str = "Master Orchestrator";

/// Agents listed in the demo view's swarm panel.
pub const DEFAULT_ROSTER: [&str; 5] = [
    MASTER_ORCHESTRATOR,
    "Clinical Trials",
    "Patent Analyst",
    "Market Research",
    "Regulatory Check",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Active,
    Standby,
}

impl AgentStatus {
    pub fn label(self) -> &'static str {
        match self {
            AgentStatus::Active => "Active",
            AgentStatus::Standby => "Standby",
        }
    }
}

/// Agent name → status. Ordered so renders are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentActivity(BTreeMap<String, AgentStatus>);

impl AgentActivity {
    /// The demo roster, every agent `Active`.
    pub fn roster() -> Self {
        Self(
            DEFAULT_ROSTER
                .iter()
                .map(|name| (name.to_string(), AgentStatus::Active))
                .collect(),
        )
    }

    pub fn single(agent: impl Into<String>, status: AgentStatus) -> Self {
        let mut map = BTreeMap::new();
        map.insert(agent.into(), status);
        Self(map)
    }

    /// Shallow merge: entries in `updates` overwrite, everything else is kept.
    pub fn merge(&mut self, updates: &AgentActivity) {
        for (name, status) in &updates.0 {
            self.0.insert(name.clone(), *status);
        }
    }

    pub fn get(&self, agent: &str) -> Option<AgentStatus> {
        self.0.get(agent).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AgentStatus)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_starts_active() {
        let roster = AgentActivity::roster();
        assert_eq!(roster.len(), 5);
        assert!(roster.iter().all(|(_, s)| s == AgentStatus::Active));
    }

    #[test]
    fn test_merge_overwrites_only_named_agents() {
        let mut roster = AgentActivity::roster();
        roster.merge(&AgentActivity::single(MASTER_ORCHESTRATOR, AgentStatus::Standby));
        assert_eq!(roster.get(MASTER_ORCHESTRATOR), Some(AgentStatus::Standby));
        assert_eq!(roster.get("Patent Analyst"), Some(AgentStatus::Active));
        assert_eq!(roster.len(), 5);
    }

    #[test]
    fn test_serialises_as_plain_map() {
        let one = AgentActivity::single("Patent Analyst", AgentStatus::Standby);
        assert_eq!(
            serde_json::to_string(&one).unwrap(),
            r#"{"Patent Analyst":"Standby"}"#
        );
    }
}
