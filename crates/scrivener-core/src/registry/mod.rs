//! Agent Registry.
//!
//! Holds the fixed roster of a session: exactly one human-proxy role and any
//! number of generator roles, in insertion order. That order is the rotation
//! order the orchestrator follows.
//!
//! # Module layout
//!
//! - [`roles`]: `RoleSpec`, `Agent`, `RoleKind`, `Capability`
//! - [`roster`]: `standard_roster` and the role name constants
//! - [`error`]: `RegistryError`, `RegistryResult`

pub mod error;
pub mod roles;
pub mod roster;

use std::collections::HashMap;

pub use error::{RegistryError, RegistryResult};
pub use roles::{Agent, Capability, RoleKind, RoleSpec};
pub use roster::standard_roster;

/// Session-scoped set of agents, keyed by role name.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
    by_name: HashMap<String, usize>,
    human_proxy: usize,
}

impl AgentRegistry {
    /// Instantiate one agent per spec.
    ///
    /// Fails on an empty roster, a blank or repeated name, or anything other
    /// than exactly one human-proxy role.
    pub fn build(roster: Vec<RoleSpec>) -> RegistryResult<Self> {
        if roster.is_empty() {
            return Err(RegistryError::EmptyRoster);
        }

        let mut agents = Vec::with_capacity(roster.len());
        let mut by_name = HashMap::with_capacity(roster.len());
        for spec in &roster {
            if spec.name.trim().is_empty() {
                return Err(RegistryError::BlankRoleName);
            }
            if by_name.insert(spec.name.clone(), agents.len()).is_some() {
                return Err(RegistryError::DuplicateRole {
                    name: spec.name.clone(),
                });
            }
            agents.push(Agent::from_spec(spec));
        }

        let proxies: Vec<usize> = agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_human_proxy())
            .map(|(i, _)| i)
            .collect();
        if proxies.len() != 1 {
            return Err(RegistryError::MissingHumanProxy {
                found: proxies.len(),
            });
        }

        Ok(Self {
            agents,
            by_name,
            human_proxy: proxies[0],
        })
    }

    pub fn get(&self, name: &str) -> Option<&Agent> {
        self.by_name.get(name).map(|&i| &self.agents[i])
    }

    /// Rotation position of a role.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Agent at a rotation slot, wrapping around the roster.
    pub fn slot(&self, index: usize) -> &Agent {
        &self.agents[index % self.agents.len()]
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn human_proxy(&self) -> &Agent {
        &self.agents[self.human_proxy]
    }

    pub fn human_proxy_index(&self) -> usize {
        self.human_proxy
    }

    /// Slot after `index` in rotation order.
    pub fn next_slot(&self, index: usize) -> usize {
        (index + 1) % self.agents.len()
    }

    /// The specs this registry was built from, in order.
    pub fn specs(&self) -> Vec<RoleSpec> {
        self.agents.iter().map(Agent::to_spec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_roster_builds() {
        let reg = AgentRegistry::build(standard_roster()).unwrap();
        assert_eq!(reg.len(), 6);
        assert_eq!(reg.human_proxy().name, roster::USER_PROXY);
        assert_eq!(reg.human_proxy_index(), 0);
        assert_eq!(reg.slot(1).name, roster::PROOF_READER);
        assert_eq!(reg.slot(6).name, roster::USER_PROXY);
    }

    #[test]
    fn test_lookup_by_name() {
        let reg = AgentRegistry::build(standard_roster()).unwrap();
        let writer = reg.get(roster::WRITER).unwrap();
        assert_eq!(writer.kind, RoleKind::Generator);
        assert!(writer.profile.starts_with("Writer."));
        assert_eq!(reg.position(roster::WRITER), Some(2));
        assert!(reg.get("Editor").is_none());
    }

    #[test]
    fn test_specs_round_trip_through_build() {
        let reg = AgentRegistry::build(standard_roster()).unwrap();
        assert_eq!(reg.specs(), standard_roster());
    }

    #[test]
    fn test_next_slot_wraps() {
        let reg = AgentRegistry::build(standard_roster()).unwrap();
        assert_eq!(reg.next_slot(5), 0);
        assert_eq!(reg.next_slot(0), 1);
    }
}
