//! Role vocabulary: `RoleSpec`, `Agent`, `RoleKind`, `Capability`.

use serde::{Deserialize, Serialize};

/// Whether a role is the operator's slot or an automated generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    HumanProxy,
    Generator,
}

/// What an agent is allowed to do during a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    GenerateReply,
    AcceptHumanOverride,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::GenerateReply => write!(f, "generate_reply"),
            Capability::AcceptHumanOverride => write!(f, "accept_human_override"),
        }
    }
}

/// Declarative description of one roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub name: String,
    #[serde(default)]
    pub human_proxy: bool,
    /// Static instruction profile guiding the role's replies
    pub profile: String,
}

impl RoleSpec {
    pub fn generator(name: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            human_proxy: false,
            profile: profile.into(),
        }
    }

    pub fn human_proxy(name: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            human_proxy: true,
            profile: profile.into(),
        }
    }
}

/// A role instantiated for one session. Immutable for the session lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    pub kind: RoleKind,
    pub profile: String,
    pub capabilities: Vec<Capability>,
}

impl Agent {
    pub fn from_spec(spec: &RoleSpec) -> Self {
        let (kind, capabilities) = if spec.human_proxy {
            (RoleKind::HumanProxy, vec![Capability::AcceptHumanOverride])
        } else {
            (RoleKind::Generator, vec![Capability::GenerateReply])
        };
        Self {
            name: spec.name.clone(),
            kind,
            profile: spec.profile.clone(),
            capabilities,
        }
    }

    pub fn is_human_proxy(&self) -> bool {
        self.kind == RoleKind::HumanProxy
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Convert back to the spec it was built from.
    pub fn to_spec(&self) -> RoleSpec {
        RoleSpec {
            name: self.name.clone(),
            human_proxy: self.is_human_proxy(),
            profile: self.profile.clone(),
        }
    }
}
