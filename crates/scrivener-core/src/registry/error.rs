//! Error types for the agent registry.

/// Errors produced while building an agent registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate role name: {name}")]
    DuplicateRole { name: String },

    #[error("roster must mark exactly one human-proxy role, found {found}")]
    MissingHumanProxy { found: usize },

    #[error("roster is empty")]
    EmptyRoster,

    #[error("role name must not be blank")]
    BlankRoleName,
}

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
