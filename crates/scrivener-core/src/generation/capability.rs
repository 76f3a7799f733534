//! The generation capability seam.

use async_trait::async_trait;
use transcript_ledger::{SessionId, Turn};

use super::error::GenerationResult;
use crate::corpus::Corpus;
use crate::registry::Agent;

/// Everything a role sees when asked for its next reply.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub session_id: &'a SessionId,
    pub role: &'a Agent,
    /// Transcript so far, in seq order
    pub transcript: &'a [Turn],
    /// Shared, read-only session context
    pub corpus: &'a Corpus,
}

impl GenerationRequest<'_> {
    pub fn profile(&self) -> &str {
        &self.role.profile
    }
}

/// Produces one reply for one role. Opaque to the orchestrator.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> GenerationResult<String>;
}
