//! Session entry point: what the surrounding application calls.
//!
//! - [`manager`]: `SessionManager`, `SeedSelector`, `SessionSummary`
//! - [`error`]: `SessionError`, `SessionResult`

pub mod error;
pub mod manager;

pub use error::{SessionError, SessionResult};
pub use manager::{SeedSelector, SessionManager, SessionSummary};
