//! Human Gate.
//!
//! Inserts the operator into the otherwise automated rotation. A prompt that
//! matches the feedback pattern is offered as three choices (continue, give
//! feedback, exit); any other prompt goes straight to free-text input. Both
//! waits are bounded. The gate always hands a single string back to the
//! orchestrator and re-arms itself for the next human-proxy turn.
//!
//! ```text
//! AWAITING_PROMPT --feedback prompt--> AWAITING_ACTION --continue/exit--> RESOLVED
//!        |                                   |
//!        |                                feedback
//!        |                                   v
//!        +-------other prompt-------> AWAITING_FREEFORM --text/timeout--> RESOLVED
//! ```

pub mod capability;
pub mod error;
pub mod gate;

pub use capability::{GateChoice, HumanInteraction, InteractionError};
pub use error::{GateError, GateResult};
pub use gate::{
    GateConfig, GateOutcome, GateState, HumanGate, CHOICE_PROMPT, EXIT_TOKEN, FEEDBACK_PROMPT,
};
