//! Generation capability.
//!
//! # Module layout
//!
//! - [`capability`]: `Generator` trait and `GenerationRequest`
//! - [`error`]: `GenerationError`, `GenerationResult`
//! - [`retry`]: `GenerationPolicy`, `generate_with_retry`
//! - [`openai`]: `OpenAiGenerator`, `OpenAiConfig`

pub mod capability;
pub mod error;
pub mod openai;
pub mod retry;

pub use capability::{GenerationRequest, Generator};
pub use error::{GenerationError, GenerationResult};
pub use openai::{OpenAiConfig, OpenAiGenerator};
pub use retry::{generate_with_retry, GenerationPolicy};
