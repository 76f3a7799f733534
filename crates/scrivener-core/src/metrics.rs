//! Global atomic counters for Scrivener.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when the CLI exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    sessions_started: AtomicU64,
    turns_appended: AtomicU64,
    generation_retries: AtomicU64,
    gate_prompts: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            sessions_started: AtomicU64::new(0),
            turns_appended: AtomicU64::new(0),
            generation_retries: AtomicU64::new(0),
            gate_prompts: AtomicU64::new(0),
        }
    }

    pub fn inc_sessions_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "sessions_started", "counter incremented");
    }

    pub fn inc_turns_appended(&self) {
        self.turns_appended.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "turns_appended", "counter incremented");
    }

    pub fn inc_generation_retries(&self) {
        self.generation_retries.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "generation_retries", "counter incremented");
    }

    pub fn inc_gate_prompts(&self) {
        self.gate_prompts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "gate_prompts", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            sessions_started = self.sessions_started(),
            turns_appended = self.turns_appended(),
            generation_retries = self.generation_retries(),
            gate_prompts = self.gate_prompts(),
        );
    }

    pub fn sessions_started(&self) -> u64 {
        self.sessions_started.load(Ordering::Relaxed)
    }

    pub fn turns_appended(&self) -> u64 {
        self.turns_appended.load(Ordering::Relaxed)
    }

    pub fn generation_retries(&self) -> u64 {
        self.generation_retries.load(Ordering::Relaxed)
    }

    pub fn gate_prompts(&self) -> u64 {
        self.gate_prompts.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.sessions_started.store(0, Ordering::Relaxed);
        self.turns_appended.store(0, Ordering::Relaxed);
        self.generation_retries.store(0, Ordering::Relaxed);
        self.gate_prompts.store(0, Ordering::Relaxed);
    }
}
