//! Generation call controls: per-attempt timeout and retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{GenerationError, GenerationResult};
use crate::metrics::METRICS;
use crate::obs;

/// Timeout and retry bounds for one generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationPolicy {
    /// Maximum wall-clock time for a single attempt (milliseconds).
    pub timeout_ms: u64,
    /// Maximum number of retries after a transient failure (0 = run once).
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries (milliseconds).
    pub backoff_base_ms: u64,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

impl GenerationPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms.saturating_mul(2u64.saturating_pow(attempt - 1)))
    }
}

/// Run `call` under `policy`.
///
/// Timeouts and `Transient` errors are retried up to `max_retries` times with
/// exponential backoff, then escalated to `Fatal`. A `Fatal` error returns
/// immediately.
pub async fn generate_with_retry<F, Fut>(
    policy: &GenerationPolicy,
    role: &str,
    call: F,
) -> GenerationResult<String>
where
    F: Fn() -> Fut,
    Fut: Future<Output = GenerationResult<String>>,
{
    let max_attempts = policy.max_retries + 1;
    let timeout = Duration::from_millis(policy.timeout_ms);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        let error = match tokio::time::timeout(timeout, call()).await {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(GenerationError::Fatal(msg))) => return Err(GenerationError::Fatal(msg)),
            Ok(Err(GenerationError::Transient(msg))) => msg,
            Err(_elapsed) => format!("timed out after {}ms", policy.timeout_ms),
        };

        if attempt < max_attempts {
            METRICS.inc_generation_retries();
            obs::emit_generation_retry(role, attempt, &error);
            tokio::time::sleep(policy.backoff(attempt)).await;
        }
        last_error = error;
    }

    Err(GenerationError::Fatal(format!(
        "gave up after {max_attempts} attempt(s): {last_error}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> GenerationPolicy {
        GenerationPolicy {
            timeout_ms: 1_000,
            max_retries,
            backoff_base_ms: 10,
        }
    }

    #[test]
    fn test_policy_default() {
        let p = GenerationPolicy::default();
        assert_eq!(p.timeout_ms, 60_000);
        assert_eq!(p.max_retries, 2);
        assert_eq!(p.backoff_base_ms, 500);
    }

    #[test]
    fn test_backoff_doubles() {
        let p = GenerationPolicy::default();
        assert_eq!(p.backoff(1), Duration::from_millis(500));
        assert_eq!(p.backoff(2), Duration::from_millis(1_000));
        assert_eq!(p.backoff(3), Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let text = generate_with_retry(&fast_policy(2), "Writer", {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::Relaxed) == 0 {
                        Err(GenerationError::Transient("503".into()))
                    } else {
                        Ok("draft".to_string())
                    }
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(text, "draft");
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_transient_exhaustion_escalates_to_fatal() {
        let calls = Arc::new(AtomicU32::new(0));
        let err = generate_with_retry(&fast_policy(2), "Writer", {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::Relaxed);
                    Err::<String, _>(GenerationError::Transient("rate limited".into()))
                }
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, GenerationError::Fatal(ref m) if m.contains("rate limited")));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_fatal_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let err = generate_with_retry(&fast_policy(5), "Writer", {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::Relaxed);
                    Err::<String, _>(GenerationError::Fatal("bad request".into()))
                }
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err, GenerationError::Fatal("bad request".into()));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_transient() {
        let policy = GenerationPolicy {
            timeout_ms: 100,
            max_retries: 1,
            backoff_base_ms: 10,
        };
        let err = generate_with_retry(&policy, "Writer", || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok("late".to_string())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, GenerationError::Fatal(ref m) if m.contains("timed out")));
    }
}
