use crate::constants::{llm_retry, retry as retry_constants};
use crate::errors::PluginError;
use crate::services::logger::Logger;
use std::future::Future;
use std::time::Duration;

/// Bounded attempts with random exponential backoff.
///
/// The wait before attempt `n + 1` is drawn uniformly from
/// `[min_delay_ms, min(max_delay_ms, max(min_delay_ms, base_delay_ms * 2^(n-1)))]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn target_api() -> Self {
        Self {
            max_attempts: retry_constants::MAX_ATTEMPTS,
            base_delay_ms: retry_constants::MIN_DELAY_MS,
            min_delay_ms: retry_constants::MIN_DELAY_MS,
            max_delay_ms: retry_constants::MAX_DELAY_MS,
        }
    }

    pub fn llm_transport() -> Self {
        Self {
            max_attempts: llm_retry::MAX_ATTEMPTS,
            base_delay_ms: llm_retry::MIN_DELAY_MS,
            min_delay_ms: llm_retry::MIN_DELAY_MS,
            max_delay_ms: llm_retry::MAX_DELAY_MS,
        }
    }

    /// Same attempt budget, no waiting. Used by tests.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn delay_bounds(&self, attempt: usize) -> (u64, u64) {
        let exponent = attempt.saturating_sub(1).min(32) as u32;
        let grown = self.base_delay_ms.saturating_mul(1u64 << exponent);
        let upper = grown.max(self.min_delay_ms).min(self.max_delay_ms);
        (self.min_delay_ms.min(upper), upper)
    }

    pub fn compute_delay(&self, attempt: usize) -> Duration {
        let (low, high) = self.delay_bounds(attempt);
        let spread = (high - low) as f64;
        let delay = low as f64 + rand::random::<f64>() * spread;
        Duration::from_millis(delay.max(0.0) as u64)
    }
}

/// Runs `op` until it succeeds, returns a non-retryable error, or the attempts run out.
/// The closure receives the 1-based attempt number. The last error is returned.
pub async fn retry_async<T, F, Fut>(
    policy: &RetryPolicy,
    logger: &Logger,
    label: &str,
    mut op: F,
) -> Result<T, PluginError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, PluginError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.retryable || attempt >= max_attempts {
                    return Err(err);
                }
                let delay = policy.compute_delay(attempt);
                logger.warn(
                    &format!("{} failed, retrying", label),
                    Some(&serde_json::json!({
                        "attempt": attempt,
                        "max_attempts": max_attempts,
                        "delay_ms": delay.as_millis() as u64,
                        "error": err.message,
                    })),
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{retry_async, RetryPolicy};
    use crate::errors::PluginError;
    use crate::services::logger::Logger;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delay_bounds_grow_and_clamp() {
        let policy = RetryPolicy::target_api();
        assert_eq!(policy.delay_bounds(1), (1_000, 1_000));
        assert_eq!(policy.delay_bounds(2), (1_000, 2_000));
        assert_eq!(policy.delay_bounds(10), (1_000, 60_000));
        assert_eq!(policy.delay_bounds(500), (1_000, 60_000));
        for attempt in 1..8 {
            let (low, high) = policy.delay_bounds(attempt);
            let delay = policy.compute_delay(attempt).as_millis() as u64;
            assert!(delay >= low && delay <= high);
        }
    }

    #[tokio::test]
    async fn stops_after_max_attempts_with_last_error() {
        let calls = AtomicUsize::new(0);
        let logger = Logger::new("test");
        let result: Result<(), PluginError> =
            retry_async(&RetryPolicy::immediate(2), &logger, "op", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(PluginError::upstream(format!("attempt {}", attempt))) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.expect_err("error").message, "attempt 2");
    }

    #[tokio::test]
    async fn non_retryable_errors_stop_immediately() {
        let calls = AtomicUsize::new(0);
        let logger = Logger::new("test");
        let result: Result<(), PluginError> =
            retry_async(&RetryPolicy::immediate(5), &logger, "op", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PluginError::invalid_params("bad header")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_on_a_later_attempt() {
        let logger = Logger::new("test");
        let result = retry_async(&RetryPolicy::immediate(3), &logger, "op", |attempt| async move {
            if attempt < 3 {
                Err(PluginError::retryable("flaky"))
            } else {
                Ok(attempt)
            }
        })
        .await;
        assert_eq!(result.expect("value"), 3);
    }
}
