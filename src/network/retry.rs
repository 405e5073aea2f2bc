//! Retry logic with exponential backoff

use std::time::Duration;
use anyhow::Result;
use tracing::warn;
use crate::errors::{WatchError, WatchResult};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            exponential_base: 2.0,
        }
    }
}

pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    config: &RetryConfig,
    endpoint: &str,
) -> WatchResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= config.max_attempts => {
                return Err(WatchError::Transport {
                    endpoint: endpoint.to_string(),
                    message: format!("failed after {} attempts", attempt),
                    source: Some(e),
                });
            }
            Err(e) => {
                warn!(
                    "Feed '{}' attempt {}/{} failed: {}. Next try in {}ms",
                    endpoint, attempt, config.max_attempts, e, delay
                );

                tokio::time::sleep(Duration::from_millis(delay)).await;

                let scaled = (delay as f64 * config.exponential_base) as u64;
                let jitter = (scaled as f64 * 0.1 * rand::random::<f64>()) as u64;
                delay = scaled.min(config.max_delay_ms).saturating_add(jitter);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn returns_first_success_without_retrying() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(7u64)
            },
            &RetryConfig::default(),
            "primary",
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(anyhow::anyhow!("transient"))
                } else {
                    Ok(n)
                }
            },
            &RetryConfig::default(),
            "primary",
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: WatchResult<u64> = retry_with_backoff(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("still down"))
            },
            &RetryConfig::default(),
            "primary",
        )
        .await;

        match result {
            Err(WatchError::Transport { endpoint, .. }) => assert_eq!(endpoint, "primary"),
            other => panic!("expected transport error, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
