//! Bounded immediate retry for per-step transport failures
//!
//! These retries are nested inside (and distinct from) the critique-driven
//! revision loop: they guard a single external call, not an iteration.

use std::future::Future;

/// Run `op`, retrying immediately up to `limit` additional times on error
///
/// Returns the first success, or the last error once the budget is spent.
///
/// # Errors
/// Propagates the final error after `limit` retries
pub async fn with_retries<T, E, F, Fut>(what: &str, limit: u32, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < limit => {
                attempt += 1;
                tracing::warn!(%error, attempt, limit, "{what} failed, retrying");
            }
            Err(error) => {
                tracing::warn!(%error, attempts = attempt + 1, "{what} failed, budget spent");
                return Err(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_first_try_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retries("op", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success_within_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retries("op", 3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget_spent() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retries("op", 2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("down".to_string()) }
        })
        .await;
        assert!(result.is_err());
        // 1 initial attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_limit_means_single_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retries("op", 0, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("down".to_string()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
