//! Fail-open utilities for graceful degradation
//!
//! Everything after a successful push is secondary: the pushed commit is the
//! deliverable, dashboard wiring is not. These helpers let the later stages
//! swallow failures while still leaving a record of what went wrong.
//!
//! DO NOT use fail-open for:
//! - git staging, committing or pushing
//! - remote setup of a fresh repository

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use shipit_core::fail_open::fail_open;
/// use shipit_core::Result;
///
/// async fn read_head() -> Result<String> {
///     Ok("abc123".to_string())
/// }
///
/// async fn example() {
///     let head = fail_open("read HEAD", || read_head()).await;
///     // head is None if read_head() failed
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

/// Result of one item in a best-effort batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult<K, T> {
    pub item: K,
    pub result: std::result::Result<T, String>,
}

impl<K, T> ItemResult<K, T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `f` for every item in order, never stopping on a failure
///
/// Failures are logged and kept as their display string, so callers can
/// assert on partial failure without reading logs.
pub async fn best_effort<K, I, F, Fut, T>(operation_name: &str, items: I, mut f: F) -> Vec<ItemResult<K, T>>
where
    K: Clone + std::fmt::Display,
    I: IntoIterator<Item = K>,
    F: FnMut(K) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut results = Vec::new();
    for item in items {
        let result = match f(item.clone()).await {
            Ok(val) => Ok(val),
            Err(e) => {
                warn!("{} failed for {} (skipped): {}", operation_name, item, e);
                Err(e.to_string())
            }
        };
        results.push(ItemResult { item, result });
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShipError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("test_op", || async { Ok::<_, ShipError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_failure() {
        let result = fail_open("test_op", || async {
            Err::<i32, _>(ShipError::Other("test error".to_string()))
        })
        .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_best_effort_continues_after_failure() {
        let mut seen = Vec::new();
        let results = best_effort("update", vec!["a", "b", "c"], |item| {
            seen.push(item);
            async move {
                if item == "a" {
                    Err(ShipError::Other("down".to_string()))
                } else {
                    Ok(item.len())
                }
            }
        })
        .await;

        assert_eq!(seen, vec!["a", "b", "c"]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].result, Err("down".to_string()));
        assert!(results[1].is_ok());
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn test_best_effort_empty() {
        let results: Vec<ItemResult<String, ()>> =
            best_effort("update", Vec::<String>::new(), |_| async { Ok::<_, ShipError>(()) }).await;
        assert!(results.is_empty());
    }
}
