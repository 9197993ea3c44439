//! Deadlines for storage calls.
//!
//! Dropping a store future cancels the in-flight call (a `PostgreSQL`
//! transaction rolls back when its handle is dropped). Increments are never
//! rolled back once committed, so a caller that times out after a
//! successful increment simply does not learn the result.

use std::future::Future;
use std::time::Duration;

use crate::store::StoreError;

/// Run `fut`, failing with [`StoreError::Timeout`] if it has not finished
/// within `timeout`.
pub async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_elapsed| StoreError::Timeout(millis(timeout)))?
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let result: Result<(), StoreError> = with_deadline(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout(50))));
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let result = with_deadline(Duration::from_secs(1), async { Ok::<_, StoreError>(3) }).await;
        assert!(matches!(result, Ok(3)));
    }
}
