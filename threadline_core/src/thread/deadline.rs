use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ThreadError;

/// Deadline services use until told otherwise.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Runs `operation` under a deadline.
///
/// On expiry the future is dropped mid-flight; any transaction it held is
/// dropped uncommitted and rolls back, so nothing is partially applied.
pub async fn within<T, F>(limit: Duration, operation: F) -> Result<T, ThreadError>
where
    F: Future<Output = Result<T, ThreadError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            warn!(?limit, "operation deadline elapsed");
            Err(ThreadError::Timeout(limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn passes_through_results_within_the_limit() {
        let value = within(Duration::from_secs(1), async { Ok::<_, ThreadError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn times_out_slow_operations() {
        let err = within(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ThreadError>(())
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
