//! Race a future against a wall-clock deadline.

use std::future::Future;
use std::time::Duration;

/// Await `future` for at most `limit`.
///
/// Returns `None` when the deadline passes first; the caller decides on the
/// degraded path. The pending future is dropped.
pub async fn with_timeout<F>(label: &str, limit: Duration, future: F) -> Option<F::Output>
where
    F: Future,
{
    match tokio::time::timeout(limit, future).await {
        Ok(output) => Some(output),
        Err(_) => {
            tracing::warn!(
                target: "repolens::remote",
                operation = label,
                limit_ms = limit.as_millis() as u64,
                "deadline elapsed, using fallback"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fast_future_completes() {
        let out = with_timeout("quick", Duration::from_secs(1), async { 7 }).await;
        assert_eq!(out, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_future_yields_none() {
        let out = with_timeout(
            "hang",
            Duration::from_secs(45),
            std::future::pending::<()>(),
        )
        .await;
        assert_eq!(out, None);
    }
}
