//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap collaborator calls with a deadline
//! - Cancel the pending call cleanly when the deadline passes
//! - Record the outcome of every call
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A timeout maps to [`CollaboratorError::Timeout`], never to a default answer

use std::future::Future;
use std::time::{Duration, Instant};

use crate::collaborators::{CollaboratorError, CollaboratorResult};
use crate::observability::metrics;

/// Await `fut` for at most `deadline`.
pub async fn with_deadline<T, F>(provider: &'static str, deadline: Duration, fut: F) -> CollaboratorResult<T>
where
    F: Future<Output = CollaboratorResult<T>>,
{
    let start = Instant::now();
    let result = match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout {
            provider,
            after_ms: deadline.as_millis() as u64,
        }),
    };

    let outcome = match &result {
        Ok(_) => "ok",
        Err(CollaboratorError::Timeout { .. }) => "timeout",
        Err(_) => "error",
    };
    if let Err(e) = &result {
        tracing::warn!(provider, error = %e, "External call failed");
    }
    metrics::record_external_call(provider, outcome, start);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_fast_calls() {
        let result = with_deadline("catalog", Duration::from_millis(50), async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let result: CollaboratorResult<()> = with_deadline(
            "inventory",
            Duration::from_millis(20),
            std::future::pending(),
        )
        .await;
        assert_eq!(
            result,
            Err(CollaboratorError::Timeout {
                provider: "inventory",
                after_ms: 20
            })
        );
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let result: CollaboratorResult<()> = with_deadline("region", Duration::from_millis(50), async {
            Err(CollaboratorError::Unavailable("region".into()))
        })
        .await;
        assert_eq!(result, Err(CollaboratorError::Unavailable("region".into())));
    }
}
