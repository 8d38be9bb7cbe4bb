use crate::payments::error::{ClientResult, VerificationError};
use crate::payments::types::{TransactionReference, VerificationResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Boundary to the backend's "verify transaction" endpoint.
///
/// Implementations must be stateless and safe to call concurrently from
/// unrelated sessions.
#[async_trait]
pub trait VerificationClient: Send + Sync {
    async fn verify_transaction(
        &self,
        reference: &TransactionReference,
    ) -> ClientResult<VerificationResult>;
}

/// Runs one verification call bounded by `timeout`.
///
/// Never fails: errors and timeouts come back as an unavailable result so the
/// reconciliation rules treat them like any other missing authoritative answer.
pub async fn verify_with_timeout(
    client: &dyn VerificationClient,
    reference: &TransactionReference,
    timeout: Duration,
) -> VerificationResult {
    let outcome = match tokio::time::timeout(timeout, client.verify_transaction(reference)).await
    {
        Ok(result) => result,
        Err(_) => Err(VerificationError::Timeout {
            timeout_secs: timeout.as_secs(),
        }),
    };

    match outcome {
        Ok(result) => result,
        Err(e) => {
            warn!(
                reference = %crate::logging::mask_reference(reference.value()),
                error = %e,
                retryable = e.is_retryable(),
                "verification call failed"
            );
            VerificationResult::unavailable(Some(e.user_message()))
        }
    }
}
