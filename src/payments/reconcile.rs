use crate::payments::types::{
    GatewaySignal, PaymentStatus, ReconciliationVerdict, VerificationResult,
};

pub const DEFAULT_DECLINE_REASON: &str = "payment declined";
pub const PENDING_REASON: &str = "payment still processing";
pub const DEFAULT_GATEWAY_FAILURE_REASON: &str = "payment failed";
pub const INDETERMINATE_REASON: &str = "unable to determine payment status";

/// Merges the gateway hint with the authoritative verification answer.
///
/// A confirmed `paid` status is the only path to `Success`. When the
/// authoritative answer is missing or ambiguous, an explicit gateway failure is
/// trusted; anything else is an `Error` that may be re-verified.
pub fn reconcile(
    signal: &GatewaySignal,
    verification: Option<&VerificationResult>,
) -> ReconciliationVerdict {
    let Some(verification) = verification else {
        return ReconciliationVerdict::Unresolvable;
    };

    if verification.api_call_succeeded {
        match verification.payment_status {
            Some(PaymentStatus::Paid) => {
                return ReconciliationVerdict::Success(verification.payload.clone());
            }
            Some(PaymentStatus::Failed) => {
                let reason = verification
                    .reason_text
                    .clone()
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DECLINE_REASON.to_string());
                return ReconciliationVerdict::Failure(reason);
            }
            Some(PaymentStatus::Pending) => {
                return ReconciliationVerdict::Pending(PENDING_REASON.to_string());
            }
            Some(PaymentStatus::Unknown) | None => {}
        }
    }

    if signal.is_likely_failure() {
        let reason = signal
            .message
            .clone()
            .unwrap_or_else(|| DEFAULT_GATEWAY_FAILURE_REASON.to_string());
        return ReconciliationVerdict::Failure(reason);
    }

    ReconciliationVerdict::Error(INDETERMINATE_REASON.to_string())
}
