use crate::logging::mask_reference;
use crate::payments::client::{verify_with_timeout, VerificationClient};
use crate::payments::reconcile::reconcile;
use crate::payments::types::{GatewaySignal, ReconciliationVerdict, TransactionReference};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// User-triggered re-verification of a known reference.
///
/// Each call to [`verify`](Self::verify) performs exactly one verification
/// cycle and returns its verdict. Nothing is retried and nothing is mutated, so
/// invoking it repeatedly is safe.
#[derive(Clone)]
pub struct ManualVerificationSession {
    client: Arc<dyn VerificationClient>,
    reference: TransactionReference,
    signal: GatewaySignal,
    timeout: Duration,
    last_verdict: Option<ReconciliationVerdict>,
}

impl std::fmt::Debug for ManualVerificationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualVerificationSession")
            .field("reference", &self.reference)
            .field("signal", &self.signal)
            .field("timeout", &self.timeout)
            .field("last_verdict", &self.last_verdict)
            .finish_non_exhaustive()
    }
}

impl ManualVerificationSession {
    pub fn new(
        client: Arc<dyn VerificationClient>,
        reference: TransactionReference,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            reference,
            signal: GatewaySignal::indeterminate(),
            timeout,
            last_verdict: None,
        }
    }

    /// Keeps the gateway hint from the original redirect, if there was one.
    pub fn with_signal(mut self, signal: GatewaySignal) -> Self {
        self.signal = signal;
        self
    }

    /// The verdict that led to the hand-off, for display.
    pub fn with_last_verdict(mut self, verdict: ReconciliationVerdict) -> Self {
        self.last_verdict = Some(verdict);
        self
    }

    pub fn reference(&self) -> &TransactionReference {
        &self.reference
    }

    pub fn signal(&self) -> &GatewaySignal {
        &self.signal
    }

    pub fn last_verdict(&self) -> Option<&ReconciliationVerdict> {
        self.last_verdict.as_ref()
    }

    pub async fn verify(&self) -> ReconciliationVerdict {
        let verification =
            verify_with_timeout(self.client.as_ref(), &self.reference, self.timeout).await;
        let verdict = reconcile(&self.signal, Some(&verification));

        info!(
            reference = %mask_reference(self.reference.value()),
            source = %self.reference.source(),
            verdict = verdict.as_str(),
            "manual payment verification completed"
        );
        verdict
    }
}
