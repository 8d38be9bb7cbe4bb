use crate::config::{PollingConfig, VerificationConfig};
use crate::logging::mask_reference;
use crate::payments::callback::GatewayCallback;
use crate::payments::client::{verify_with_timeout, VerificationClient};
use crate::payments::error::ClientResult;
use crate::payments::http::HttpVerificationClient;
use crate::payments::reconcile::reconcile;
use crate::payments::types::{GatewaySignal, ReconciliationVerdict, TransactionReference};
use crate::services::manual_verification::ManualVerificationSession;
use crate::workers::payment_poller::{PaymentPoller, PollingHandle};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of handling one gateway redirect.
#[derive(Debug, Clone, Serialize)]
pub struct RedirectVerification {
    /// Kept so a manual retry can reuse it.
    pub reference: Option<TransactionReference>,
    pub signal: GatewaySignal,
    pub verdict: ReconciliationVerdict,
    /// Advisory plan name from the redirect, display only.
    pub subscription_plan: Option<String>,
}

/// Entry point for the two verification flows: a gateway redirect checked
/// once, or a push payment polled until it settles.
pub struct PaymentVerificationService {
    client: Arc<dyn VerificationClient>,
    polling: PollingConfig,
}

impl PaymentVerificationService {
    pub fn new(client: Arc<dyn VerificationClient>, polling: PollingConfig) -> Self {
        Self { client, polling }
    }

    pub fn from_config(config: &VerificationConfig) -> ClientResult<Self> {
        let client = HttpVerificationClient::new(config)?;
        Ok(Self::new(Arc::new(client), config.polling()))
    }

    /// Resolves, verifies once and reconciles a gateway redirect.
    pub async fn verify_redirect(&self, callback: &GatewayCallback) -> RedirectVerification {
        let reference = callback.resolve_reference();
        let signal = callback.signal();

        let verification = match &reference {
            Some(reference) => Some(
                verify_with_timeout(self.client.as_ref(), reference, self.polling.request_timeout)
                    .await,
            ),
            None => None,
        };
        let verdict = reconcile(&signal, verification.as_ref());

        match &reference {
            Some(r) => info!(
                reference = %mask_reference(r.value()),
                source = %r.source(),
                gateway_status = ?signal.status_code,
                verdict = verdict.as_str(),
                "gateway redirect reconciled"
            ),
            None => warn!(
                gateway_status = ?signal.status_code,
                "gateway redirect could not be verified: no transaction reference"
            ),
        }

        RedirectVerification {
            reference,
            signal,
            verdict,
            subscription_plan: callback
                .subscription_plan
                .clone()
                .filter(|p| !p.trim().is_empty()),
        }
    }

    pub fn poller(&self) -> PaymentPoller {
        PaymentPoller::new(Arc::clone(&self.client), self.polling)
    }

    /// Starts polling a push payment that will not come back through a redirect.
    pub fn start_polling(&self, reference: TransactionReference) -> PollingHandle {
        self.poller().start(reference)
    }

    pub fn manual_session(&self, reference: TransactionReference) -> ManualVerificationSession {
        ManualVerificationSession::new(
            Arc::clone(&self.client),
            reference,
            self.polling.request_timeout,
        )
    }

    /// Re-resolves the reference from a callback; `None` when it carries none.
    pub fn manual_session_for_callback(
        &self,
        callback: &GatewayCallback,
    ) -> Option<ManualVerificationSession> {
        let reference = callback.resolve_reference()?;
        Some(self.manual_session(reference).with_signal(callback.signal()))
    }

    /// One manual check of a callback, `Unresolvable` when no reference exists.
    pub async fn verify_manually(&self, callback: &GatewayCallback) -> ReconciliationVerdict {
        match self.manual_session_for_callback(callback) {
            Some(session) => session.verify().await,
            None => reconcile(&callback.signal(), None),
        }
    }
}
