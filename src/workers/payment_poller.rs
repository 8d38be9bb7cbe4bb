use crate::config::PollingConfig;
use crate::logging::mask_reference;
use crate::payments::client::{verify_with_timeout, VerificationClient};
use crate::payments::reconcile::reconcile;
use crate::payments::types::{GatewaySignal, ReconciliationVerdict, TransactionReference};
use crate::services::manual_verification::ManualVerificationSession;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// `tokio::time::interval` panics on a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PollingState {
    Idle,
    Polling,
    Succeeded,
    Failed,
    /// Attempts used up without a terminal verdict; manual verification takes over.
    Exhausted,
}

/// One push-payment polling session.
///
/// Only the poller mutates it. Consumers get clones through
/// [`PollingHandle::subscribe`] for display.
#[derive(Debug, Clone, Serialize)]
pub struct PollingSession {
    session_id: Uuid,
    reference: TransactionReference,
    attempts_made: u32,
    max_attempts: u32,
    interval: Duration,
    state: PollingState,
    last_verdict: Option<ReconciliationVerdict>,
    started_at: Option<DateTime<Utc>>,
    last_attempt_at: Option<DateTime<Utc>>,
}

impl PollingSession {
    fn new(reference: TransactionReference, config: &PollingConfig) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            reference,
            attempts_made: 0,
            max_attempts: config.max_attempts,
            interval: config.interval,
            state: PollingState::Idle,
            last_verdict: None,
            started_at: None,
            last_attempt_at: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn reference(&self) -> &TransactionReference {
        &self.reference
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts_made)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> PollingState {
        self.state
    }

    pub fn last_verdict(&self) -> Option<&ReconciliationVerdict> {
        self.last_verdict.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
        self.last_attempt_at
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            PollingState::Succeeded | PollingState::Failed | PollingState::Exhausted
        )
    }
}

/// How a polling session ended.
#[derive(Debug, Clone)]
pub enum PollingOutcome {
    Succeeded(JsonValue),
    Failed(String),
    /// Not an error: the reference is handed to a manual session.
    Exhausted(ManualVerificationSession),
    /// Stopped by the consumer; no verdict is reported.
    Cancelled,
}

impl PollingOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollingOutcome::Succeeded(_) => "succeeded",
            PollingOutcome::Failed(_) => "failed",
            PollingOutcome::Exhausted(_) => "exhausted",
            PollingOutcome::Cancelled => "cancelled",
        }
    }

    pub fn into_manual_session(self) -> Option<ManualVerificationSession> {
        match self {
            PollingOutcome::Exhausted(session) => Some(session),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Re-verifies a push payment on a fixed cadence until it settles or the
/// attempt ceiling is reached.
#[derive(Clone)]
pub struct PaymentPoller {
    client: Arc<dyn VerificationClient>,
    config: PollingConfig,
}

impl std::fmt::Debug for PaymentPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentPoller")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PaymentPoller {
    pub fn new(client: Arc<dyn VerificationClient>, config: PollingConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// A fresh session in the `Idle` state.
    pub fn session(&self, reference: TransactionReference) -> PollingSession {
        PollingSession::new(reference, &self.config)
    }

    /// Spawns a polling session on the current runtime.
    pub fn start(&self, reference: TransactionReference) -> PollingHandle {
        let session = self.session(reference);
        let session_id = session.session_id;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (progress_tx, progress_rx) = watch::channel(session.clone());

        let poller = self.clone();
        let task =
            tokio::spawn(async move { poller.drive(session, cancel_rx, &progress_tx).await });

        PollingHandle {
            session_id,
            cancel_tx,
            progress_rx,
            task,
        }
    }

    /// Drives `session` to completion on the calling task.
    ///
    /// Sending `true` on the paired sender, or dropping it, cancels the session.
    pub async fn run(
        &self,
        session: PollingSession,
        cancel_rx: watch::Receiver<bool>,
    ) -> PollingOutcome {
        let (progress_tx, _) = watch::channel(session.clone());
        self.drive(session, cancel_rx, &progress_tx).await
    }

    async fn drive(
        &self,
        mut session: PollingSession,
        mut cancel_rx: watch::Receiver<bool>,
        progress: &watch::Sender<PollingSession>,
    ) -> PollingOutcome {
        let masked = mask_reference(session.reference.value());

        if *cancel_rx.borrow_and_update() {
            debug!(session_id = %session.session_id, "polling cancelled before start");
            return PollingOutcome::Cancelled;
        }

        session.state = PollingState::Polling;
        session.started_at = Some(Utc::now());
        progress.send_replace(session.clone());

        info!(
            session_id = %session.session_id,
            reference = %masked,
            max_attempts = session.max_attempts,
            interval_secs = session.interval.as_secs(),
            "payment polling started"
        );

        // Ticks are spaced start-to-start. A call that outlasts the interval
        // delays the next tick rather than letting calls overlap.
        let mut ticker = tokio::time::interval(self.config.interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel_rx) => {
                    info!(session_id = %session.session_id, attempt = session.attempts_made, "payment polling cancelled");
                    return PollingOutcome::Cancelled;
                }
                _ = ticker.tick() => {}
            }

            session.attempts_made += 1;
            session.last_attempt_at = Some(Utc::now());

            let verification = tokio::select! {
                biased;
                _ = cancelled(&mut cancel_rx) => {
                    info!(session_id = %session.session_id, attempt = session.attempts_made, "payment polling cancelled");
                    return PollingOutcome::Cancelled;
                }
                result = verify_with_timeout(
                    self.client.as_ref(),
                    &session.reference,
                    self.config.request_timeout,
                ) => result,
            };

            let verdict = reconcile(&GatewaySignal::indeterminate(), Some(&verification));
            session.last_verdict = Some(verdict.clone());

            match verdict {
                ReconciliationVerdict::Success(payload) => {
                    session.state = PollingState::Succeeded;
                    progress.send_replace(session.clone());
                    info!(
                        session_id = %session.session_id,
                        reference = %masked,
                        attempts = session.attempts_made,
                        "payment confirmed by polling"
                    );
                    return PollingOutcome::Succeeded(payload);
                }
                ReconciliationVerdict::Failure(reason) => {
                    session.state = PollingState::Failed;
                    progress.send_replace(session.clone());
                    warn!(
                        session_id = %session.session_id,
                        reference = %masked,
                        attempts = session.attempts_made,
                        reason = %reason,
                        "payment failed during polling"
                    );
                    return PollingOutcome::Failed(reason);
                }
                verdict => {
                    if session.attempts_made >= session.max_attempts {
                        session.state = PollingState::Exhausted;
                        progress.send_replace(session.clone());
                        info!(
                            session_id = %session.session_id,
                            reference = %masked,
                            attempts = session.attempts_made,
                            last_verdict = %verdict,
                            "polling attempts exhausted; handing off to manual verification"
                        );
                        let manual = ManualVerificationSession::new(
                            Arc::clone(&self.client),
                            session.reference.clone(),
                            self.config.request_timeout,
                        )
                        .with_last_verdict(verdict);
                        return PollingOutcome::Exhausted(manual);
                    }

                    progress.send_replace(session.clone());
                    debug!(
                        session_id = %session.session_id,
                        attempt = session.attempts_made,
                        max_attempts = session.max_attempts,
                        verdict = %verdict,
                        "payment not settled yet; waiting for next attempt"
                    );
                }
            }
        }
    }
}

/// Resolves once cancellation is requested or every sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Consumer side of a spawned polling session.
///
/// Dropping the handle cancels the session.
#[derive(Debug)]
pub struct PollingHandle {
    session_id: Uuid,
    cancel_tx: watch::Sender<bool>,
    progress_rx: watch::Receiver<PollingSession>,
    task: JoinHandle<PollingOutcome>,
}

impl PollingHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Stops the schedule immediately, including an in-flight verification call.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Read-only view of the session, updated after every attempt.
    pub fn subscribe(&self) -> watch::Receiver<PollingSession> {
        self.progress_rx.clone()
    }

    pub fn snapshot(&self) -> PollingSession {
        self.progress_rx.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the session to end.
    pub async fn outcome(self) -> PollingOutcome {
        let PollingHandle {
            cancel_tx, task, ..
        } = self;
        let joined = task.await;
        drop(cancel_tx);

        match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => PollingOutcome::Cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
