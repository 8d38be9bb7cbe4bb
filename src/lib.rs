//! Subscription payment verification.
//!
//! Reconciles untrusted gateway redirect parameters with the backend's
//! authoritative verify-transaction endpoint, polls push payments on a bounded
//! schedule and falls back to manual re-verification.

pub mod config;
pub mod logging;
pub mod payments;
pub mod services;
pub mod workers;

pub use config::{ConfigError, PollingConfig, VerificationConfig};
pub use payments::callback::GatewayCallback;
pub use payments::client::VerificationClient;
pub use payments::reconcile::reconcile;
pub use payments::types::{
    GatewaySignal, PaymentStatus, ReconciliationVerdict, ReferenceSource, SignalClass,
    TransactionReference, VerificationResult,
};
pub use services::manual_verification::ManualVerificationSession;
pub use services::payment_verification::{PaymentVerificationService, RedirectVerification};
pub use workers::payment_poller::{
    PaymentPoller, PollingHandle, PollingOutcome, PollingSession, PollingState,
};
