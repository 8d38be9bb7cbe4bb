use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// Which callback field a transaction reference was taken from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    ExternalId,
    TransRef,
    TransId,
    Manual,
}

impl ReferenceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceSource::ExternalId => "external_id",
            ReferenceSource::TransRef => "trans_ref",
            ReferenceSource::TransId => "trans_id",
            ReferenceSource::Manual => "manual",
        }
    }
}

impl std::fmt::Display for ReferenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The identifier sent to the verification endpoint. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TransactionReference {
    value: String,
    source: ReferenceSource,
}

impl TransactionReference {
    /// Returns `None` for empty or whitespace-only values.
    pub fn new(value: impl Into<String>, source: ReferenceSource) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return None;
        }
        Some(Self { value, source })
    }

    /// A reference typed in by the user or carried over from an earlier session.
    pub fn manual(value: impl Into<String>) -> Option<Self> {
        Self::new(value, ReferenceSource::Manual)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> ReferenceSource {
        self.source
    }
}

impl std::fmt::Display for TransactionReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Provisional reading of the gateway redirect. Never final on its own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignalClass {
    Indeterminate,
    LikelyFailure,
    LikelySuccess,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewaySignal {
    pub status_code: Option<i64>,
    pub message: Option<String>,
    pub class: SignalClass,
}

impl GatewaySignal {
    /// The signal used when there was no redirect at all (push payments, manual retries).
    pub fn indeterminate() -> Self {
        Self {
            status_code: None,
            message: None,
            class: SignalClass::Indeterminate,
        }
    }

    pub fn is_likely_failure(&self) -> bool {
        self.class == SignalClass::LikelyFailure
    }
}

impl Default for GatewaySignal {
    fn default() -> Self {
        Self::indeterminate()
    }
}

/// Processor-confirmed payment status as reported by the verification endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Failed,
    Unknown,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Unknown => "unknown",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = std::convert::Infallible;

    /// Anything the endpoint does not document maps to `Unknown`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim().to_lowercase().as_str() {
            "paid" => PaymentStatus::Paid,
            "pending" => PaymentStatus::Pending,
            "failed" => PaymentStatus::Failed,
            _ => PaymentStatus::Unknown,
        })
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authoritative answer from the verification endpoint.
///
/// `payment_status` is only meaningful when `api_call_succeeded` is true.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationResult {
    pub api_call_succeeded: bool,
    pub payment_status: Option<PaymentStatus>,
    pub reason_text: Option<String>,
    /// The endpoint's `data` object, passed through untouched for display.
    pub payload: JsonValue,
}

impl VerificationResult {
    pub fn confirmed(
        payment_status: PaymentStatus,
        reason_text: Option<String>,
        payload: JsonValue,
    ) -> Self {
        Self {
            api_call_succeeded: true,
            payment_status: Some(payment_status),
            reason_text,
            payload,
        }
    }

    /// The call failed, timed out or returned a failure envelope.
    pub fn unavailable(reason_text: Option<String>) -> Self {
        Self {
            api_call_succeeded: false,
            payment_status: None,
            reason_text,
            payload: JsonValue::Null,
        }
    }

    pub fn amount(&self) -> Option<f64> {
        self.payload.get("amount").and_then(|v| {
            v.as_f64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        })
    }

    pub fn subscription_plan(&self) -> Option<&JsonValue> {
        self.payload
            .get("subscription_plan")
            .filter(|v| !v.is_null())
    }
}

/// The engine's single output per verification cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum ReconciliationVerdict {
    Success(JsonValue),
    Failure(String),
    Pending(String),
    Error(String),
    Unresolvable,
}

impl ReconciliationVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationVerdict::Success(_) => "success",
            ReconciliationVerdict::Failure(_) => "failure",
            ReconciliationVerdict::Pending(_) => "pending",
            ReconciliationVerdict::Error(_) => "error",
            ReconciliationVerdict::Unresolvable => "unresolvable",
        }
    }

    /// `Success`, `Failure` and `Unresolvable` end the flow; nothing re-verifies them.
    pub fn is_terminal(&self) -> bool {
        !self.is_retryable()
    }

    /// `Pending` and `Error` may be verified again, by polling or by hand.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconciliationVerdict::Pending(_) | ReconciliationVerdict::Error(_)
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReconciliationVerdict::Success(_))
    }

    pub fn payload(&self) -> Option<&JsonValue> {
        match self {
            ReconciliationVerdict::Success(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ReconciliationVerdict::Failure(reason)
            | ReconciliationVerdict::Pending(reason)
            | ReconciliationVerdict::Error(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ReconciliationVerdict::Success(_) => "Payment confirmed".to_string(),
            ReconciliationVerdict::Failure(reason) => reason.clone(),
            ReconciliationVerdict::Pending(_) => {
                "Your payment is still being processed. Please check again shortly".to_string()
            }
            ReconciliationVerdict::Error(_) => {
                "We could not confirm your payment yet. Please verify again".to_string()
            }
            ReconciliationVerdict::Unresolvable => {
                "No transaction reference was found. Please contact support".to_string()
            }
        }
    }
}

impl std::fmt::Display for ReconciliationVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{}: {}", self.as_str(), reason),
            None => write!(f, "{}", self.as_str()),
        }
    }
}
