use crate::config::VerificationConfig;
use crate::payments::client::VerificationClient;
use crate::payments::error::{ClientResult, VerificationError};
use crate::payments::types::{PaymentStatus, TransactionReference, VerificationResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, info};

/// Calls the backend's verify-transaction endpoint over HTTP.
///
/// One call per invocation; repetition is the polling controller's job.
#[derive(Clone)]
pub struct HttpVerificationClient {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
    timeout: Duration,
}

impl HttpVerificationClient {
    pub fn new(config: &VerificationConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| VerificationError::Configuration {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.verify_endpoint(),
            api_token: config.api_token.clone(),
            timeout: config.request_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_transport_error(&self, err: reqwest::Error) -> VerificationError {
        if err.is_timeout() {
            VerificationError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            VerificationError::Network {
                message: format!("verification request failed: {}", err),
            }
        }
    }
}

#[async_trait]
impl VerificationClient for HttpVerificationClient {
    async fn verify_transaction(
        &self,
        reference: &TransactionReference,
    ) -> ClientResult<VerificationResult> {
        let payload = serde_json::json!({ "transaction_id": reference.value() });

        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&payload);
        if let Some(token) = self.api_token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        debug!(status = %status, "verification endpoint responded");
        let result = parse_verification_response(status.as_u16(), &body)?;

        info!(
            reference = %crate::logging::mask_reference(reference.value()),
            api_call_succeeded = result.api_call_succeeded,
            payment_status = ?result.payment_status,
            "transaction verification completed"
        );
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
struct VerifyEnvelope {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<JsonValue>,
}

/// Interprets the endpoint's HTTP status and body.
///
/// Non-2xx is an error; a `status: false` envelope is a well-formed answer
/// saying the lookup did not succeed.
pub fn parse_verification_response(status: u16, body: &str) -> ClientResult<VerificationResult> {
    if !(200..300).contains(&status) {
        return Err(VerificationError::Provider {
            status,
            message: extract_message(body).unwrap_or_else(|| format!("HTTP {}", status)),
        });
    }

    let envelope: VerifyEnvelope =
        serde_json::from_str(body).map_err(|e| VerificationError::InvalidResponse {
            message: format!("invalid verification JSON response: {}", e),
        })?;

    if !envelope.status {
        return Ok(VerificationResult::unavailable(envelope.message));
    }

    let data = envelope.data.unwrap_or_else(|| serde_json::json!({}));
    let payment_status = data
        .get("status")
        .and_then(|v| v.as_str())
        .map(|s| s.parse::<PaymentStatus>().unwrap_or(PaymentStatus::Unknown))
        .unwrap_or(PaymentStatus::Unknown);
    let reason_text = data
        .get("reason")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(VerificationResult::confirmed(payment_status, reason_text, data))
}

fn extract_message(body: &str) -> Option<String> {
    serde_json::from_str::<JsonValue>(body)
        .ok()?
        .get("message")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
