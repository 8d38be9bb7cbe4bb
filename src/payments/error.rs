use thiserror::Error;

pub type ClientResult<T> = Result<T, VerificationError>;

/// Failures of the verification call itself.
///
/// These never leave the engine: a failed call is folded into a
/// `VerificationResult` with `api_call_succeeded == false`.
#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Verification timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Verification endpoint error: status={status}, message={message}")]
    Provider { status: u16, message: String },

    #[error("Invalid verification response: {message}")]
    InvalidResponse { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl VerificationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            VerificationError::Network { .. } => true,
            VerificationError::Timeout { .. } => true,
            VerificationError::Provider { status, .. } => *status == 429 || *status >= 500,
            VerificationError::InvalidResponse { .. } => true,
            VerificationError::Configuration { .. } => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            VerificationError::Network { .. } | VerificationError::Timeout { .. } => {
                "Payment verification service is temporarily unavailable".to_string()
            }
            VerificationError::Provider { .. } | VerificationError::InvalidResponse { .. } => {
                "Payment verification service returned an unexpected response".to_string()
            }
            VerificationError::Configuration { .. } => {
                "Payment verification is not configured".to_string()
            }
        }
    }
}
