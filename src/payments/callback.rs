//! Gateway redirect parameters and transaction-reference resolution.
//!
//! The external id is the value the verification endpoint expects. `trans_ref`
//! and `trans_id` / `transaction_id` only exist for older gateway integrations
//! and are consulted strictly in that order when the external id is missing.

use crate::payments::types::{ReferenceSource, TransactionReference};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Query parameters appended by the gateway on the return URL. All untrusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayCallback {
    #[serde(default, alias = "externalId", alias = "external-id")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub trans_ref: Option<String>,
    #[serde(default)]
    pub trans_id: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Display only; never used for any decision.
    #[serde(default)]
    pub subscription_plan: Option<String>,
}

impl GatewayCallback {
    /// Builds a callback from decoded query pairs. Unknown keys are ignored and
    /// the first non-blank occurrence of a repeated key wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut callback = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "external_id" | "externalId" | "external-id" => &mut callback.external_id,
                "status" => &mut callback.status,
                "trans_ref" => &mut callback.trans_ref,
                "trans_id" => &mut callback.trans_id,
                "transaction_id" => &mut callback.transaction_id,
                "message" => &mut callback.message,
                "subscription_plan" => &mut callback.subscription_plan,
                _ => continue,
            };
            let value = value.into();
            if slot.is_none() && !value.trim().is_empty() {
                *slot = Some(value);
            }
        }
        callback
    }

    /// Parses the full return URL the browser landed on.
    pub fn from_url(return_url: &str) -> Result<Self, url::ParseError> {
        let parsed = url::Url::parse(return_url)?;
        Ok(Self::from_pairs(parsed.query_pairs()))
    }

    /// Parses a bare query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Selects the single reference to verify, or `None` when nothing usable
    /// was supplied (the `Unresolvable` outcome).
    pub fn resolve_reference(&self) -> Option<TransactionReference> {
        let candidates = [
            (&self.external_id, ReferenceSource::ExternalId),
            (&self.trans_ref, ReferenceSource::TransRef),
            (&self.trans_id, ReferenceSource::TransId),
            (&self.transaction_id, ReferenceSource::TransId),
        ];

        let resolved = candidates.into_iter().find_map(|(value, source)| {
            value
                .as_deref()
                .and_then(|v| TransactionReference::new(v, source))
        });

        match &resolved {
            Some(reference) => debug!(
                source = %reference.source(),
                reference = %crate::logging::mask_reference(reference.value()),
                "resolved transaction reference from gateway callback"
            ),
            None => warn!("gateway callback carried no usable transaction reference"),
        }
        resolved
    }
}
