use crate::payments::callback::GatewayCallback;
use crate::payments::types::{GatewaySignal, SignalClass};
use tracing::debug;

const FAILURE_KEYWORD: &str = "failed";

/// Classifies the gateway's redirect status. Advisory input to reconciliation only.
///
/// A status that does not parse as an integer is treated as absent. Any
/// integer, in range or not, counts as a code and disables the message rule.
pub fn interpret_signal(status: Option<&str>, message: Option<&str>) -> GatewaySignal {
    let status_code = status.and_then(|s| s.trim().parse::<i64>().ok());
    let message = message
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string);

    let class = match status_code {
        Some(code) => classify_code(code),
        None => match message.as_deref() {
            Some(m) if m.to_lowercase().contains(FAILURE_KEYWORD) => SignalClass::LikelyFailure,
            _ => SignalClass::Indeterminate,
        },
    };

    debug!(status_code = ?status_code, class = ?class, "interpreted gateway signal");

    GatewaySignal {
        status_code,
        message,
        class,
    }
}

fn classify_code(code: i64) -> SignalClass {
    match code {
        200..=299 => SignalClass::LikelySuccess,
        400..=500 => SignalClass::LikelyFailure,
        _ => SignalClass::Indeterminate,
    }
}

impl GatewayCallback {
    pub fn signal(&self) -> GatewaySignal {
        interpret_signal(self.status.as_deref(), self.message.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::reconcile::reconcile;
    use crate::payments::types::{ReconciliationVerdict, VerificationResult};

    #[test]
    fn client_error_codes_and_500_are_likely_failures() {
        for code in ["400", "402", "499", "500"] {
            assert_eq!(
                interpret_signal(Some(code), None).class,
                SignalClass::LikelyFailure,
                "code {}",
                code
            );
        }
    }

    #[test]
    fn success_range_is_likely_success() {
        assert_eq!(interpret_signal(Some("200"), None).class, SignalClass::LikelySuccess);
        assert_eq!(interpret_signal(Some("299"), None).class, SignalClass::LikelySuccess);
    }

    #[test]
    fn other_codes_are_indeterminate() {
        for code in ["100", "302", "501", "503"] {
            assert_eq!(
                interpret_signal(Some(code), None).class,
                SignalClass::Indeterminate,
                "code {}",
                code
            );
        }
    }

    #[test]
    fn failure_keyword_only_applies_without_code() {
        assert_eq!(
            interpret_signal(None, Some("Transaction FAILED by issuer")).class,
            SignalClass::LikelyFailure
        );
        assert_eq!(
            interpret_signal(Some("200"), Some("failed")).class,
            SignalClass::LikelySuccess
        );
        assert_eq!(
            interpret_signal(None, Some("completed")).class,
            SignalClass::Indeterminate
        );
    }

    #[test]
    fn non_numeric_status_counts_as_missing() {
        let signal = interpret_signal(Some("error"), Some("payment failed"));
        assert_eq!(signal.status_code, None);
        assert_eq!(signal.class, SignalClass::LikelyFailure);
        assert_eq!(signal.message.as_deref(), Some("payment failed"));
    }

    #[test]
    fn out_of_range_integers_are_codes_not_missing() {
        for code in ["-1", "70000", "99999999999"] {
            let signal = interpret_signal(Some(code), Some("payment failed"));
            assert!(signal.status_code.is_some(), "code {}", code);
            assert_eq!(signal.class, SignalClass::Indeterminate, "code {}", code);
            assert!(matches!(
                reconcile(&signal, Some(&VerificationResult::unavailable(None))),
                ReconciliationVerdict::Error(_)
            ));
        }
    }

    #[test]
    fn message_is_kept_verbatim() {
        let signal = interpret_signal(None, Some("  Payment failed: card expired "));
        assert_eq!(signal.message.as_deref(), Some("  Payment failed: card expired "));
        assert_eq!(signal.class, SignalClass::LikelyFailure);

        assert_eq!(interpret_signal(None, Some("   ")).message, None);
    }

    #[test]
    fn nothing_supplied_is_indeterminate() {
        assert_eq!(interpret_signal(None, None), GatewaySignal::indeterminate());
        assert_eq!(GatewayCallback::default().signal(), GatewaySignal::indeterminate());
    }
}
