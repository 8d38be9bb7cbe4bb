use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subscription_payments::payments::error::{ClientResult, VerificationError};
use subscription_payments::payments::http::parse_verification_response;
use subscription_payments::{
    GatewayCallback, PaymentVerificationService, PollingConfig, PollingOutcome, PollingState,
    ReconciliationVerdict, ReferenceSource, TransactionReference, VerificationClient,
    VerificationResult,
};

/// Answers every call with the same HTTP status and body, decoded the way the
/// real client decodes the verification endpoint.
struct EndpointStub {
    status: u16,
    body: String,
    calls: AtomicU32,
    references: Mutex<Vec<String>>,
}

impl EndpointStub {
    fn new(status: u16, body: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.to_string(),
            calls: AtomicU32::new(0),
            references: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationClient for EndpointStub {
    async fn verify_transaction(
        &self,
        reference: &TransactionReference,
    ) -> ClientResult<VerificationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.references
            .lock()
            .unwrap()
            .push(reference.value().to_string());
        parse_verification_response(self.status, &self.body)
    }
}

/// Never answers; only the engine's timeout ends the call.
struct UnreachableEndpoint {
    calls: AtomicU32,
    references: Mutex<Vec<String>>,
    starts: Mutex<Vec<tokio::time::Instant>>,
}

#[async_trait]
impl VerificationClient for UnreachableEndpoint {
    async fn verify_transaction(
        &self,
        reference: &TransactionReference,
    ) -> ClientResult<VerificationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.starts.lock().unwrap().push(tokio::time::Instant::now());
        self.references
            .lock()
            .unwrap()
            .push(reference.value().to_string());
        std::future::pending::<()>().await;
        Err(VerificationError::Network {
            message: "unreachable".to_string(),
        })
    }
}

#[tokio::test]
async fn declined_redirect_reports_authoritative_reason() {
    let endpoint = EndpointStub::new(
        200,
        json!({"status": true, "data": {"status": "failed", "reason": "insufficient funds"}}),
    );
    let service = PaymentVerificationService::new(endpoint.clone(), PollingConfig::default());
    let callback = GatewayCallback::from_query("external_id=TX123&status=402");

    let result = service.verify_redirect(&callback).await;

    assert_eq!(
        result.verdict,
        ReconciliationVerdict::Failure("insufficient funds".to_string())
    );
    assert_eq!(result.verdict.user_message(), "insufficient funds");
    assert_eq!(endpoint.references.lock().unwrap().as_slice(), ["TX123".to_string()]);
}

#[tokio::test]
async fn paid_manual_check_without_gateway_params_succeeds() {
    let endpoint = EndpointStub::new(
        200,
        json!({"status": true, "data": {"status": "paid", "amount": 120, "subscription_plan": {"name": "Landlord Pro"}}}),
    );
    let service = PaymentVerificationService::new(endpoint.clone(), PollingConfig::default());
    let session = service.manual_session(TransactionReference::manual("TX123").expect("reference"));

    let first = session.verify().await;
    let second = session.verify().await;

    let payload = first.payload().expect("success payload");
    assert_eq!(payload["amount"], 120);
    assert_eq!(payload["subscription_plan"]["name"], "Landlord Pro");
    assert_eq!(first, second);
    assert_eq!(endpoint.calls(), 2);
}

#[tokio::test]
async fn identifier_priority_holds_for_every_combination() {
    let fields = [
        ("external_id", "EXT", ReferenceSource::ExternalId),
        ("trans_ref", "REF", ReferenceSource::TransRef),
        ("trans_id", "TID", ReferenceSource::TransId),
    ];

    for mask in 1u8..8 {
        let present: Vec<_> = fields
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << *i) != 0)
            .map(|(_, f)| f)
            .collect();
        // reversed so insertion order never decides the winner
        let callback =
            GatewayCallback::from_pairs(present.iter().rev().map(|(k, v, _)| (*k, v.to_string())));

        let reference = callback.resolve_reference().expect("at least one field");
        let (_, expected_value, expected_source) = present[0];
        assert_eq!(reference.value(), *expected_value, "mask {:03b}", mask);
        assert_eq!(reference.source(), *expected_source, "mask {:03b}", mask);
    }
}

#[tokio::test]
async fn failure_envelope_never_yields_success() {
    for (status, body) in [
        (200, json!({"status": false, "message": "lookup failed"})),
        (503, json!({"message": "maintenance"})),
        (200, json!({"status": true, "data": {"status": "reversed"}})),
    ] {
        let endpoint = EndpointStub::new(status, body);
        let service = PaymentVerificationService::new(endpoint, PollingConfig::default());
        for query in ["trans_ref=R1&status=200", "trans_ref=R1", "trans_ref=R1&status=402"] {
            let result = service
                .verify_redirect(&GatewayCallback::from_query(query))
                .await;
            assert!(!result.verdict.is_success(), "{} / {}", status, query);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn unreachable_endpoint_exhausts_polling_and_keeps_reference() {
    let endpoint = Arc::new(UnreachableEndpoint {
        calls: AtomicU32::new(0),
        references: Mutex::new(Vec::new()),
        starts: Mutex::new(Vec::new()),
    });
    let service = PaymentVerificationService::new(endpoint.clone(), PollingConfig::default());
    let reference = TransactionReference::manual("PUSH-77").expect("reference");

    let started = tokio::time::Instant::now();
    let handle = service.start_polling(reference.clone());
    let progress = handle.subscribe();
    let outcome = handle.outcome().await;

    // calls start six seconds apart; the last one times out six seconds later
    let starts = endpoint.starts.lock().unwrap().clone();
    assert_eq!(starts.len(), 6);
    assert!(starts[0] - started < Duration::from_millis(1));
    for pair in starts.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= Duration::from_secs(6), "gap {:?}", gap);
        assert!(gap < Duration::from_millis(6_010), "gap {:?}", gap);
    }
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(6 * 6));
    assert!(elapsed < Duration::from_secs(6 * 6 + 1));

    assert_eq!(endpoint.calls.load(Ordering::SeqCst), 6);
    assert!(endpoint
        .references
        .lock()
        .unwrap()
        .iter()
        .all(|r| r == "PUSH-77"));

    let snapshot = progress.borrow().clone();
    assert_eq!(snapshot.state(), PollingState::Exhausted);
    assert_eq!(snapshot.attempts_made(), 6);

    let manual = match outcome {
        PollingOutcome::Exhausted(manual) => manual,
        other => panic!("expected exhaustion, got {:?}", other),
    };
    assert_eq!(manual.reference(), &reference);
    assert!(matches!(
        manual.last_verdict(),
        Some(ReconciliationVerdict::Error(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn polling_surfaces_payment_once_paid() {
    let endpoint = EndpointStub::new(
        200,
        json!({"status": true, "data": {"status": "paid", "amount": 120}}),
    );
    let service = PaymentVerificationService::new(endpoint.clone(), PollingConfig::default());

    let outcome = service
        .start_polling(TransactionReference::manual("PUSH-1").expect("reference"))
        .outcome()
        .await;

    match outcome {
        PollingOutcome::Succeeded(payload) => assert_eq!(payload["amount"], 120),
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(endpoint.calls(), 1);
}
