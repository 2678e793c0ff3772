use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use chrono::{TimeDelta, Utc};
use http::{HeaderMap, HeaderValue};
use licensechain::{
    errors::WebhookError,
    webhook::{
        EventRouter, HandlerError, HandlerResult, HandlerStatus, SIGNATURE_HEADER,
        SignatureAlgorithm, TIMESTAMP_HEADER, VerifiedEvent, WebhookDelivery, WebhookEventType,
        WebhookHandler, WebhookOutcome, generate_signature,
    },
};
use serde_json::json;

const SECRET: &str = "whsec_integration";

fn sign(body: &[u8]) -> String {
    generate_signature(body, SECRET, SignatureAlgorithm::Sha256)
}

fn rejection(outcome: &WebhookOutcome) -> WebhookError {
    outcome
        .as_rejected()
        .cloned()
        .unwrap_or_else(|| panic!("expected a rejection, got {outcome:?}"))
}

#[test]
fn test_license_created_delivery_is_processed() {
    let handler = WebhookHandler::new(SECRET).unwrap();
    let body = json!({
        "id": "evt_1",
        "type": "license.created",
        "created_at": Utc::now().to_rfc3339(),
        "data": {"license_id": "lic_1"},
    })
    .to_string();

    let outcome = handler.handle(body.as_bytes(), &sign(body.as_bytes()), None, None);

    assert_eq!(
        outcome.to_json(),
        json!({"status": "processed", "event": "license.created"})
    );
}

#[test]
fn test_custom_handler_sees_normalized_event() {
    let handler = WebhookHandler::new(SECRET).unwrap();
    handler.router().register(
        WebhookEventType::PaymentCompleted,
        |event: &VerifiedEvent| -> Result<HandlerResult, HandlerError> {
            let amount = event.data()["amount"].as_u64().unwrap_or_default();
            Ok(HandlerResult::processed(event.event_type())
                .with_field("id", event.id())
                .with_field("amount", amount))
        },
    );

    let body = br#"{"id":42,"event":"payment.completed","object":{"amount":1999}}"#;
    let outcome = handler.handle(body, &sign(body), None, None);

    assert_eq!(
        outcome.to_json(),
        json!({"status": "processed", "event": "payment.completed", "id": "42", "amount": 1999})
    );
}

#[test]
fn test_handler_may_report_custom_status() {
    let handler = WebhookHandler::new(SECRET).unwrap();
    handler.router().register(
        WebhookEventType::PaymentFailed,
        |event: &VerifiedEvent| -> Result<HandlerResult, HandlerError> {
            Ok(HandlerResult::new("queued", event.event_type()).with_field("retry_in", 60))
        },
    );

    let body = br#"{"type":"payment.failed"}"#;
    let outcome = handler.handle(body, &sign(body), None, None);

    assert_eq!(
        outcome.as_handled().map(|r| r.status.clone()),
        Some(HandlerStatus::Other("queued".to_string()))
    );
    assert_eq!(
        outcome.to_json(),
        json!({"status": "queued", "event": "payment.failed", "retry_in": 60})
    );
}

#[test]
fn test_unregistered_event_is_ignored() {
    let handler = WebhookHandler::new(SECRET).unwrap();
    let body = br#"{"type":"invoice.sent"}"#;

    let outcome = handler.handle(body, &sign(body), None, None);

    let result = outcome.as_handled().unwrap();
    assert_eq!(result.status, HandlerStatus::Ignored);
    assert_eq!(result.event, "invoice.sent");
}

#[test]
fn test_tampered_body_is_rejected() {
    let handler = WebhookHandler::new(SECRET).unwrap();
    let body = br#"{"type":"license.created","id":"lic_1"}"#;
    let signature = sign(body);

    let tampered = br#"{"type":"license.created","id":"lic_2"}"#;
    let outcome = handler.handle(tampered, &signature, None, None);

    assert_eq!(rejection(&outcome), WebhookError::InvalidSignature);
    assert_eq!(
        outcome.to_json(),
        json!({"valid": false, "error": "Invalid webhook signature"})
    );
}

#[test]
fn test_wrong_secret_and_algorithm_are_rejected() {
    let handler = WebhookHandler::new(SECRET).unwrap();
    let body = br#"{"type":"license.created"}"#;

    let foreign = generate_signature(body, "other_secret", SignatureAlgorithm::Sha256);
    assert_eq!(
        rejection(&handler.handle(body, &foreign, None, None)),
        WebhookError::InvalidSignature
    );

    let sha1 = generate_signature(body, SECRET, SignatureAlgorithm::Sha1);
    assert_eq!(
        rejection(&handler.handle(body, &sha1, None, None)),
        WebhookError::InvalidSignature
    );
    assert!(
        handler
            .handle(body, &sha1, None, Some(SignatureAlgorithm::Sha1))
            .is_valid()
    );
}

#[test]
fn test_stale_deliveries_are_rejected() {
    let handler = WebhookHandler::new(SECRET)
        .unwrap()
        .with_tolerance(Duration::from_secs(60));
    let body = br#"{"type":"license.created"}"#;
    let stale = (Utc::now() - TimeDelta::minutes(10)).timestamp().to_string();

    let outcome = handler.handle(body, &sign(body), Some(stale.as_str()), None);
    assert_eq!(rejection(&outcome), WebhookError::StaleTimestamp);

    let payload_stale = json!({
        "type": "license.created",
        "created_at": (Utc::now() - TimeDelta::minutes(10)).to_rfc3339(),
    })
    .to_string();
    let outcome = handler.handle(
        payload_stale.as_bytes(),
        &sign(payload_stale.as_bytes()),
        None,
        None,
    );
    assert_eq!(rejection(&outcome), WebhookError::StaleTimestamp);
}

#[test]
fn test_missing_timestamp_policy() {
    let body = br#"{"type":"license.created"}"#;

    let lenient = WebhookHandler::new(SECRET).unwrap();
    assert!(lenient.handle(body, &sign(body), None, None).is_valid());

    let strict = WebhookHandler::new(SECRET)
        .unwrap()
        .require_timestamp(true);
    assert_eq!(
        rejection(&strict.handle(body, &sign(body), None, None)),
        WebhookError::MissingTimestamp
    );

    let fresh = Utc::now().timestamp().to_string();
    assert!(
        strict
            .handle(body, &sign(body), Some(fresh.as_str()), None)
            .is_valid()
    );
}

#[test]
fn test_malformed_payloads_are_rejected_after_verification() {
    let handler = WebhookHandler::new(SECRET).unwrap();

    let not_json = b"license.created";
    let err = rejection(&handler.handle(not_json, &sign(not_json), None, None));
    assert!(matches!(err, WebhookError::InvalidPayload(_)));
    assert!(err.to_string().starts_with("Invalid JSON payload: "));

    let array = b"[1,2,3]";
    assert_eq!(
        rejection(&handler.handle(array, &sign(array), None, None)),
        WebhookError::InvalidPayload("expected a JSON object".to_string())
    );

    // unsigned garbage is reported as a signature failure, not a parse failure
    assert_eq!(
        rejection(&handler.handle(not_json, "sha256=00", None, None)),
        WebhookError::InvalidSignature
    );
}

#[test]
fn test_handler_failure_becomes_rejection() {
    let handler = WebhookHandler::new(SECRET).unwrap();
    handler.router().register(
        WebhookEventType::UserDeleted,
        |_: &VerifiedEvent| -> Result<HandlerResult, HandlerError> {
            Err("user store unavailable".into())
        },
    );

    let body = br#"{"type":"user.deleted","data":{"user_id":"u_1"}}"#;
    let outcome = handler.handle(body, &sign(body), None, None);

    assert_eq!(
        rejection(&outcome),
        WebhookError::Handler("user store unavailable".to_string())
    );
    assert_eq!(
        outcome.to_json(),
        json!({"valid": false, "error": "user store unavailable"})
    );
}

#[test]
fn test_delivery_from_headers() {
    let handler = WebhookHandler::new(SECRET).unwrap();
    let body = br#"{"type":"product.updated","id":"prod_1"}"#.to_vec();

    let mut headers = HeaderMap::new();
    headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&sign(&body)).unwrap());
    headers.insert(
        TIMESTAMP_HEADER,
        HeaderValue::from_str(&Utc::now().to_rfc3339()).unwrap(),
    );

    let delivery = WebhookDelivery::from_headers(&headers, body.clone());
    assert!(delivery.timestamp.is_some());
    assert_eq!(
        handler.handle_delivery(&delivery).as_handled().map(|r| r.status.clone()),
        Some(HandlerStatus::Processed)
    );

    let unsigned = WebhookDelivery::from_headers(&HeaderMap::new(), body);
    assert_eq!(
        rejection(&handler.handle_delivery(&unsigned)),
        WebhookError::InvalidSignature
    );
}

#[test]
fn test_concurrent_deliveries_share_one_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let router = EventRouter::empty();
    {
        let calls = calls.clone();
        router.register(
            WebhookEventType::LicenseValidated,
            move |event: &VerifiedEvent| -> Result<HandlerResult, HandlerError> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(HandlerResult::processed(event.event_type()))
            },
        );
    }
    let handler = WebhookHandler::new(SECRET).unwrap().with_router(router);

    thread::scope(|scope| {
        for worker in 0..8 {
            let handler = &handler;
            scope.spawn(move || {
                for n in 0..25 {
                    let body = json!({
                        "id": format!("evt_{worker}_{n}"),
                        "type": "license.validated",
                    })
                    .to_string();
                    let outcome = handler.handle(body.as_bytes(), &sign(body.as_bytes()), None, None);
                    assert!(outcome.is_valid());
                }
            });
        }
    });

    assert_eq!(calls.load(Ordering::SeqCst), 200);
}
