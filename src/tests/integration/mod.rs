//! Integration tests for the payments API
//!
//! Every test drives the real route tree with an in-memory grant store and a
//! static mailbox, so the whole verify pipeline runs end to end.

use crate::domain::payments::{PaymentMethod, Transaction};
use crate::tests::common::*;
use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;
use warp::http::StatusCode;

const NAYAPAY_TXN: &str = "ABCDEF1234567890ABCDEF12";

fn nayapay_app() -> TestApp {
    let body = wallet_email(NAYAPAY_TXN, "500");
    TestApp::new(StaticSearchAdapter::new().with_emails(PaymentMethod::NayaPay, &[body.as_str()]))
}

#[tokio::test]
async fn test_exact_id_and_amount_grants_purchase() {
    let app = nayapay_app();

    let (status, body) = app.verify(BUYER_ID, claim("NayaPay", NAYAPAY_TXN)).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Payment verified successfully");
    let tx = &body["transaction"];
    assert_eq!(tx["txnId"], NAYAPAY_TXN);
    assert_eq!(tx["amount"].as_f64(), Some(500.0));
    assert_eq!(tx["currency"], "PKR");
    assert_eq!(tx["verified"], true);
    assert_eq!(tx["method"], "NayaPay");
    assert!(tx.get("matchedTxnId").is_none());
    assert!(tx["downloadUrl"].as_str().unwrap().starts_with("https://shop.test/downloads/"));

    assert_eq!(app.store.buyers(PRODUCT_ID).await.unwrap(), vec![BUYER_ID.to_string()]);
    assert_eq!(app.store.purchases(BUYER_ID).await.unwrap().len(), 1);
    assert_eq!(app.search.calls(), vec![(PaymentMethod::NayaPay, 7)]);
}

#[tokio::test]
async fn test_resubmitted_id_is_rejected_as_already_used() {
    let app = nayapay_app();
    let (status, _) = app.verify(BUYER_ID, claim("NayaPay", NAYAPAY_TXN)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.verify(BUYER_ID, claim("NayaPay", NAYAPAY_TXN)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorType"], "DUPLICATE_TRANSACTION");
    assert_eq!(body["alreadyUsed"], true);
    // rejected before the mailbox is searched again
    assert_eq!(app.search.calls().len(), 1);
}

#[tokio::test]
async fn test_case_variant_of_used_id_is_duplicate() {
    let app = nayapay_app();
    app.verify(BUYER_ID, claim("NayaPay", NAYAPAY_TXN)).await;

    let (status, body) = app
        .verify(OTHER_BUYER_ID, claim("NayaPay", &NAYAPAY_TXN.to_lowercase()))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "DUPLICATE_TRANSACTION");
}

#[tokio::test]
async fn test_unrelated_email_reports_txn_not_found() {
    let body = wallet_email("UNRELATED000", "500");
    let app = TestApp::new(StaticSearchAdapter::new().with_emails(PaymentMethod::NayaPay, &[body.as_str()]));

    let (status, body) = app.verify(BUYER_ID, claim("NayaPay", "XYZ999")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "TXNID_NOT_FOUND");
    assert!(app.store.find_by_txn_id("XYZ999").await.unwrap().is_none());
}

#[tokio::test]
async fn test_partial_id_match_with_short_amount_is_rejected() {
    let body = wallet_email("123456789", "495");
    let app = TestApp::new(StaticSearchAdapter::new().with_emails(PaymentMethod::NayaPay, &[body.as_str()]));

    let (status, body) = app.verify(BUYER_ID, claim("NayaPay", "PK123456789")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "AMOUNT_MISMATCH");
    assert!(app.store.buyers(PRODUCT_ID).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_id_match_failure_does_not_fall_through_to_later_emails() {
    let short = wallet_email("123456789", "495");
    let exact = wallet_email("123456789", "500");
    let app = TestApp::new(StaticSearchAdapter::new().with_emails(PaymentMethod::NayaPay, &[short.as_str(), exact.as_str()]));

    let (status, body) = app.verify(BUYER_ID, claim("NayaPay", "123456789")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "AMOUNT_MISMATCH");
}

#[tokio::test]
async fn test_partial_match_reserves_both_identifiers() {
    let body = wallet_email("ABCD12345678", "500");
    let app = TestApp::new(StaticSearchAdapter::new().with_emails(PaymentMethod::NayaPay, &[body.as_str()]));

    let (status, body) = app.verify(BUYER_ID, claim("NayaPay", "NP-ABCD12345678")).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["transaction"]["txnId"], "NP-ABCD12345678");
    assert_eq!(body["transaction"]["matchedTxnId"], "ABCD12345678");

    let (status, body) = app.verify(OTHER_BUYER_ID, claim("NayaPay", "ABCD12345678")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "DUPLICATE_TRANSACTION");
}

#[tokio::test]
async fn test_peer_transfer_with_wrong_sender_is_rejected() {
    let body = peer_email("RTX99887766", "500", "Jane Doe");
    let app = TestApp::new(StaticSearchAdapter::new().with_emails(PaymentMethod::JazzCashToNayaPay, &[body.as_str()]));

    let (status, body) = app
        .verify(
            BUYER_ID,
            json!({
                "method": "JazzCashToNayaPay",
                "txnId": "RTX99887766",
                "productId": PRODUCT_ID,
                "senderName": "John Doe",
                "senderAmount": 500
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "SENDER_ACCOUNT_MISMATCH");
}

#[tokio::test]
async fn test_peer_transfer_with_full_evidence_is_granted() {
    let body = peer_email("RTX99887766", "750", "Ayesha Khan");
    let app = TestApp::new(StaticSearchAdapter::new().with_emails(PaymentMethod::JazzCashToNayaPay, &[body.as_str()]));

    let (status, body) = app
        .verify(
            BUYER_ID,
            json!({
                "method": "JazzCashToNayaPay",
                "txnId": "RTX99887766",
                "productId": PRODUCT_ID,
                "senderName": "Ayesha Khan",
                "senderAmount": 750
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    let tx = &body["transaction"];
    assert_eq!(tx["amount"].as_f64(), Some(750.0));
    assert_eq!(tx["senderName"], "Ayesha Khan");
    assert_eq!(tx["receiverName"], "Urdu Books Store");
    assert_eq!(tx["raastId"], "RST88127731");
    assert_eq!(tx["transactionTime"], "19 Oct 2026 10:42 AM");
}

#[tokio::test]
async fn test_peer_transfer_without_sender_bank_is_rejected() {
    let body = peer_email("RTX99887766", "750", "Ayesha Khan").replace("Sender Bank: JazzCash\n", "");
    let app = TestApp::new(StaticSearchAdapter::new().with_emails(PaymentMethod::JazzCashToNayaPay, &[body.as_str()]));

    let (status, body) = app
        .verify(
            BUYER_ID,
            json!({
                "method": "JazzCashToNayaPay",
                "txnId": "RTX99887766",
                "productId": PRODUCT_ID,
                "senderName": "Ayesha Khan",
                "senderAmount": 750
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "MISSING_SENDER_ACCOUNT");
}

#[tokio::test]
async fn test_peer_transfer_without_sender_amount_never_searches() {
    let app = TestApp::new(StaticSearchAdapter::new());

    let (status, body) = app
        .verify(
            BUYER_ID,
            json!({
                "method": "JazzCashToNayaPay",
                "txnId": "RTX99887766",
                "productId": PRODUCT_ID,
                "senderName": "Ayesha Khan"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "MISSING_SENDER_INFO");
    assert!(app.search.calls().is_empty());
}

#[tokio::test]
async fn test_peer_sender_amount_below_price_is_rejected_up_front() {
    let app = TestApp::new(StaticSearchAdapter::new());

    let (status, body) = app
        .verify(
            BUYER_ID,
            json!({
                "method": "JazzCashToNayaPay",
                "txnId": "RTX99887766",
                "productId": PRODUCT_ID,
                "senderName": "Ayesha Khan",
                "senderAmount": 400
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "AMOUNT_MISMATCH");
    assert!(app.search.calls().is_empty());
}

#[tokio::test]
async fn test_empty_mailbox_widens_with_fallback_method() {
    let app = TestApp::new(StaticSearchAdapter::new());

    let (status, body) = app.verify(BUYER_ID, claim("JazzCash", "1234567890123")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "NO_EMAILS_FOUND");
    assert_eq!(
        app.search.calls(),
        vec![(PaymentMethod::JazzCash, 7), (PaymentMethod::NayaPay, 14)]
    );
}

#[tokio::test]
async fn test_fallback_emails_are_read_with_claimed_method() {
    let body = wallet_email("1234567890123", "500");
    let app = TestApp::new(StaticSearchAdapter::new().with_emails(PaymentMethod::NayaPay, &[body.as_str()]));

    let (status, body) = app.verify(BUYER_ID, claim("JazzCash", "1234567890123")).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["transaction"]["method"], "JazzCash");
}

#[tokio::test]
async fn test_slow_mailbox_times_out_as_server_error() {
    let mut config = test_config();
    config.verification.search_timeout_seconds = 1;
    let search = StaticSearchAdapter::new().with_delay(Duration::from_secs(3));
    let app = TestApp::with_config(config, search);

    let (status, body) = app.verify(BUYER_ID, claim("NayaPay", NAYAPAY_TXN)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["errorType"], "SERVER_ERROR");
    assert!(body["message"].as_str().unwrap().contains("try again"));
    assert!(app.store.find_by_txn_id(NAYAPAY_TXN).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let app = nayapay_app();

    let (status, body) = app
        .verify(BUYER_ID, json!({ "method": "NayaPay", "txnId": NAYAPAY_TXN, "productId": "missing" }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorType"], "PRODUCT_NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_method_is_validation_error() {
    let app = nayapay_app();

    let (status, body) = app.verify(BUYER_ID, claim("PayPal", NAYAPAY_TXN)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "VALIDATION_ERROR");
    assert!(app.search.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let app = nayapay_app();

    let response = warp::test::request()
        .method("POST")
        .path("/payments/verify")
        .header("authorization", app.bearer(BUYER_ID))
        .header("content-type", "application/json")
        .body("{\"method\": \"NayaPay\"")
        .reply(&app.server.routes())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(parse_body(response.body())["errorType"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_concurrent_claims_grant_exactly_once() {
    let body = wallet_email(NAYAPAY_TXN, "500");
    // the delay lets every request clear the duplicate check before any commit
    let search = StaticSearchAdapter::new()
        .with_emails(PaymentMethod::NayaPay, &[body.as_str()])
        .with_delay(Duration::from_millis(20));
    let app = TestApp::new(search);

    let attempts = (0..8).map(|i| {
        let user = if i % 2 == 0 { BUYER_ID } else { OTHER_BUYER_ID };
        app.verify(user, claim("NayaPay", NAYAPAY_TXN))
    });
    let results = join_all(attempts).await;

    let granted = results.iter().filter(|(status, _)| *status == StatusCode::OK).count();
    let duplicates = results
        .iter()
        .filter(|(status, body)| *status == StatusCode::BAD_REQUEST && body["errorType"] == "DUPLICATE_TRANSACTION")
        .count();
    assert_eq!(granted, 1);
    assert_eq!(duplicates, 7);

    let owner = app.store.find_by_txn_id(NAYAPAY_TXN).await.unwrap().unwrap().user;
    assert_eq!(app.store.buyers(PRODUCT_ID).await.unwrap(), vec![owner]);
}

#[tokio::test]
async fn test_resubmission_completes_grant_left_half_done() {
    let app = nayapay_app();
    let committed = Transaction {
        id: Uuid::new_v4(),
        user: BUYER_ID.to_string(),
        product: PRODUCT_ID.to_string(),
        method: PaymentMethod::NayaPay,
        txn_id: NAYAPAY_TXN.to_string(),
        matched_txn_id: None,
        amount: PRODUCT_PRICE,
        currency: "PKR".to_string(),
        verified: true,
        verified_at: Utc::now(),
        download_url: None,
        sender_name: None,
        receiver_name: None,
        raast_id: None,
        transaction_time: None,
    };
    app.store.create_verified_transaction(&committed).await.unwrap();
    assert!(app.store.buyers(PRODUCT_ID).await.unwrap().is_empty());

    let (status, body) = app.verify(BUYER_ID, claim("NayaPay", NAYAPAY_TXN)).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["transaction"]["id"], committed.id.to_string());
    assert!(body["transaction"]["downloadUrl"].as_str().is_some());
    assert_eq!(app.store.buyers(PRODUCT_ID).await.unwrap(), vec![BUYER_ID.to_string()]);
    assert_eq!(app.store.purchases(BUYER_ID).await.unwrap(), vec![committed.id.to_string()]);
    assert!(app.search.calls().is_empty());

    let (status, body) = app.verify(BUYER_ID, claim("NayaPay", NAYAPAY_TXN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "DUPLICATE_TRANSACTION");
}

#[tokio::test]
async fn test_transaction_details_include_buyer_and_product() {
    let app = nayapay_app();
    app.verify(BUYER_ID, claim("NayaPay", NAYAPAY_TXN)).await;

    let (status, body) = app
        .get(Some(BUYER_ID), &format!("/payments/transaction/{}", NAYAPAY_TXN))
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["txnId"], NAYAPAY_TXN);
    assert_eq!(body["userDetails"]["name"], "Ayesha Khan");
    assert_eq!(body["productDetails"]["title"], "Urdu Calligraphy Ebook");
    assert_eq!(body["productDetails"]["price"].as_f64(), Some(PRODUCT_PRICE));
}

#[tokio::test]
async fn test_user_transactions_lists_own_grants() {
    let first = wallet_email(NAYAPAY_TXN, "500");
    let second = wallet_email("FEDCBA0987654321FEDCBA09", "500");
    let app = TestApp::new(StaticSearchAdapter::new().with_emails(PaymentMethod::NayaPay, &[first.as_str(), second.as_str()]));
    app.verify(BUYER_ID, claim("NayaPay", NAYAPAY_TXN)).await;
    app.verify(BUYER_ID, claim("NayaPay", "FEDCBA0987654321FEDCBA09")).await;

    let (status, body) = app.get(Some(BUYER_ID), "/payments/user-transactions").await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["txnId"], "FEDCBA0987654321FEDCBA09");

    let (status, body) = app.get(Some(OTHER_BUYER_ID), "/payments/user-transactions").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_health_reports_degraded_in_memory_mode() {
    let app = nayapay_app();

    let (status, body) = app.get(None, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["details"]["store"]["mode"], "memory");
    assert_eq!(body["details"]["mailbox"], "static");
}

#[tokio::test]
async fn test_metrics_count_outcomes() {
    let app = nayapay_app();
    app.verify(BUYER_ID, claim("NayaPay", NAYAPAY_TXN)).await;
    app.verify(BUYER_ID, claim("NayaPay", NAYAPAY_TXN)).await;

    let (status, body) = app.get(None, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("verification_outcomes_total{outcome=\"granted\"} 1"));
    assert!(text.contains("verification_outcomes_total{outcome=\"DUPLICATE_TRANSACTION\"} 1"));
}

#[tokio::test]
async fn test_unknown_route_is_json_not_found() {
    let app = nayapay_app();

    let (status, body) = app.get(None, "/payments/refunds").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorType"], "NOT_FOUND");
}

#[tokio::test]
async fn test_receipt_worker_outlives_server_setup() {
    let app = nayapay_app();
    assert!(app.server.has_receipt_worker());

    let (status, _) = app.verify(BUYER_ID, claim("NayaPay", NAYAPAY_TXN)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.server.has_receipt_worker());
}
