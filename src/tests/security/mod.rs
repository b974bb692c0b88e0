//! Security tests for the payments API
//!
//! Authentication on every payments route, ownership of stored transactions
//! and per-user throttling of verification attempts.

use crate::config::app_config::JwtConfig;
use crate::domain::payments::PaymentMethod;
use crate::infrastructure::adapters::AuthenticationAdapter;
use crate::tests::common::*;
use chrono::Duration as ChronoDuration;
use warp::http::StatusCode;

const TXN: &str = "ABCDEF1234567890ABCDEF12";

fn app() -> TestApp {
    let body = wallet_email(TXN, "500");
    TestApp::new(StaticSearchAdapter::new().with_emails(PaymentMethod::NayaPay, &[body.as_str()]))
}

async fn verify_with_header(app: &TestApp, header: Option<String>) -> (StatusCode, serde_json::Value) {
    let mut request = warp::test::request()
        .method("POST")
        .path("/payments/verify")
        .json(&claim("NayaPay", TXN));
    if let Some(header) = header {
        request = request.header("authorization", header);
    }
    let response = request.reply(&app.server.routes()).await;
    (response.status(), parse_body(response.body()))
}

#[tokio::test]
async fn test_verify_requires_token() {
    let app = app();

    let (status, body) = verify_with_header(&app, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorType"], "UNAUTHORIZED");
    assert!(app.search.calls().is_empty());
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let app = app();
    let forged = AuthenticationAdapter::new(JwtConfig {
        secret_key: "not-the-server-secret-not-the-server-secret".to_string(),
        ..test_config().security.jwt
    })
    .issue_token(BUYER_ID, None, None, ChronoDuration::minutes(5))
    .unwrap();

    let (status, body) = verify_with_header(&app, Some(format!("Bearer {}", forged))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorType"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = app();
    let expired = AuthenticationAdapter::new(test_config().security.jwt)
        .issue_token(BUYER_ID, None, None, ChronoDuration::minutes(-10))
        .unwrap();

    let (status, _) = verify_with_header(&app, Some(format!("Bearer {}", expired))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let app = app();

    let (status, _) = verify_with_header(&app, Some("Basic YnV5ZXI6cGFzcw==".to_string())).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_read_endpoints_require_token() {
    let app = app();

    let (status, _) = app.get(None, "/payments/user-transactions").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get(None, &format!("/payments/transaction/{}", TXN)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_transaction_details_hidden_from_other_users() {
    let app = app();
    let (status, _) = app.verify(BUYER_ID, claim("NayaPay", TXN)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .get(Some(OTHER_BUYER_ID), &format!("/payments/transaction/{}", TXN))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorType"], "NOT_FOUND");
    assert!(body.get("userDetails").is_none());
}

#[tokio::test]
async fn test_verification_attempts_are_throttled_per_user() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_minute = 1;
    config.rate_limit.burst_size = 1;
    let app = TestApp::with_config(config, StaticSearchAdapter::new());

    let (status, _) = app.verify(BUYER_ID, claim("NayaPay", "UNSEEN0000001")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.verify(BUYER_ID, claim("NayaPay", "UNSEEN0000002")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["errorType"], "RATE_LIMITED");

    // other buyers keep their own budget
    let (status, _) = app.verify(OTHER_BUYER_ID, claim("NayaPay", "UNSEEN0000003")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_server_errors_do_not_leak_internals() {
    let mut config = test_config();
    config.verification.search_timeout_seconds = 1;
    let app = TestApp::with_config(
        config,
        StaticSearchAdapter::new().with_delay(std::time::Duration::from_secs(2)),
    );

    let (status, body) = app.verify(BUYER_ID, claim("NayaPay", TXN)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["message"].as_str().unwrap();
    assert!(!message.contains("timed out after"));
}
