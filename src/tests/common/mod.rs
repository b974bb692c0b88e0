//! Common test utilities and mock implementations
//!
//! This module provides the static mailbox, the test application wrapper and
//! email body builders shared by the cross-layer tests.

use crate::{
    config::{AppConfig, EmailProvider},
    domain::{email::RawEmail, payments::{PaymentMethod, Product, User}},
    infrastructure::{
        adapters::{AuthenticationAdapter, EmailSearch, PurchaseGrantStore},
        http::HttpServer,
    },
    shared::error::AppResult,
};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warp::http::StatusCode;

pub const PRODUCT_ID: &str = "ebook-urdu-101";
pub const PRODUCT_PRICE: f64 = 500.0;
pub const BUYER_ID: &str = "buyer-1";
pub const OTHER_BUYER_ID: &str = "buyer-2";

/// Mailbox double returning canned emails per payment method
#[derive(Default)]
pub struct StaticSearchAdapter {
    emails: HashMap<PaymentMethod, Vec<RawEmail>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(PaymentMethod, u32)>>,
}

impl StaticSearchAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails returned when searching with `method`
    pub fn with_emails(mut self, method: PaymentMethod, bodies: &[&str]) -> Self {
        let emails = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| RawEmail {
                subject: "Payment notification".to_string(),
                body: body.to_string(),
                date: Utc::now() - ChronoDuration::minutes(i as i64),
            })
            .collect();
        self.emails.insert(method, emails);
        self
    }

    /// Sleep before answering, to exercise the search timeout
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every `(method, days_back)` searched so far
    pub fn calls(&self) -> Vec<(PaymentMethod, u32)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmailSearch for StaticSearchAdapter {
    async fn search(
        &self,
        method: PaymentMethod,
        days_back: u32,
        claimed_txn_id: &str,
        _expected_amount: f64,
    ) -> AppResult<Vec<RawEmail>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((method, days_back));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if claimed_txn_id.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.emails.get(&method).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Configuration with one product, two buyers and rate limiting off
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.security.development_mode = true;
    config.email.provider = EmailProvider::Synthetic;
    config.rate_limit.enabled = false;
    config.downloads.base_url = "https://shop.test/downloads".to_string();
    config.catalog.products = vec![Product {
        id: PRODUCT_ID.to_string(),
        title: "Urdu Calligraphy Ebook".to_string(),
        price: PRODUCT_PRICE,
        images: vec!["https://shop.test/img/ebook.png".to_string()],
    }];
    config.catalog.users = vec![
        User { id: BUYER_ID.to_string(), name: "Ayesha Khan".to_string(), email: "ayesha@example.pk".to_string() },
        User { id: OTHER_BUYER_ID.to_string(), name: "Bilal Ahmed".to_string(), email: "bilal@example.pk".to_string() },
    ];
    config
}

/// Standard wallet confirmation body
pub fn wallet_email(txn_id: &str, amount: &str) -> String {
    format!(
        "<html><body><p>You received money</p>\
         <table><tr><td>Transaction ID:</td><td>{}</td></tr>\
         <tr><td>Amount:</td><td>Rs. {}</td></tr></table></body></html>",
        txn_id, amount
    )
}

/// Raast transfer confirmation body
pub fn peer_email(txn_id: &str, amount: &str, sender: &str) -> String {
    format!(
        "Incoming Raast transfer\n\
         Transaction ID: {}\n\
         Amount: Rs. {}\n\
         Sender Name: {}\n\
         Sender Bank: JazzCash\n\
         Receiver Name: Urdu Books Store\n\
         Raast ID: RST88127731\n\
         Transaction Time: 19 Oct 2026 10:42 AM\n",
        txn_id, amount, sender
    )
}

/// Full application over the real route tree, with a static mailbox and in-memory store
pub struct TestApp {
    pub server: HttpServer,
    pub search: Arc<StaticSearchAdapter>,
    pub store: Arc<PurchaseGrantStore>,
    auth: AuthenticationAdapter,
}

impl TestApp {
    pub fn new(search: StaticSearchAdapter) -> Self {
        Self::with_config(test_config(), search)
    }

    pub fn with_config(config: AppConfig, search: StaticSearchAdapter) -> Self {
        let search = Arc::new(search);
        let store = Arc::new(PurchaseGrantStore::in_memory());
        let auth = AuthenticationAdapter::new(config.security.jwt.clone());
        let server = HttpServer::with_adapters(config, search.clone(), store.clone())
            .expect("test server should build");
        Self { server, search, store, auth }
    }

    /// `Authorization` header value for a user
    pub fn bearer(&self, user_id: &str) -> String {
        let token = self
            .auth
            .issue_token(user_id, None, None, ChronoDuration::minutes(10))
            .expect("token should sign");
        format!("Bearer {}", token)
    }

    pub async fn verify(&self, user_id: &str, body: Value) -> (StatusCode, Value) {
        let response = warp::test::request()
            .method("POST")
            .path("/payments/verify")
            .header("authorization", self.bearer(user_id))
            .json(&body)
            .reply(&self.server.routes())
            .await;
        (response.status(), parse_body(response.body()))
    }

    pub async fn get(&self, user_id: Option<&str>, path: &str) -> (StatusCode, Value) {
        let mut request = warp::test::request().method("GET").path(path);
        if let Some(user_id) = user_id {
            request = request.header("authorization", self.bearer(user_id));
        }
        let response = request.reply(&self.server.routes()).await;
        (response.status(), parse_body(response.body()))
    }
}

/// JSON body, or the raw text as a JSON string for non-JSON responses
pub fn parse_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

pub fn claim(method: &str, txn_id: &str) -> Value {
    serde_json::json!({ "method": method, "txnId": txn_id, "productId": PRODUCT_ID })
}
