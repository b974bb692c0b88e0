//! Gmail-backed email search
//!
//! Queries the merchant mailbox through the Gmail REST API. Credentials are an
//! OAuth2 refresh token supplied through configuration; short-lived access
//! tokens are exchanged on demand and cached until shortly before expiry, or
//! until the API rejects one.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::future::join_all;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::app_config::GmailConfig;
use crate::domain::email::RawEmail;
use crate::domain::payments::PaymentMethod;
use crate::infrastructure::adapters::email_search::{search_hints, EmailSearch};
use crate::shared::error::{AppError, AppResult};

/// Refresh this long before the provider-reported expiry
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    #[serde(default)]
    internal_date: Option<String>,
    payload: Option<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct PartBody {
    data: Option<String>,
}

/// Email search over the Gmail API
pub struct GmailSearchAdapter {
    client: reqwest::Client,
    config: GmailConfig,
    token: RwLock<Option<CachedToken>>,
}

impl GmailSearchAdapter {
    pub fn new(config: GmailConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build mailbox HTTP client: {}", e)))?;

        info!(user_id = %config.user_id, "Gmail mailbox adapter initialized");
        Ok(Self { client, config, token: RwLock::new(None) })
    }

    async fn access_token(&self) -> AppResult<String> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at > Utc::now() + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut guard = self.token.write().await;
        // another request may have refreshed while we waited for the lock
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Utc::now() + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) {
                return Ok(cached.access_token.clone());
            }
        }

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", self.config.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Search(format!("mailbox token refresh failed: {}", e)))?;
        let token: TokenResponse = response.json().await?;

        debug!(expires_in = token.expires_in, "Refreshed mailbox access token");
        let access_token = token.access_token.clone();
        *guard = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        });
        Ok(access_token)
    }

    /// Forget `stale` unless another request already replaced it
    async fn invalidate_token(&self, stale: &str) {
        let mut guard = self.token.write().await;
        if guard.as_ref().is_some_and(|cached| cached.access_token == stale) {
            *guard = None;
        }
    }

    /// Authorized GET; a 401 drops the cached token and retries once with a fresh one
    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> AppResult<T> {
        let token = self.access_token().await?;
        let response = self.client.get(url).bearer_auth(&token).query(query).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response.error_for_status()?.json().await?);
        }

        warn!("Mailbox rejected the cached access token, refreshing");
        self.invalidate_token(&token).await;
        let token = self.access_token().await?;
        let response = self.client.get(url).bearer_auth(&token).query(query).send().await?;
        Ok(response.error_for_status()?.json().await?)
    }

    async fn fetch_message(&self, id: &str) -> AppResult<Option<RawEmail>> {
        let url = format!(
            "{}/users/{}/messages/{}",
            self.config.api_base_url, self.config.user_id, id
        );
        let message: Message = self.get_json(&url, &[("format", "full")]).await?;

        let Some(payload) = message.payload else {
            return Ok(None);
        };
        let subject = payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("subject"))
            .map(|h| h.value.clone())
            .unwrap_or_default();
        let date = message
            .internal_date
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        let body = find_body(&payload, "text/plain")
            .or_else(|| find_body(&payload, "text/html"))
            .unwrap_or_default();

        Ok(Some(RawEmail { subject, body, date }))
    }
}

/// Gmail search expression: recent mail from known subjects/senders, or mentioning the id
pub fn build_query(method: PaymentMethod, days_back: u32, claimed_txn_id: &str) -> String {
    let hints = search_hints(method);
    let mut terms: Vec<String> = hints.subjects.iter().map(|s| format!("subject:\"{}\"", s)).collect();
    terms.extend(hints.sender_domains.iter().map(|d| format!("from:{}", d)));
    let literal: String = claimed_txn_id.chars().filter(|c| *c != '"' && *c != '\\').collect();
    format!("newer_than:{}d ({{{}}} OR \"{}\")", days_back, terms.join(" "), literal.trim())
}

fn find_body(part: &MessagePart, mime_type: &str) -> Option<String> {
    if part.mime_type.eq_ignore_ascii_case(mime_type) {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
            if let Some(text) = decode_part(data) {
                return Some(text);
            }
        }
    }
    part.parts.iter().find_map(|child| find_body(child, mime_type))
}

fn decode_part(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl EmailSearch for GmailSearchAdapter {
    async fn search(
        &self,
        method: PaymentMethod,
        days_back: u32,
        claimed_txn_id: &str,
        expected_amount: f64,
    ) -> AppResult<Vec<RawEmail>> {
        if claimed_txn_id.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query = build_query(method, days_back, claimed_txn_id);
        debug!(method = %method, query = %query, expected_amount, "Searching mailbox");

        let url = format!("{}/users/{}/messages", self.config.api_base_url, self.config.user_id);
        let max_results = self.config.max_results.to_string();
        let list: ListResponse = self
            .get_json(&url, &[("q", query.as_str()), ("maxResults", max_results.as_str())])
            .await?;

        let fetches = list.messages.iter().map(|m| self.fetch_message(&m.id));
        let mut emails = Vec::with_capacity(list.messages.len());
        let mut failures = 0;
        let mut last_error = None;
        for result in join_all(fetches).await {
            match result {
                Ok(Some(email)) => emails.push(email),
                Ok(None) => {}
                // one unreadable message should not hide the others
                Err(e) => {
                    warn!(error = %e, "Skipping mailbox message that failed to load");
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if failures > 0 && failures == list.messages.len() {
            let cause = last_error.map(|e| e.to_string()).unwrap_or_default();
            return Err(AppError::Search(format!(
                "all {} mailbox messages failed to load: {}",
                failures, cause
            )));
        }

        emails.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(emails)
    }

    fn name(&self) -> &'static str {
        "gmail"
    }
}
