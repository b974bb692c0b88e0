//! Email search adapter seam
//!
//! The orchestrator only ever sees [`EmailSearch`]. Subject phrasings and
//! sender domains per provider are hints for narrowing the mailbox query;
//! whether a message really confirms the claimed payment is decided later by
//! content extraction.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::email::RawEmail;
use crate::domain::payments::PaymentMethod;
use crate::shared::error::AppResult;

/// Read-only inbox query for payment confirmations
#[async_trait]
pub trait EmailSearch: Send + Sync {
    /// Candidate messages for a claim. An empty `claimed_txn_id` yields an empty list.
    async fn search(
        &self,
        method: PaymentMethod,
        days_back: u32,
        claimed_txn_id: &str,
        expected_amount: f64,
    ) -> AppResult<Vec<RawEmail>>;

    /// Short adapter name for logs and health output
    fn name(&self) -> &'static str;
}

/// Known confirmation-mail phrasings for one provider
#[derive(Debug, Clone, Copy)]
pub struct SearchHints {
    pub subjects: &'static [&'static str],
    pub sender_domains: &'static [&'static str],
}

const NAYAPAY_HINTS: SearchHints = SearchHints {
    subjects: &["You received money", "Money Received", "NayaPay Transaction", "Payment Received"],
    sender_domains: &["nayapay.com"],
};
const JAZZCASH_HINTS: SearchHints = SearchHints {
    subjects: &["JazzCash Transaction", "Money Received", "Funds Transfer", "Payment Confirmation"],
    sender_domains: &["jazzcash.com.pk"],
};
const EASYPAISA_HINTS: SearchHints = SearchHints {
    subjects: &["Easypaisa Transaction", "You have received", "Payment Received", "Money Transfer"],
    sender_domains: &["easypaisa.com.pk", "telenorbank.pk"],
};
const PEER_TRANSFER_HINTS: SearchHints = SearchHints {
    subjects: &["Raast", "Incoming Raast Transfer", "IBFT", "You received money"],
    sender_domains: &["nayapay.com"],
};

pub fn search_hints(method: PaymentMethod) -> SearchHints {
    match method {
        PaymentMethod::NayaPay => NAYAPAY_HINTS,
        PaymentMethod::JazzCash => JAZZCASH_HINTS,
        PaymentMethod::Easypaisa => EASYPAISA_HINTS,
        // the merchant wallet is NayaPay, so the confirmation comes from NayaPay
        PaymentMethod::JazzCashToNayaPay => PEER_TRANSFER_HINTS,
    }
}

/// Development stand-in that fabricates one confirmation for whatever is claimed.
///
/// It makes every claim look paid, so configuration only allows it in
/// development mode.
#[derive(Debug, Clone, Default)]
pub struct SyntheticSearchAdapter;

impl SyntheticSearchAdapter {
    pub fn new() -> Self {
        Self
    }

    fn fabricate(method: PaymentMethod, days_back: u32, txn_id: &str, amount: f64) -> RawEmail {
        let digest = Sha256::digest(txn_id.as_bytes());
        let hours_ago = u64::from(digest[0]) % (u64::from(days_back.max(1)) * 24);
        let date = Utc::now() - Duration::hours(hours_ago as i64);
        let raast_ref = format!("RAAST{}", hex::encode_upper(&digest[..6]));
        let subject = search_hints(method).subjects[0].to_string();

        let body = match method {
            PaymentMethod::JazzCashToNayaPay => format!(
                "Incoming Raast transfer\nTransaction ID: {txn_id}\nAmount: Rs. {amount:.2}\n\
                 Sender Name: Synthetic Sender\nSender Bank: JazzCash\nReceiver Name: Merchant\n\
                 Raast ID: {raast_ref}\nTransaction Time: {}",
                date.format("%d %b %Y %I:%M %p")
            ),
            PaymentMethod::JazzCash => format!(
                "Dear Customer, you have received Rs. {amount:.2}.\nTID: {txn_id}\nDate: {}",
                date.format("%d-%m-%Y %H:%M")
            ),
            _ => format!(
                "{subject}\nTransaction ID: {txn_id}\nAmount: Rs. {amount:.2}\nDate: {}",
                date.format("%d %b %Y %H:%M")
            ),
        };

        RawEmail { subject, body, date }
    }
}

#[async_trait]
impl EmailSearch for SyntheticSearchAdapter {
    async fn search(
        &self,
        method: PaymentMethod,
        days_back: u32,
        claimed_txn_id: &str,
        expected_amount: f64,
    ) -> AppResult<Vec<RawEmail>> {
        let txn_id = claimed_txn_id.trim();
        if txn_id.is_empty() {
            return Ok(Vec::new());
        }
        debug!(method = %method, txn_id = %txn_id, "Fabricating synthetic confirmation email");
        Ok(vec![Self::fabricate(method, days_back, txn_id, expected_amount)])
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
