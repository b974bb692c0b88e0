//! Mailbox evidence: raw messages and the transaction data parsed out of them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::payments::PaymentMethod;

/// Currency assumed when a message does not state one
pub const DEFAULT_CURRENCY: &str = "PKR";

/// One inbox message returned by a search adapter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawEmail {
    pub subject: String,
    pub body: String,
    pub date: DateTime<Utc>,
}

/// Transaction details parsed from a single email. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedCandidate {
    pub txn_id: Option<String>,
    pub amount: Option<f64>,
    pub currency: String,
    pub sender_name: Option<String>,
    pub sender_bank: Option<String>,
    pub receiver_name: Option<String>,
    pub raast_id: Option<String>,
    pub transaction_time: Option<String>,
    pub valid: bool,
}

impl ExtractedCandidate {
    /// Assemble a candidate and derive `valid` from the method's evidence requirements
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        method: PaymentMethod,
        txn_id: Option<String>,
        amount: Option<f64>,
        currency: Option<String>,
        sender_name: Option<String>,
        sender_bank: Option<String>,
        receiver_name: Option<String>,
        raast_id: Option<String>,
        transaction_time: Option<String>,
    ) -> Self {
        let base_ok = txn_id.is_some() && amount.is_some();
        let valid = if method.is_peer_transfer() {
            base_ok
                && sender_name.is_some()
                && sender_bank.is_some()
                && receiver_name.is_some()
                && raast_id.is_some()
                && transaction_time.is_some()
        } else {
            base_ok
        };

        Self {
            txn_id,
            amount,
            currency: currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            sender_name,
            sender_bank,
            receiver_name,
            raast_id,
            transaction_time,
            valid,
        }
    }

    /// Candidate with nothing found
    pub fn empty(method: PaymentMethod) -> Self {
        Self::new(method, None, None, None, None, None, None, None, None)
    }
}
