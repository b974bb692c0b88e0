//! Payments domain models and types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported mobile-wallet payment methods
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    NayaPay,
    JazzCash,
    Easypaisa,
    /// Cross-provider transfer over the Raast rail into the merchant's NayaPay wallet
    JazzCashToNayaPay,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::NayaPay,
        PaymentMethod::JazzCash,
        PaymentMethod::Easypaisa,
        PaymentMethod::JazzCashToNayaPay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::NayaPay => "NayaPay",
            PaymentMethod::JazzCash => "JazzCash",
            PaymentMethod::Easypaisa => "Easypaisa",
            PaymentMethod::JazzCashToNayaPay => "JazzCashToNayaPay",
        }
    }

    /// Peer transfers need sender identity evidence on top of id and amount
    pub fn is_peer_transfer(&self) -> bool {
        matches!(self, PaymentMethod::JazzCashToNayaPay)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unsupported payment method: {}", s))
    }
}

/// Buyer-asserted payment facts, already validated at the HTTP edge
#[derive(Debug, Clone)]
pub struct PaymentClaim {
    pub method: PaymentMethod,
    pub claimed_txn_id: String,
    pub product_id: String,
    pub user_id: String,
    pub sender_name: Option<String>,
    pub sender_amount: Option<f64>,
}

impl PaymentClaim {
    /// Claimed id with surrounding whitespace removed
    pub fn txn_id(&self) -> &str {
        self.claimed_txn_id.trim()
    }
}

/// The claim resolved against the catalog: what the evaluator compares against
#[derive(Debug, Clone)]
pub struct ResolvedClaim {
    pub method: PaymentMethod,
    pub claimed_txn_id: String,
    pub expected_amount: f64,
    pub sender_name: Option<String>,
}

/// A verified purchase. Only ever persisted in the verified state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user: String,
    pub product: String,
    pub method: PaymentMethod,
    pub txn_id: String,
    /// Identifier found in the confirmation email when it differs from the claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_txn_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub verified: bool,
    pub verified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raast_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_time: Option<String>,
}

impl Transaction {
    /// Canonical uniqueness key for a transaction identifier
    pub fn canonical_key(txn_id: &str) -> String {
        txn_id.trim().to_uppercase()
    }

    /// Every identifier this transaction consumes, deduplicated
    pub fn reserved_keys(&self) -> Vec<String> {
        let mut keys = vec![Self::canonical_key(&self.txn_id)];
        if let Some(matched) = &self.matched_txn_id {
            let key = Self::canonical_key(matched);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

/// Product as seen by the verification engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Buyer account as seen by the verification engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Transaction joined with the user and product it belongs to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub user_details: Option<UserSummary>,
    pub product_details: Option<ProductSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub title: String,
    pub price: f64,
    pub images: Vec<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self { name: user.name.clone(), email: user.email.clone() }
    }
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            price: product.price,
            images: product.images.clone(),
        }
    }
}
