//! Transaction detail extraction
//!
//! Turns the raw text or markup of one confirmation email into an
//! [`ExtractedCandidate`]. Extraction is deliberately lossy-tolerant: it never
//! fails, and a missing or odd-looking value is left for the match evaluator
//! to reject.

pub mod patterns;

use regex::Regex;

use crate::domain::email::ExtractedCandidate;
use crate::domain::payments::PaymentMethod;
use crate::shared::error::AppResult;

pub use patterns::{IdMode, PatternTable};

/// Pure extractor over a compiled [`PatternTable`]
#[derive(Debug, Clone)]
pub struct TransactionExtractor {
    table: PatternTable,
}

impl TransactionExtractor {
    pub fn new() -> AppResult<Self> {
        Ok(Self { table: PatternTable::compile()? })
    }

    /// Parse one email body for the given payment method
    pub fn extract(&self, body: &str, method: PaymentMethod) -> ExtractedCandidate {
        let patterns = self.table.for_method(method);

        let txn_id = patterns.ids.iter().find_map(|pattern| match pattern.mode {
            IdMode::Labeled => pattern
                .regex
                .captures(body)
                .and_then(|caps| caps.get(1))
                .map(|m| clean_identifier(m.as_str()))
                .filter(|v| !v.is_empty()),
            IdMode::Token => pattern
                .regex
                .captures_iter(body)
                .filter_map(|caps| caps.get(1).map(|m| clean_identifier(m.as_str())))
                .find(|v| v.chars().any(|c| c.is_ascii_digit())),
        });

        let mut currency = None;
        let mut amount = None;
        for pattern in &patterns.amounts {
            let Some(caps) = pattern.regex.captures(body) else { continue };
            let Some(value) = caps.get(pattern.value_group).and_then(|m| parse_amount(m.as_str())) else {
                continue;
            };
            amount = Some(value);
            currency = pattern
                .currency_group
                .and_then(|group| caps.get(group))
                .map(|m| normalize_currency(m.as_str()));
            break;
        }

        let (sender_name, sender_bank, receiver_name, raast_id, transaction_time) = match &patterns.peer {
            Some(peer) => (
                capture_text(&peer.sender_name, body),
                capture_text(&peer.sender_bank, body),
                capture_text(&peer.receiver_name, body),
                capture_text(&peer.raast_id, body)
                    .map(|v| clean_identifier(&v))
                    .filter(|v| v.chars().any(|c| c.is_ascii_digit())),
                capture_text(&peer.transaction_time, body),
            ),
            None => (None, None, None, None, None),
        };

        ExtractedCandidate::new(
            method,
            txn_id,
            amount,
            currency,
            sender_name,
            sender_bank,
            receiver_name,
            raast_id,
            transaction_time,
        )
    }
}

fn capture_text(regex: &Regex, body: &str) -> Option<String> {
    regex
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| strip_markup(m.as_str()))
        .map(|v| v.trim_matches(|c: char| c == ',' || c == ';' || c.is_whitespace()).to_string())
        .filter(|v| !v.is_empty())
}

fn clean_identifier(raw: &str) -> String {
    strip_markup(raw)
        .trim_matches(|c: char| c == '-' || c == '.' || c.is_whitespace())
        .to_string()
}

/// Drop markup tags, decode the two entities mail templates actually use, collapse whitespace
pub fn strip_markup(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let text = text.replace("&nbsp;", " ").replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip thousands separators and stray characters; unparseable means absent, never zero
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn normalize_currency(raw: &str) -> String {
    let upper = raw.trim().trim_end_matches('.').to_uppercase();
    match upper.as_str() {
        "RS" | "PKR" => "PKR".to_string(),
        "$" | "US$" | "USD" => "USD".to_string(),
        _ => upper,
    }
}
