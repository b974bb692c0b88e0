//! Typed extraction pattern table
//!
//! Each payment method owns an ordered list of identifier patterns and amount
//! patterns, most specific first. The table is compiled once when the
//! extractor is built; lookups by method never touch strings.

use regex::Regex;

use crate::domain::payments::PaymentMethod;
use crate::shared::error::{AppError, AppResult};

/// Filler allowed between a field label and its value: whitespace, markup, separators
const GAP: &str = r"(?:\s|&nbsp;|<[^>]*>|[:#-])*";
const CURRENCY: &str = r"(\bPKR|\bRs\.?|\bUSD|\bUS\$|\$)";
const NUMBER: &str = r"([0-9][0-9,]*(?:\.[0-9]+)?)";
const ID_VALUE: &str = r"([A-Za-z0-9][A-Za-z0-9-]{5,63})";
const TEXT_VALUE: &str = r"([^<\r\n|]{2,80}?)";
/// End of a peer-transfer label: a separator or the markup closing the label cell
const LABEL_END: &str = r"\s*(?:[:\-]|<[^>]*>)";
/// Where a lazy text value ends: the next labelled field, markup or end of line
const VALUE_STOP: &str = r"(?:\s+(?:sender|receiver|recipient|beneficiary|raast|transaction|amount|date|time|timestamp|reference|txn|tid)\b[^:<\r\n|]{0,30}[:#\-]|\s*(?:[<\r\n|]|$))";

/// How a transaction-id pattern's capture group is to be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMode {
    /// Value follows a field label; the first capture is taken as-is
    Labeled,
    /// Bare token scan; the first capture containing a digit wins
    Token,
}

struct IdSpec {
    template: &'static str,
    mode: IdMode,
}

struct AmountSpec {
    template: &'static str,
    currency_group: Option<usize>,
    value_group: usize,
}

const TXN_LABEL: IdSpec = IdSpec {
    template: r"(?i)\b(?:transaction|txn|trx)\s*(?:(?:id|ref|reference|no|number)\b\.?|#)%GAP%%ID%",
    mode: IdMode::Labeled,
};
const TID_LABEL: IdSpec = IdSpec {
    template: r"(?i)\bTID\b%GAP%%ID%",
    mode: IdMode::Labeled,
};
const REFERENCE_LABEL: IdSpec = IdSpec {
    template: r"(?i)\b(?:reference|ref)\b\.?\s*(?:(?:id|no|number)\b\.?|#)?%GAP%%ID%",
    mode: IdMode::Labeled,
};
const HEX_OBJECT_ID: IdSpec = IdSpec {
    template: r"\b([a-fA-F0-9]{24})\b",
    mode: IdMode::Token,
};
const NUMERIC_TOKEN: IdSpec = IdSpec {
    template: r"\b([0-9]{10,16})\b",
    mode: IdMode::Token,
};
const ALNUM_TOKEN: IdSpec = IdSpec {
    template: r"\b([A-Z0-9]{10,40})\b",
    mode: IdMode::Token,
};

const NAYAPAY_IDS: &[IdSpec] = &[TXN_LABEL, REFERENCE_LABEL, HEX_OBJECT_ID, ALNUM_TOKEN];
const JAZZCASH_IDS: &[IdSpec] = &[TID_LABEL, TXN_LABEL, REFERENCE_LABEL, NUMERIC_TOKEN, ALNUM_TOKEN];
const EASYPAISA_IDS: &[IdSpec] = &[TXN_LABEL, TID_LABEL, REFERENCE_LABEL, NUMERIC_TOKEN, ALNUM_TOKEN];
const PEER_IDS: &[IdSpec] = &[TXN_LABEL, TID_LABEL, REFERENCE_LABEL, HEX_OBJECT_ID, ALNUM_TOKEN];

const AMOUNTS: &[AmountSpec] = &[
    AmountSpec {
        template: r"(?i)\bamount\b(?:\s*(?:paid|sent|received|transferred|debited|credited))?(?:\s*\((?:PKR|Rs\.?)\))?%GAP%(?:%CUR%%GAP%)?%NUM%",
        currency_group: Some(1),
        value_group: 2,
    },
    AmountSpec {
        template: r"(?i)\b(?:total|you\s+(?:have\s+)?(?:received|sent|paid))\b%GAP%(?:%CUR%%GAP%)?%NUM%",
        currency_group: Some(1),
        value_group: 2,
    },
    AmountSpec {
        template: r"(?i)%CUR%%GAP%%NUM%",
        currency_group: Some(1),
        value_group: 2,
    },
    AmountSpec {
        template: r"(?i)%NUM%\s*(PKR|Rs\b)",
        currency_group: Some(2),
        value_group: 1,
    },
];

const SENDER_NAME: &str = r"(?i)\b(?:sender(?:'s)?(?:\s*(?:name|account\s*title))?|from\s*(?:account\s*title|name))%END%%GAP%%TEXT%%STOP%";
const SENDER_BANK: &str = r"(?i)\b(?:sender(?:'s)?\s*(?:bank|institution|wallet)|from\s*(?:bank|wallet)|source\s*(?:bank|institution))%END%%GAP%%TEXT%%STOP%";
const RECEIVER_NAME: &str = r"(?i)\b(?:receiver|recipient|beneficiary)(?:'s)?(?:\s*(?:name|account\s*title))?%END%%GAP%%TEXT%%STOP%";
/// A bare "Raast" needs `:` or `#`, otherwise running text like "Raast transfer" would match
const RAAST_ID: &str = r"(?i)\braast\s*(?:(?:id|ref(?:erence)?|stan|transaction\s*id)\b\.?(?:\s*(?:no\.?|number))?%END%|[:#])%GAP%%ID%";
const TRANSACTION_TIME: &str = r"(?i)\b(?:transaction\s*(?:date\s*(?:&amp;|&|and|/)\s*time|time|date)|date\s*(?:&amp;|&|and|/)\s*time|timestamp)%END%%GAP%([^<\r\n|]{4,60}?)%STOP%";

/// Compiled transaction-id pattern
#[derive(Debug, Clone)]
pub struct IdPattern {
    pub regex: Regex,
    pub mode: IdMode,
}

/// Compiled amount pattern with its capture layout
#[derive(Debug, Clone)]
pub struct AmountPattern {
    pub regex: Regex,
    pub currency_group: Option<usize>,
    pub value_group: usize,
}

/// Single best-effort labelled patterns for peer-transfer evidence
#[derive(Debug, Clone)]
pub struct PeerPatterns {
    pub sender_name: Regex,
    pub sender_bank: Regex,
    pub receiver_name: Regex,
    pub raast_id: Regex,
    pub transaction_time: Regex,
}

/// Everything the extractor needs for one payment method
#[derive(Debug, Clone)]
pub struct MethodPatterns {
    pub ids: Vec<IdPattern>,
    pub amounts: Vec<AmountPattern>,
    pub peer: Option<PeerPatterns>,
}

/// Mapping from payment method to its compiled patterns
#[derive(Debug, Clone)]
pub struct PatternTable {
    nayapay: MethodPatterns,
    jazzcash: MethodPatterns,
    easypaisa: MethodPatterns,
    peer_transfer: MethodPatterns,
}

impl PatternTable {
    /// Compile every pattern for every method
    pub fn compile() -> AppResult<Self> {
        let amounts = compile_amounts()?;
        Ok(Self {
            nayapay: MethodPatterns { ids: compile_ids(NAYAPAY_IDS)?, amounts: amounts.clone(), peer: None },
            jazzcash: MethodPatterns { ids: compile_ids(JAZZCASH_IDS)?, amounts: amounts.clone(), peer: None },
            easypaisa: MethodPatterns { ids: compile_ids(EASYPAISA_IDS)?, amounts: amounts.clone(), peer: None },
            peer_transfer: MethodPatterns {
                ids: compile_ids(PEER_IDS)?,
                amounts,
                peer: Some(PeerPatterns {
                    sender_name: compile(SENDER_NAME)?,
                    sender_bank: compile(SENDER_BANK)?,
                    receiver_name: compile(RECEIVER_NAME)?,
                    raast_id: compile(RAAST_ID)?,
                    transaction_time: compile(TRANSACTION_TIME)?,
                }),
            },
        })
    }

    pub fn for_method(&self, method: PaymentMethod) -> &MethodPatterns {
        match method {
            PaymentMethod::NayaPay => &self.nayapay,
            PaymentMethod::JazzCash => &self.jazzcash,
            PaymentMethod::Easypaisa => &self.easypaisa,
            PaymentMethod::JazzCashToNayaPay => &self.peer_transfer,
        }
    }
}

fn expand(template: &str) -> String {
    template
        .replace("%GAP%", GAP)
        .replace("%CUR%", CURRENCY)
        .replace("%NUM%", NUMBER)
        .replace("%ID%", ID_VALUE)
        .replace("%TEXT%", TEXT_VALUE)
        .replace("%END%", LABEL_END)
        .replace("%STOP%", VALUE_STOP)
}

fn compile(template: &str) -> AppResult<Regex> {
    Regex::new(&expand(template))
        .map_err(|e| AppError::Internal(format!("invalid extraction pattern: {}", e)))
}

fn compile_ids(specs: &[IdSpec]) -> AppResult<Vec<IdPattern>> {
    specs
        .iter()
        .map(|spec| Ok(IdPattern { regex: compile(spec.template)?, mode: spec.mode }))
        .collect()
}

fn compile_amounts() -> AppResult<Vec<AmountPattern>> {
    AMOUNTS
        .iter()
        .map(|spec| {
            Ok(AmountPattern {
                regex: compile(spec.template)?,
                currency_group: spec.currency_group,
                value_group: spec.value_group,
            })
        })
        .collect()
}
