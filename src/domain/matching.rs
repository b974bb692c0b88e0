//! Match evaluation between a buyer's claim and one extracted candidate
//!
//! Identifier equivalence is decided by five tiers tried in strict order.
//! An identifier match is a conclusive identification of the relevant email:
//! any later failed check is a rejection, never a reason to try another email.
//! There is no amount-only acceptance path.

use serde::Serialize;

use crate::domain::email::ExtractedCandidate;
use crate::domain::payments::ResolvedClaim;
use crate::shared::error::PaymentErrorKind;

/// Standard methods accept up to one currency unit of rounding slack
pub const STANDARD_AMOUNT_TOLERANCE: f64 = 1.0;
/// Peer transfers state an exact amount, so only float noise is tolerated
pub const PEER_AMOUNT_TOLERANCE: f64 = 0.01;
pub const EXPECTED_CURRENCY: &str = "PKR";

const SUBSTRING_MIN_LEN: usize = 8;
const SANITIZED_MAX_LEN_DIFF: usize = 4;
const SUFFIX_MIN_LEN: usize = 12;
const SUFFIX_LEN: usize = 10;

/// Which comparison strategy declared the identifiers equivalent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdMatchTier {
    Exact = 1,
    ClaimContainsCandidate = 2,
    CandidateContainsClaim = 3,
    Sanitized = 4,
    Suffix = 5,
}

/// Compare a claimed identifier with one found in an email
pub fn match_txn_id(claimed: &str, found: &str) -> Option<IdMatchTier> {
    let claimed = claimed.trim().to_lowercase();
    let found = found.trim().to_lowercase();
    if claimed.is_empty() || found.is_empty() {
        return None;
    }

    let claimed_len = claimed.chars().count();
    let found_len = found.chars().count();

    if claimed == found {
        return Some(IdMatchTier::Exact);
    }
    if found_len >= SUBSTRING_MIN_LEN && claimed.contains(&found) {
        return Some(IdMatchTier::ClaimContainsCandidate);
    }
    if claimed_len >= SUBSTRING_MIN_LEN && found.contains(&claimed) {
        return Some(IdMatchTier::CandidateContainsClaim);
    }

    let sanitized_claimed = sanitize(&claimed);
    let sanitized_found = sanitize(&found);
    if !sanitized_claimed.is_empty()
        && sanitized_claimed == sanitized_found
        && claimed_len.abs_diff(found_len) <= SANITIZED_MAX_LEN_DIFF
    {
        return Some(IdMatchTier::Sanitized);
    }

    if claimed_len >= SUFFIX_MIN_LEN && found_len >= SUFFIX_MIN_LEN && suffix(&claimed) == suffix(&found) {
        return Some(IdMatchTier::Suffix);
    }

    None
}

fn sanitize(value: &str) -> String {
    value.chars().filter(|c| c.is_alphanumeric()).collect()
}

fn suffix(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    chars[chars.len() - SUFFIX_LEN..].iter().collect()
}

/// Result of evaluating one candidate against the claim
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Every check passed
    Accepted { tier: IdMatchTier },
    /// No identifier tier matched; the candidate is unrelated to this claim
    IdMismatch,
    /// The identifier matched but a later check failed
    Rejected { tier: IdMatchTier, kind: PaymentErrorKind, message: String },
}

impl MatchOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MatchOutcome::Accepted { .. })
    }

    /// Short reason string for logs
    pub fn reason(&self) -> &str {
        match self {
            MatchOutcome::Accepted { .. } => "accepted",
            MatchOutcome::IdMismatch => "id mismatch",
            MatchOutcome::Rejected { kind, .. } => kind.as_str(),
        }
    }
}

/// Pure decision procedure; holds only merchant-side expectations
#[derive(Debug, Clone, Default)]
pub struct MatchEvaluator {
    merchant_receiver_name: Option<String>,
}

impl MatchEvaluator {
    pub fn new(merchant_receiver_name: Option<String>) -> Self {
        let merchant_receiver_name = merchant_receiver_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Self { merchant_receiver_name }
    }

    pub fn evaluate(&self, candidate: &ExtractedCandidate, claim: &ResolvedClaim) -> MatchOutcome {
        let Some(tier) = candidate
            .txn_id
            .as_deref()
            .and_then(|found| match_txn_id(&claim.claimed_txn_id, found))
        else {
            return MatchOutcome::IdMismatch;
        };

        let reject = |kind: PaymentErrorKind, message: String| MatchOutcome::Rejected { tier, kind, message };
        let peer = claim.method.is_peer_transfer();

        let Some(found_amount) = candidate.amount else {
            return reject(
                PaymentErrorKind::AmountMismatch,
                format!(
                    "Amount mismatch: expected {} {:.2}, but no amount was found in the payment confirmation",
                    EXPECTED_CURRENCY, claim.expected_amount
                ),
            );
        };

        if !peer && candidate.currency != EXPECTED_CURRENCY {
            return reject(
                PaymentErrorKind::AmountMismatch,
                format!(
                    "Currency mismatch: expected {} {:.2}, found {} {:.2}",
                    EXPECTED_CURRENCY, claim.expected_amount, candidate.currency, found_amount
                ),
            );
        }

        if !amount_matches(found_amount, claim.expected_amount, peer) {
            return reject(
                PaymentErrorKind::AmountMismatch,
                format!(
                    "Amount mismatch: expected {} {:.2}, found {} {:.2}",
                    EXPECTED_CURRENCY, claim.expected_amount, candidate.currency, found_amount
                ),
            );
        }

        if peer {
            if let Some(outcome) = self.check_peer_evidence(candidate, claim, tier) {
                return outcome;
            }
        }

        if !candidate.valid {
            return reject(
                PaymentErrorKind::VerificationFailed,
                "Payment confirmation is incomplete and could not be verified".to_string(),
            );
        }

        MatchOutcome::Accepted { tier }
    }

    fn check_peer_evidence(
        &self,
        candidate: &ExtractedCandidate,
        claim: &ResolvedClaim,
        tier: IdMatchTier,
    ) -> Option<MatchOutcome> {
        let reject = |kind: PaymentErrorKind, message: &str| {
            Some(MatchOutcome::Rejected { tier, kind, message: message.to_string() })
        };

        let Some(found_sender) = candidate.sender_name.as_deref() else {
            return reject(
                PaymentErrorKind::MissingSenderInfo,
                "Sender name was not found in the transfer confirmation",
            );
        };
        let claimed_sender = claim.sender_name.as_deref().map(str::trim).unwrap_or_default();
        if claimed_sender.is_empty() {
            return reject(PaymentErrorKind::MissingSenderInfo, "Sender name is required for Raast transfers");
        }
        if found_sender.trim() != claimed_sender {
            return reject(
                PaymentErrorKind::SenderAccountMismatch,
                "Sender account name does not match the transfer confirmation",
            );
        }
        if candidate.sender_bank.is_none() {
            return reject(
                PaymentErrorKind::MissingSenderAccount,
                "Sender bank or wallet was not found in the transfer confirmation",
            );
        }

        let Some(receiver) = candidate.receiver_name.as_deref() else {
            return reject(
                PaymentErrorKind::MissingReceiverInfo,
                "Receiver details were not found in the transfer confirmation",
            );
        };
        if let Some(expected) = &self.merchant_receiver_name {
            if !receiver.trim().eq_ignore_ascii_case(expected) {
                return reject(
                    PaymentErrorKind::VerificationFailed,
                    "Transfer was not received by the merchant account",
                );
            }
        }

        if candidate.raast_id.is_none() {
            return reject(PaymentErrorKind::MissingRaastId, "Raast reference was not found in the transfer confirmation");
        }
        if candidate.transaction_time.is_none() {
            return reject(
                PaymentErrorKind::MissingTransactionTime,
                "Transaction time was not found in the transfer confirmation",
            );
        }
        None
    }
}

fn amount_matches(found: f64, expected: f64, peer: bool) -> bool {
    if peer {
        (found - expected).abs() < PEER_AMOUNT_TOLERANCE
    } else {
        (found - expected).abs() < STANDARD_AMOUNT_TOLERANCE && found >= expected - STANDARD_AMOUNT_TOLERANCE
    }
}
