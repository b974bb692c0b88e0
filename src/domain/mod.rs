//! Domain layer - Core business logic and domain models
//!
//! This module contains the payment verification rules that are independent
//! of infrastructure concerns like HTTP, mailboxes and storage: the data
//! model, the email extractor and the match evaluator. Everything here is pure.

pub mod email;
pub mod extraction;
pub mod health;
pub mod matching;
pub mod payments;

pub use email::{ExtractedCandidate, RawEmail, DEFAULT_CURRENCY};
pub use extraction::TransactionExtractor;
pub use health::{BackendProbe, HealthResponse, HealthStatus};
pub use matching::{match_txn_id, IdMatchTier, MatchEvaluator, MatchOutcome};
pub use payments::{
    PaymentClaim, PaymentMethod, Product, ProductSummary, ResolvedClaim, Transaction, TransactionDetails, User,
    UserSummary,
};
