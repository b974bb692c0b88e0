//! Payment verification orchestrator
//!
//! Drives one claim through `START -> DUPLICATE_CHECK -> SEARCH ->
//! EXTRACT_AND_MATCH -> COMMIT -> DONE`; any state may end in a rejection.
//! The service holds no per-request state, so it is shared freely across
//! concurrent requests. The advisory duplicate check only saves a mailbox
//! round trip; the store's uniqueness constraint at commit is what keeps a
//! transaction id from being granted twice. A reserved transaction whose grant
//! never finished is completed when its owner resubmits the same claim.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::application::services::metrics_service::{MetricsService, OUTCOME_GRANTED};
use crate::application::services::receipt_queue::{ReceiptJob, ReceiptQueue};
use crate::config::AppConfig;
use crate::domain::email::{ExtractedCandidate, RawEmail};
use crate::domain::extraction::TransactionExtractor;
use crate::domain::matching::{IdMatchTier, MatchEvaluator, MatchOutcome, STANDARD_AMOUNT_TOLERANCE};
use crate::domain::payments::{
    PaymentClaim, PaymentMethod, Product, ProductSummary, ResolvedClaim, Transaction, TransactionDetails, User,
    UserSummary,
};
use crate::infrastructure::adapters::{CatalogDirectory, DownloadTokenGenerator, EmailSearch, PurchaseGrantStore};
use crate::shared::error::{AppError, AppResult, PaymentErrorKind};
use crate::shared::logging::LoggingUtils;

pub const VERIFIED_MESSAGE: &str = "Payment verified successfully";

/// A granted purchase
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub transaction: Transaction,
    pub message: String,
}

/// Search windows and the fallback used when the first pass is empty
#[derive(Debug, Clone, Copy)]
struct SearchPolicy {
    default_days_back: u32,
    widened_days_back: u32,
    fallback_method: PaymentMethod,
    timeout: Duration,
}

pub struct VerificationService {
    search: Arc<dyn EmailSearch>,
    store: Arc<PurchaseGrantStore>,
    catalog: Arc<CatalogDirectory>,
    extractor: TransactionExtractor,
    evaluator: MatchEvaluator,
    tokens: DownloadTokenGenerator,
    receipts: ReceiptQueue,
    metrics: Arc<MetricsService>,
    policy: SearchPolicy,
}

impl VerificationService {
    pub fn new(
        config: &AppConfig,
        search: Arc<dyn EmailSearch>,
        store: Arc<PurchaseGrantStore>,
        catalog: Arc<CatalogDirectory>,
        receipts: ReceiptQueue,
        metrics: Arc<MetricsService>,
    ) -> AppResult<Self> {
        Ok(Self {
            search,
            store,
            catalog,
            extractor: TransactionExtractor::new()?,
            evaluator: MatchEvaluator::new(config.verification.merchant_receiver_name.clone()),
            tokens: DownloadTokenGenerator::new(&config.downloads),
            receipts,
            metrics,
            policy: SearchPolicy {
                default_days_back: config.email.default_days_back,
                widened_days_back: config.email.widened_days_back,
                fallback_method: config.email.fallback_method,
                timeout: Duration::from_secs(config.verification.search_timeout_seconds),
            },
        })
    }

    /// Verify a claim and grant the purchase on success
    #[instrument(skip(self, claim), fields(method = %claim.method, txn_id = %claim.txn_id(), user_id = %claim.user_id))]
    pub async fn verify(&self, claim: PaymentClaim) -> AppResult<VerificationOutcome> {
        let request_id = LoggingUtils::generate_request_id();
        LoggingUtils::log_claim(&request_id, &claim.user_id, claim.method.as_str(), claim.txn_id());
        let started = Instant::now();

        let result = self.run(&claim).await;

        let outcome = match &result {
            Ok(_) => OUTCOME_GRANTED,
            Err(e) => e.error_type(),
        };
        self.metrics.record_outcome(outcome, started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            if e.is_server_fault() {
                error!(request_id = %request_id, error = %e, "Payment verification failed with a server error");
            }
        }
        LoggingUtils::log_outcome(&request_id, claim.txn_id(), outcome, started.elapsed().as_millis() as u64);

        result
    }

    async fn run(&self, claim: &PaymentClaim) -> AppResult<VerificationOutcome> {
        // START
        let (resolved, product, user) = self.resolve_claim(claim)?;

        // DUPLICATE_CHECK
        if let Some(existing) = self.store.find_by_txn_id(&resolved.claimed_txn_id).await? {
            if is_interrupted_grant(&existing, &user, &product) {
                warn!(transaction_id = %existing.id, "Completing a grant interrupted after commit");
                let stored = self.complete_grant(existing).await?;
                return Ok(self.finish(stored, &user, &product));
            }
            LoggingUtils::log_security_event(
                "transaction_replay",
                &format!("transaction id {} already used", resolved.claimed_txn_id),
                &claim.user_id,
            );
            return Err(duplicate_transaction());
        }

        // SEARCH
        let emails = self.search_emails(&resolved).await?;

        // EXTRACT_AND_MATCH
        let (candidate, tier) = self.find_matching_candidate(&emails, &resolved)?;
        info!(tier = ?tier, "Payment confirmation matched");

        // COMMIT
        let transaction = self.build_transaction(&resolved, &candidate, &product, &user);
        let stored = match self.store.create_verified_transaction(&transaction).await {
            Ok(stored) => stored,
            Err(AppError::Conflict(detail)) => {
                LoggingUtils::log_security_event("transaction_race", &detail, &claim.user_id);
                return Err(duplicate_transaction());
            }
            Err(e) => return Err(e),
        };
        let stored = self.complete_grant(stored).await?;

        // DONE
        Ok(self.finish(stored, &user, &product))
    }

    fn finish(&self, transaction: Transaction, user: &User, product: &Product) -> VerificationOutcome {
        if let Err(e) = self.receipts.enqueue(ReceiptJob::new(&transaction, user, product)) {
            warn!(error = %e, "Failed to enqueue purchase receipt");
        }
        VerificationOutcome { transaction, message: VERIFIED_MESSAGE.to_string() }
    }

    /// Validate the claim and work out the amount the email has to show
    fn resolve_claim(&self, claim: &PaymentClaim) -> AppResult<(ResolvedClaim, Product, User)> {
        let txn_id = claim.txn_id();
        if txn_id.is_empty() {
            return Err(AppError::Validation("Transaction ID is required".to_string()));
        }

        let peer = claim.method.is_peer_transfer();
        let sender_name = claim
            .sender_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        if peer && (sender_name.is_none() || claim.sender_amount.is_none()) {
            return Err(AppError::payment(
                PaymentErrorKind::MissingSenderInfo,
                "Sender name and sent amount are required for JazzCash to NayaPay transfers",
            ));
        }

        let product = self.catalog.product(&claim.product_id)?;
        let user = self.catalog.user(&claim.user_id)?;

        let expected_amount = match claim.sender_amount {
            Some(sent) if peer => {
                if !sent.is_finite() || sent < product.price - STANDARD_AMOUNT_TOLERANCE {
                    return Err(AppError::payment(
                        PaymentErrorKind::AmountMismatch,
                        format!(
                            "Amount mismatch: expected at least PKR {:.2}, but the sent amount is PKR {:.2}",
                            product.price, sent
                        ),
                    ));
                }
                sent
            }
            _ => product.price,
        };

        let resolved = ResolvedClaim {
            method: claim.method,
            claimed_txn_id: txn_id.to_string(),
            expected_amount,
            sender_name,
        };
        Ok((resolved, product, user))
    }

    /// Claimed method first; one widened retry with the fallback method when nothing turns up
    async fn search_emails(&self, claim: &ResolvedClaim) -> AppResult<Vec<RawEmail>> {
        let seconds = self.policy.timeout.as_secs();
        let emails = tokio::time::timeout(self.policy.timeout, self.search_with_fallback(claim))
            .await
            .map_err(|_| AppError::SearchTimeout { seconds })??;

        if emails.is_empty() {
            return Err(AppError::payment(
                PaymentErrorKind::NoEmailsFound,
                "No payment confirmation emails found. Please wait a few minutes and try again",
            ));
        }
        Ok(emails)
    }

    async fn search_with_fallback(&self, claim: &ResolvedClaim) -> AppResult<Vec<RawEmail>> {
        let emails = self
            .search
            .search(claim.method, self.policy.default_days_back, &claim.claimed_txn_id, claim.expected_amount)
            .await?;
        if !emails.is_empty() {
            debug!(count = emails.len(), adapter = self.search.name(), "Candidate emails found");
            return Ok(emails);
        }

        info!(
            fallback_method = %self.policy.fallback_method,
            days_back = self.policy.widened_days_back,
            "No emails in default window, widening search"
        );
        self.search
            .search(
                self.policy.fallback_method,
                self.policy.widened_days_back,
                &claim.claimed_txn_id,
                claim.expected_amount,
            )
            .await
    }

    /// First accepted candidate wins. An id match that fails a later check ends the search.
    fn find_matching_candidate(
        &self,
        emails: &[RawEmail],
        claim: &ResolvedClaim,
    ) -> AppResult<(ExtractedCandidate, IdMatchTier)> {
        for (index, email) in emails.iter().enumerate() {
            let candidate = self.extractor.extract(&email.body, claim.method);
            match self.evaluator.evaluate(&candidate, claim) {
                MatchOutcome::Accepted { tier } => return Ok((candidate, tier)),
                MatchOutcome::IdMismatch => {
                    debug!(email = index, found = ?candidate.txn_id, "Email does not reference the claimed id");
                }
                MatchOutcome::Rejected { tier, kind, message } => {
                    warn!(email = index, tier = ?tier, error_type = %kind, "Matched email failed verification");
                    return Err(AppError::payment(kind, message));
                }
            }
        }

        Err(AppError::payment(
            PaymentErrorKind::TxnidNotFound,
            "Transaction ID not found in recent payment confirmation emails",
        ))
    }

    fn build_transaction(
        &self,
        claim: &ResolvedClaim,
        candidate: &ExtractedCandidate,
        product: &Product,
        user: &User,
    ) -> Transaction {
        let matched_txn_id = candidate
            .txn_id
            .clone()
            .filter(|found| Transaction::canonical_key(found) != Transaction::canonical_key(&claim.claimed_txn_id));
        let peer = claim.method.is_peer_transfer();

        Transaction {
            id: Uuid::new_v4(),
            user: user.id.clone(),
            product: product.id.clone(),
            method: claim.method,
            txn_id: claim.claimed_txn_id.clone(),
            matched_txn_id,
            amount: candidate.amount.unwrap_or(claim.expected_amount),
            currency: candidate.currency.clone(),
            verified: true,
            verified_at: Utc::now(),
            download_url: None,
            sender_name: if peer { candidate.sender_name.clone() } else { None },
            receiver_name: if peer { candidate.receiver_name.clone() } else { None },
            raast_id: if peer { candidate.raast_id.clone() } else { None },
            transaction_time: if peer { candidate.transaction_time.clone() } else { None },
        }
    }

    /// Buyer and purchase membership plus the download link. Safe to repeat.
    async fn complete_grant(&self, transaction: Transaction) -> AppResult<Transaction> {
        self.store.add_buyer(&transaction.product, &transaction.user).await?;
        self.store.add_purchase(&transaction.user, transaction.id).await?;

        if transaction.download_url.is_some() {
            return Ok(transaction);
        }
        self.store
            .set_download_url(&transaction.txn_id, &self.tokens.download_url())
            .await
    }

    /// A stored transaction with its buyer and product summaries, visible to its owner only
    pub async fn transaction_details(&self, txn_id: &str, requester: &str) -> AppResult<TransactionDetails> {
        let transaction = self
            .store
            .find_by_txn_id(txn_id)
            .await?
            .filter(|tx| tx.user == requester)
            .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

        let user_details = self.catalog.find_user(&transaction.user).map(UserSummary::from);
        let product_details = self.catalog.find_product(&transaction.product).map(ProductSummary::from);
        Ok(TransactionDetails { transaction, user_details, product_details })
    }

    /// The user's verified transactions, newest first
    pub async fn user_transactions(&self, user_id: &str) -> AppResult<Vec<Transaction>> {
        self.store.transactions_for_user(user_id).await
    }

    pub fn search_adapter_name(&self) -> &'static str {
        self.search.name()
    }
}

/// The download link is written last, so a committed transaction without one
/// never finished granting. Only its own buyer may complete it.
fn is_interrupted_grant(existing: &Transaction, user: &User, product: &Product) -> bool {
    existing.download_url.is_none() && existing.user == user.id && existing.product == product.id
}

fn duplicate_transaction() -> AppError {
    AppError::payment(
        PaymentErrorKind::DuplicateTransaction,
        "This transaction ID has already been used",
    )
}
