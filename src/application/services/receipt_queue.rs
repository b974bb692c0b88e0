//! Background receipt delivery
//!
//! Receipts are a side effect of a granted purchase and never hold up the
//! verification response. Jobs go onto a bounded channel drained by a single
//! worker. Failures wait out a linear backoff in their own task while the worker
//! keeps serving the channel, and a full channel parks the job in a background
//! send instead of dropping it (at-least-once).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::app_config::ReceiptsConfig;
use crate::domain::payments::{Product, Transaction, User};
use crate::shared::error::{AppError, AppResult};

/// Everything needed to render a purchase receipt
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptJob {
    pub transaction: Transaction,
    pub user_name: String,
    pub user_email: String,
    pub product_title: String,
}

impl ReceiptJob {
    pub fn new(transaction: &Transaction, user: &User, product: &Product) -> Self {
        Self {
            transaction: transaction.clone(),
            user_name: user.name.clone(),
            user_email: user.email.clone(),
            product_title: product.title.clone(),
        }
    }
}

/// Seam to whatever renders and sends receipts
#[async_trait]
pub trait ReceiptRenderer: Send + Sync {
    async fn deliver(&self, job: &ReceiptJob) -> AppResult<()>;
}

/// Default renderer: records the receipt in the service log
#[derive(Debug, Default)]
pub struct LoggingReceiptRenderer;

#[async_trait]
impl ReceiptRenderer for LoggingReceiptRenderer {
    async fn deliver(&self, job: &ReceiptJob) -> AppResult<()> {
        info!(
            txn_id = %job.transaction.txn_id,
            user_email = %job.user_email,
            product = %job.product_title,
            amount = job.transaction.amount,
            "Purchase receipt issued"
        );
        Ok(())
    }
}

/// Handle for enqueueing receipt jobs
#[derive(Clone)]
pub struct ReceiptQueue {
    sender: Option<mpsc::Sender<ReceiptJob>>,
}

impl ReceiptQueue {
    /// Spawn the worker and return the queue handle.
    ///
    /// The worker stops once every handle has been dropped, the channel drained
    /// and the last retry settled.
    pub fn start(config: &ReceiptsConfig, renderer: Arc<dyn ReceiptRenderer>) -> (Self, Option<JoinHandle<()>>) {
        if !config.enabled {
            info!("Receipt queue disabled");
            return (Self::disabled(), None);
        }

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let worker = tokio::spawn(run_worker(
            receiver,
            renderer,
            config.max_attempts,
            Duration::from_millis(config.retry_backoff_ms),
        ));
        (Self { sender: Some(sender) }, Some(worker))
    }

    /// Queue that drops every job
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Enqueue without waiting. A full channel hands the job to a background
    /// send; only a stopped worker is an error.
    pub fn enqueue(&self, job: ReceiptJob) -> AppResult<()> {
        let Some(sender) = &self.sender else {
            debug!(txn_id = %job.transaction.txn_id, "Receipt queue disabled, dropping job");
            return Ok(());
        };

        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(txn_id = %job.transaction.txn_id, "Receipt queue full, waiting for capacity");
                let sender = sender.clone();
                tokio::spawn(async move {
                    if let Err(mpsc::error::SendError(job)) = sender.send(job).await {
                        error!(txn_id = %job.transaction.txn_id, "Receipt queue closed before the job was accepted");
                    }
                });
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(job)) => Err(AppError::Internal(format!(
                "receipt queue closed, dropped {}",
                job.transaction.txn_id
            ))),
        }
    }
}

/// A job and the attempt it is on
struct Attempt {
    job: ReceiptJob,
    number: u32,
}

async fn run_worker(
    mut receiver: mpsc::Receiver<ReceiptJob>,
    renderer: Arc<dyn ReceiptRenderer>,
    max_attempts: u32,
    backoff: Duration,
) {
    let mut retries: JoinSet<Attempt> = JoinSet::new();
    let mut accepting = true;

    loop {
        let attempt = tokio::select! {
            received = receiver.recv(), if accepting => match received {
                Some(job) => Attempt { job, number: 1 },
                None => {
                    accepting = false;
                    continue;
                }
            },
            Some(due) = retries.join_next(), if !retries.is_empty() => match due {
                Ok(attempt) => attempt,
                Err(e) => {
                    error!(error = %e, "Receipt retry task failed");
                    continue;
                }
            },
            else => break,
        };

        let delivered = renderer.deliver(&attempt.job).await;
        match delivered {
            Ok(()) => debug!(txn_id = %attempt.job.transaction.txn_id, attempt = attempt.number, "Receipt delivered"),
            Err(e) if attempt.number < max_attempts => {
                warn!(
                    txn_id = %attempt.job.transaction.txn_id,
                    attempt = attempt.number,
                    error = %e,
                    "Receipt delivery failed, retrying"
                );
                let delay = backoff * attempt.number;
                retries.spawn(async move {
                    tokio::time::sleep(delay).await;
                    Attempt { job: attempt.job, number: attempt.number + 1 }
                });
            }
            Err(e) => {
                error!(
                    txn_id = %attempt.job.transaction.txn_id,
                    attempts = attempt.number,
                    error = %e,
                    "Receipt delivery abandoned"
                );
            }
        }
    }
    debug!("Receipt worker stopped");
}
