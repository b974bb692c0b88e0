//! Application services - Orchestration of domain logic

pub mod metrics_service;
pub mod receipt_queue;
pub mod verification_service;

pub use metrics_service::MetricsService;
pub use receipt_queue::{LoggingReceiptRenderer, ReceiptJob, ReceiptQueue, ReceiptRenderer};
pub use verification_service::{VerificationOutcome, VerificationService};
