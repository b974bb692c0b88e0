//! Infrastructure adapters module
//!
//! This module contains adapters for the mailbox, durable storage, the
//! catalog directory and authentication.

pub mod authentication;
pub mod catalog;
pub mod download_tokens;
pub mod email_search;
pub mod gmail;
pub mod grant_store;

// Re-export all adapters
pub use authentication::{AuthenticatedUser, AuthenticationAdapter, JwtClaims};
pub use catalog::CatalogDirectory;
pub use download_tokens::DownloadTokenGenerator;
pub use email_search::{search_hints, EmailSearch, SearchHints, SyntheticSearchAdapter};
pub use gmail::GmailSearchAdapter;
pub use grant_store::PurchaseGrantStore;
