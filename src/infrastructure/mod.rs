//! Infrastructure layer - External concerns and adapters
//!
//! This module contains the mailbox adapters, the grant store, the catalog
//! directory and the HTTP surface.

pub mod adapters;
pub mod http;

// Re-export main adapters
pub use adapters::{CatalogDirectory, EmailSearch, GmailSearchAdapter, PurchaseGrantStore, SyntheticSearchAdapter};
