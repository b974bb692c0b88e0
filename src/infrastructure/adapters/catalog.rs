//! In-process product and user directory
//!
//! Seeded from the `catalog` configuration section. Product and user
//! management live elsewhere; the verification engine only reads.

use std::collections::HashMap;

use tracing::info;

use crate::config::app_config::CatalogConfig;
use crate::domain::payments::{Product, User};
use crate::shared::error::{AppError, AppResult, PaymentErrorKind};

#[derive(Debug, Clone, Default)]
pub struct CatalogDirectory {
    products: HashMap<String, Product>,
    users: HashMap<String, User>,
}

impl CatalogDirectory {
    pub fn new(products: Vec<Product>, users: Vec<User>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        let directory = Self::new(config.products.clone(), config.users.clone());
        info!(
            products = directory.products.len(),
            users = directory.users.len(),
            "Catalog directory loaded"
        );
        directory
    }

    pub fn find_product(&self, product_id: &str) -> Option<&Product> {
        self.products.get(product_id)
    }

    pub fn find_user(&self, user_id: &str) -> Option<&User> {
        self.users.get(user_id)
    }

    /// Resolve a product or fail with `PRODUCT_NOT_FOUND`
    pub fn product(&self, product_id: &str) -> AppResult<Product> {
        self.find_product(product_id).cloned().ok_or_else(|| {
            AppError::payment(PaymentErrorKind::ProductNotFound, "Product not found")
        })
    }

    /// Resolve a user or fail with `USER_NOT_FOUND`
    pub fn user(&self, user_id: &str) -> AppResult<User> {
        self.find_user(user_id)
            .cloned()
            .ok_or_else(|| AppError::payment(PaymentErrorKind::UserNotFound, "User not found"))
    }
}
