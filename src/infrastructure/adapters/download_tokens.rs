//! One-time download link minting

use rand::RngCore;

use crate::config::app_config::DownloadsConfig;

#[derive(Debug, Clone)]
pub struct DownloadTokenGenerator {
    base_url: String,
    token_bytes: usize,
}

impl DownloadTokenGenerator {
    pub fn new(config: &DownloadsConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token_bytes: config.token_bytes,
        }
    }

    /// Hex-encoded random token
    pub fn generate_token(&self) -> String {
        let mut bytes = vec![0u8; self.token_bytes];
        rand::rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Fresh download URL with a new token as its last path segment
    pub fn download_url(&self) -> String {
        format!("{}/{}", self.base_url, self.generate_token())
    }
}
