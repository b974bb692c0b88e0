//! Authentication adapter for bearer token validation
//!
//! Buyers authenticate with an HS256 JWT issued by the storefront. The
//! subject claim is the user id every verification is attributed to.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::app_config::JwtConfig;
use crate::shared::error::{AppError, AppResult};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Issued at
    pub iat: usize,

    /// Expiration time
    pub exp: usize,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

/// Caller identity extracted from a validated token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Adapter for authentication services
#[derive(Clone)]
pub struct AuthenticationAdapter {
    config: JwtConfig,
}

impl AuthenticationAdapter {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    /// Validate an `Authorization` header value
    pub fn authenticate(&self, header: Option<&str>) -> AppResult<AuthenticatedUser> {
        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Authentication("Invalid token format".to_string()))?;

        self.validate_jwt_token(token)
    }

    fn validate_jwt_token(&self, token: &str) -> AppResult<AuthenticatedUser> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.config.secret_key.as_ref()),
            &validation,
        )
        .map_err(|e| {
            warn!("JWT validation failed: {}", e);
            AppError::Authentication(format!("JWT validation failed: {}", e))
        })?;

        let claims = token_data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AppError::Authentication("Token has no subject".to_string()));
        }

        debug!(user_id = %claims.sub, "JWT token validated");
        Ok(AuthenticatedUser { user_id: claims.sub, name: claims.name, email: claims.email })
    }

    /// Sign a token for a user; used by the development token tool and tests
    pub fn issue_token(&self, user_id: &str, name: Option<&str>, email: Option<&str>, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp() as usize,
            exp: (now + ttl).timestamp() as usize,
            name: name.map(str::to_string),
            email: email.map(str::to_string),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.secret_key.as_ref()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}
