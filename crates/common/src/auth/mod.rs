//! Authentication and authorization utilities
//!
//! Provides:
//! - Shared sync secret validation (compared by SHA-256 digest)
//! - JWT administrative session generation and validation
//! - `AdminAuthorizer`, which accepts either credential

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Role claim carried by administrative sessions
pub const ADMIN_ROLE: &str = "admin";

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user name or id)
    pub sub: String,

    /// Role; mutations require `admin`
    pub role: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new JWT token
    pub fn generate_token(&self, subject: &str, role: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: subject.to_string(),
            role: role.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidCredential,
            })
    }
}

/// Hash a secret for storage and comparison
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate a presented secret against a stored hash
pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    hash_secret(secret) == stored_hash
}

/// Extract the token from an `Authorization: Bearer ...` header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// How a caller proved administrative access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    SyncSecret,
    Session,
}

/// An authorized administrative caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub credential: CredentialKind,
}

/// Decides whether a request may mutate embeddings
pub struct AdminAuthorizer {
    jwt: Option<JwtManager>,
    sync_secret_hash: Option<String>,
}

impl AdminAuthorizer {
    pub fn new(jwt: Option<JwtManager>, sync_secret: Option<&str>) -> Self {
        Self {
            jwt,
            sync_secret_hash: sync_secret.map(hash_secret),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let jwt = config
            .jwt_secret
            .as_deref()
            .map(|secret| JwtManager::new(secret, config.jwt_expiration_secs));
        Self::new(jwt, config.sync_secret.as_deref())
    }

    /// Whether any credential could ever be accepted
    pub fn is_configured(&self) -> bool {
        self.jwt.is_some() || self.sync_secret_hash.is_some()
    }

    pub fn jwt(&self) -> Option<&JwtManager> {
        self.jwt.as_ref()
    }

    /// Check a raw `Authorization` header value
    pub fn authorize(&self, auth_header: Option<&str>) -> Result<Principal> {
        let header = auth_header.ok_or_else(|| AppError::Unauthorized {
            message: "Missing Authorization header".to_string(),
        })?;
        let token = extract_bearer(header).ok_or_else(|| AppError::Unauthorized {
            message: "Expected a Bearer token".to_string(),
        })?;

        if !self.is_configured() {
            return Err(AppError::Unauthorized {
                message: "No administrative credentials are configured".to_string(),
            });
        }

        if let Some(hash) = &self.sync_secret_hash {
            if verify_secret(token, hash) {
                return Ok(Principal {
                    subject: "sync".to_string(),
                    credential: CredentialKind::SyncSecret,
                });
            }
        }

        let jwt = self.jwt.as_ref().ok_or(AppError::InvalidCredential)?;
        let claims = jwt.validate_token(token)?;
        if claims.role != ADMIN_ROLE {
            return Err(AppError::Unauthorized {
                message: format!("Role '{}' may not modify embeddings", claims.role),
            });
        }

        Ok(Principal {
            subject: claims.sub,
            credential: CredentialKind::Session,
        })
    }
}
