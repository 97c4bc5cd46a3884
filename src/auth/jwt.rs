//! JWT Token Handler
//! Issues and verifies HS256 bearer tokens carrying the user id as subject

use crate::auth::models::Claims;
use crate::error::ConfigError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use tracing::debug;

/// Token lifetime: one hour from issuance
pub const TOKEN_TTL_SECS: i64 = 3600;

/// Why a token was refused. Callers only ever see "unauthorized"; the
/// distinction is kept for logs.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,

    #[error("expired token")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHandler {
    /// Create a handler for `secret`. A blank secret would sign tokens anyone
    /// can forge, so it is refused.
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Issue a token for `subject`, returning it with its lifetime in seconds.
    pub fn issue(&self, subject: &str) -> Result<(String, usize), TokenError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if at `issued_at`.
    pub fn issue_at(
        &self,
        subject: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<(String, usize), TokenError> {
        let expiration = issued_at + Duration::seconds(TOKEN_TTL_SECS);

        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp().max(0) as usize,
            exp: expiration.timestamp().max(0) as usize,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)?;

        debug!("Issued token for user {}, expires at {}", subject, expiration);

        Ok((token, TOKEN_TTL_SECS as usize))
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            },
        )?;

        // jsonwebtoken accepts a token during its final second; expiry is inclusive here
        let now = Utc::now().timestamp().max(0) as usize;
        if decoded.claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(decoded.claims)
    }
}
