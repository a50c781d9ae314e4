//! HS256 bearer tokens.
//!
//! Validation is a three step state machine: extract the token from the
//! `Authorization` header, verify signature and expiry, then turn the claims
//! into a [`Principal`]. Each failure is terminal for the request.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::domain::types::{Principal, Role};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("missing bearer credential")]
    Missing,
    #[error("malformed bearer credential")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid claims: {message}")]
    InvalidClaims { message: String },
    #[error("failed to encode token: {message}")]
    Encoding { message: String },
}

impl TokenError {
    fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::Malformed,
            _ => Self::invalid_claims(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id rendered as a decimal string.
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn into_principal(self) -> Result<Principal, TokenError> {
        let subject_id = self
            .sub
            .parse::<i64>()
            .map_err(|_| TokenError::invalid_claims("subject is not a numeric id"))?;
        if subject_id <= 0 {
            return Err(TokenError::invalid_claims("subject id must be positive"));
        }
        Ok(Principal::new(subject_id, self.role))
    }
}

/// Verifies credentials against the server secret.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Full pipeline over a raw `Authorization` header value.
    pub fn validate_header(&self, header: Option<&str>) -> Result<Principal, TokenError> {
        let token = extract_bearer(header)?;
        self.validate(token)
    }

    pub fn validate(&self, token: &str) -> Result<Principal, TokenError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        data.claims.into_principal()
    }
}

/// Parse step: the header must be `Bearer <token>` with a non-empty token.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, TokenError> {
    let header = header.ok_or(TokenError::Missing)?;
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(TokenError::Malformed)?
        .trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(TokenError::Malformed);
    }
    Ok(token)
}

/// Mints credentials signed with the same secret the validator uses.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, principal: Principal) -> Result<String, TokenError> {
        self.issue_with_ttl(principal, self.ttl)
    }

    /// A negative `ttl` yields an already expired credential.
    pub fn issue_with_ttl(&self, principal: Principal, ttl: Duration) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: principal.subject_id.to_string(),
            role: principal.role,
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.key).map_err(|err| {
            TokenError::Encoding {
                message: err.to_string(),
            }
        })
    }
}
