//! JWT verification for connection authentication
//!
//! Tokens are issued elsewhere and signed with the shared HS256 secret; this
//! service only verifies them and extracts the user identifier.

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Authentication failures
///
/// Any of these is fatal to the connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token has no user identifier")]
    MissingSubject,
}

impl AuthError {
    /// Get error code for API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Expired => "TOKEN_EXPIRED",
            Self::MissingSubject => "MISSING_SUBJECT",
        }
    }
}

/// A user identifier claim, which some issuers encode as a number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimId {
    Text(String),
    Number(i64),
}

impl ClaimId {
    fn into_user_id(self) -> Option<String> {
        match self {
            Self::Text(s) if s.trim().is_empty() => None,
            Self::Text(s) => Some(s),
            Self::Number(n) => Some(n.to_string()),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<ClaimId>,
    /// Alternate user ID claim
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<ClaimId>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Claims {
    /// Resolve the user identifier, preferring `sub` over `userId`
    ///
    /// # Errors
    /// Returns `AuthError::MissingSubject` if neither claim carries a value
    pub fn subject(self) -> Result<String, AuthError> {
        self.sub
            .and_then(ClaimId::into_user_id)
            .or_else(|| self.user_id.and_then(ClaimId::into_user_id))
            .ok_or(AuthError::MissingSubject)
    }
}

/// JWT service for verifying tokens
#[derive(Clone)]
pub struct JwtService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    /// Create a new JWT service with the shared secret
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.validate_exp = true;
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Decode and validate a JWT token
    ///
    /// # Errors
    /// Returns an error if the token is malformed, badly signed, or expired
    pub fn decode_token(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                    _ => AuthError::InvalidToken,
                }
            })?;

        Ok(token_data.claims)
    }

    /// Verify a raw token as presented by a client and return its user id
    ///
    /// A leading `Bearer ` prefix is tolerated.
    ///
    /// # Errors
    /// Returns `AuthError::MissingToken` for an empty token, otherwise any
    /// decoding error or `AuthError::MissingSubject`
    pub fn verify(&self, raw: Option<&str>) -> Result<String, AuthError> {
        let token = raw
            .map(strip_bearer)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        self.decode_token(token)?.subject()
    }
}

/// Strip an optional `Bearer ` scheme prefix
#[must_use]
pub fn strip_bearer(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ if trimmed.eq_ignore_ascii_case("bearer") => "",
        _ => trimmed,
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-secret-key-that-is-long-enough";

    fn sign(claims: &serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> i64 {
        (Utc::now() + Duration::minutes(15)).timestamp()
    }

    #[test]
    fn test_verify_sub_claim() {
        let service = JwtService::new(SECRET);
        let token = sign(&json!({"sub": "u1", "exp": future_exp()}), SECRET);

        assert_eq!(service.verify(Some(&token)).unwrap(), "u1");
    }

    #[test]
    fn test_verify_user_id_claim() {
        let service = JwtService::new(SECRET);
        let token = sign(&json!({"userId": 42, "exp": future_exp()}), SECRET);

        assert_eq!(service.verify(Some(&token)).unwrap(), "42");
    }

    #[test]
    fn test_bearer_prefix_tolerated() {
        let service = JwtService::new(SECRET);
        let token = sign(&json!({"sub": "u1", "exp": future_exp()}), SECRET);

        let with_prefix = format!("Bearer {token}");
        assert_eq!(service.verify(Some(&with_prefix)).unwrap(), "u1");
    }

    #[test]
    fn test_missing_token() {
        let service = JwtService::new(SECRET);
        assert_eq!(service.verify(None), Err(AuthError::MissingToken));
        assert_eq!(service.verify(Some("")), Err(AuthError::MissingToken));
        assert_eq!(service.verify(Some("Bearer ")), Err(AuthError::MissingToken));
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::new(SECRET);
        let result = service.verify(Some("invalid.token.here"));
        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_wrong_signature() {
        let service = JwtService::new(SECRET);
        let token = sign(&json!({"sub": "u1", "exp": future_exp()}), "another-secret");

        assert_eq!(service.verify(Some(&token)), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_expired_token() {
        let service = JwtService::new(SECRET);
        let exp = (Utc::now() - Duration::hours(1)).timestamp();
        let token = sign(&json!({"sub": "u1", "exp": exp}), SECRET);

        assert_eq!(service.verify(Some(&token)), Err(AuthError::Expired));
    }

    #[test]
    fn test_missing_exp_is_rejected() {
        let service = JwtService::new(SECRET);
        let token = sign(&json!({"sub": "u1"}), SECRET);

        assert_eq!(service.verify(Some(&token)), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_missing_subject() {
        let service = JwtService::new(SECRET);
        let token = sign(&json!({"exp": future_exp(), "sub": ""}), SECRET);

        assert_eq!(service.verify(Some(&token)), Err(AuthError::MissingSubject));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AuthError::Expired.code(), "TOKEN_EXPIRED");
        assert_eq!(AuthError::MissingToken.code(), "MISSING_TOKEN");
    }
}
