//! JWT access tokens
//!
//! Tokens are issued by the SawiTrack login service and signed with HS256.
//! This service only needs to verify them; `generate_token` exists for tooling
//! and tests.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::roles::Role;
use crate::types::SawitError;

/// Payload stored in the token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Display name, recorded as `closedBy` and in the activity log
    pub name: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

/// Input for creating a new token
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub user_id: String,
    pub name: String,
    pub role: Role,
}

/// JWT validator and generator
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Returns an error if the secret is empty or shorter than 32 bytes
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, SawitError> {
        if secret.is_empty() {
            return Err(SawitError::Config("JWT_SECRET is required outside dev mode".into()));
        }

        if secret.len() < 32 {
            return Err(SawitError::Config("JWT_SECRET must be at least 32 characters".into()));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Validator for dev mode (fixed secret)
    pub fn new_dev() -> Self {
        Self {
            secret: "sawitrack-dev-secret-not-for-production".into(),
            expiry_seconds: 3600,
        }
    }

    pub fn generate_token(&self, input: TokenInput) -> Result<String, SawitError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| SawitError::Internal(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: input.user_id,
            name: input.name,
            role: input.role,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| SawitError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Verify and decode a token
    pub fn verify_token(&self, token: &str) -> Result<Claims, SawitError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            let msg = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidSignature => "Invalid signature",
                _ => "Invalid token",
            };
            SawitError::Unauthorized(msg.into())
        })
    }
}

/// Extract token from an Authorization header.
/// Supports "Bearer <token>" and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> JwtValidator {
        JwtValidator::new("test-secret-that-is-at-least-32-characters-long".into(), 3600).unwrap()
    }

    fn input(role: Role) -> TokenInput {
        TokenInput {
            user_id: "u-1".into(),
            name: "Siti".into(),
            role,
        }
    }

    #[test]
    fn test_generate_and_verify_token() {
        let validator = test_validator();
        let token = validator.generate_token(input(Role::Manager)).unwrap();

        let claims = validator.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.name, "Siti");
        assert_eq!(claims.role, Role::Manager);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = JwtValidator::new("different-secret-that-is-at-least-32-characters".into(), 3600)
            .unwrap();
        let token = test_validator().generate_token(input(Role::Staff)).unwrap();

        let err = other.verify_token(&token).unwrap_err();
        assert!(matches!(err, SawitError::Unauthorized(_)));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(test_validator().verify_token("not-a-jwt").is_err());
    }

    #[test]
    fn test_secret_validation() {
        assert!(JwtValidator::new("short".into(), 3600).is_err());
        assert!(JwtValidator::new("".into(), 3600).is_err());
        assert!(JwtValidator::new("this-secret-is-at-least-32-chars-long".into(), 3600).is_ok());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    }
}
