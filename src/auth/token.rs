//! Bearer token issuance and validation (HS256 compact JWS).

use std::collections::HashSet;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::validation::{MAX_LEEWAY_SECS, MAX_LIFETIME_MINUTES};
use crate::config::TokenConfig;

/// Errors produced while issuing or validating a token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Not a decodable compact token (segments, base64, JSON).
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Signature does not match, or the token is not HS256.
    #[error("Token signature rejected")]
    Signature,

    #[error("Token expired")]
    Expired,

    #[error("Token carries no username")]
    MissingUsername,

    /// Signing backend or key failure; not the caller's fault.
    #[error("Token processing failed: {0}")]
    Unexpected(String),
}

impl TokenError {
    pub fn is_unexpected(&self) -> bool {
        matches!(self, TokenError::Unexpected(_))
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::Signature,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingAlgorithm => TokenError::Malformed(err.to_string()),
            _ => TokenError::Unexpected(err.to_string()),
        }
    }
}

/// Wire claims. Names match tokens minted by the existing login service.
/// Only `exp` is required; `nbf` and `iat` are written on issue but optional on input.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "unique_name", default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(rename = "Role", default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
    exp: i64,
}

/// A verified identity decoded from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    username: String,
    role: String,
    issued_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
}

impl Principal {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// `None` when the token carried no `iat` claim.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Issues and validates HS256 bearer tokens with one process-wide symmetric key.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
    default_role: String,
}

impl TokenService {
    pub fn new(secret: &[u8], lifetime: Duration, default_role: impl Into<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime,
            default_role: default_role.into(),
        }
    }

    /// Build from configuration; the key is base64 encoded.
    pub fn from_config(config: &TokenConfig) -> Result<Self, TokenError> {
        let secret = STANDARD
            .decode(config.signing_key.trim())
            .map_err(|e| TokenError::Unexpected(format!("signing key is not base64: {}", e)))?;

        let lifetime = Some(config.lifetime_minutes)
            .filter(|minutes| *minutes <= MAX_LIFETIME_MINUTES)
            .and_then(|minutes| i64::try_from(minutes).ok())
            .and_then(Duration::try_minutes)
            .ok_or_else(|| {
                TokenError::Unexpected(format!(
                    "lifetime of {} minutes is out of range",
                    config.lifetime_minutes
                ))
            })?;
        if config.leeway_secs > MAX_LEEWAY_SECS {
            return Err(TokenError::Unexpected(format!(
                "leeway of {} seconds is out of range",
                config.leeway_secs
            )));
        }

        let mut service = Self::new(&secret, lifetime, config.default_role.clone());
        service.validation.leeway = config.leeway_secs;
        Ok(service)
    }

    /// Issue a token for `username`, valid from now for the configured lifetime.
    pub fn issue(&self, username: &str) -> Result<String, TokenError> {
        self.issue_at(username, Utc::now())
    }

    /// Issue a token as if the current time were `issued_at`.
    pub fn issue_at(&self, username: &str, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| TokenError::Unexpected("token expiry is out of range".into()))?;
        let iat = issued_at.timestamp();
        let claims = Claims {
            username: Some(username.to_string()),
            role: Some(self.default_role.clone()),
            nbf: Some(iat),
            iat: Some(iat),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(TokenError::from)
    }

    /// Verify signature and expiry, then extract the principal.
    pub fn validate(&self, token: &str) -> Result<Principal, TokenError> {
        let data = decode::<Claims>(token.trim(), &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        let username = match claims.username {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(TokenError::MissingUsername),
        };

        Ok(Principal {
            username,
            role: claims.role.unwrap_or_default(),
            issued_at: claims.iat.map(timestamp).transpose()?,
            expires_at: timestamp(claims.exp)?,
        })
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .field("default_role", &self.default_role)
            .finish_non_exhaustive()
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, TokenError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| TokenError::Malformed(format!("timestamp {} out of range", secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"0123456789abcdef0123456789abcdef", Duration::minutes(1800), "Admin")
    }

    #[test]
    fn test_issue_then_validate() {
        let service = service();
        let token = service.issue("alice").unwrap();
        assert_eq!(token.split('.').count(), 3);

        let principal = service.validate(&token).unwrap();
        assert_eq!(principal.username(), "alice");
        assert_eq!(principal.role(), "Admin");
        assert_eq!(
            principal.expires_at() - principal.issued_at().unwrap(),
            Duration::minutes(1800)
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = service();
        let token = service
            .issue_at("alice", Utc::now() - Duration::minutes(1801))
            .unwrap();
        assert_eq!(service.validate(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_altered_signature_rejected() {
        let service = service();
        let token = service.issue("alice").unwrap();
        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut sig = signature.as_bytes().to_vec();
        sig[0] = if sig[0] == b'A' { b'B' } else { b'A' };
        let tampered = format!("{}.{}", head, String::from_utf8(sig).unwrap());

        let err = service.validate(&tampered).unwrap_err();
        assert!(!err.is_unexpected());
        assert!(matches!(err, TokenError::Signature | TokenError::Malformed(_)));
    }

    #[test]
    fn test_foreign_key_rejected() {
        let other = TokenService::new(b"another-key-another-key-another!", Duration::minutes(5), "Admin");
        let token = other.issue("alice").unwrap();
        assert_eq!(service().validate(&token).unwrap_err(), TokenError::Signature);
    }

    #[test]
    fn test_malformed_input_is_typed_failure() {
        let service = service();
        for input in ["", "garbage", "a.b", "a.b.c", "....", "eyJhbGciOiJIUzI1NiJ9.e30"] {
            let err = service.validate(input).unwrap_err();
            assert!(!err.is_unexpected(), "{:?} for {:?}", err, input);
        }
    }

    #[test]
    fn test_missing_username_rejected() {
        let service = service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            username: Some("   ".into()),
            role: Some("Admin".into()),
            nbf: Some(now),
            iat: Some(now),
            exp: now + 60,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &service.encoding_key).unwrap();
        assert_eq!(service.validate(&token).unwrap_err(), TokenError::MissingUsername);

        let claims = Claims { username: None, ..claims };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &service.encoding_key).unwrap();
        assert_eq!(service.validate(&token).unwrap_err(), TokenError::MissingUsername);
    }

    #[test]
    fn test_from_config_uses_base64_key() {
        let config = TokenConfig {
            signing_key: STANDARD.encode(b"0123456789abcdef0123456789abcdef"),
            ..TokenConfig::default()
        };
        let from_config = TokenService::from_config(&config).unwrap();
        let token = service().issue("bob").unwrap();
        assert_eq!(from_config.validate(&token).unwrap().username(), "bob");

        let bad = TokenConfig {
            signing_key: "%%%".into(),
            ..TokenConfig::default()
        };
        assert!(TokenService::from_config(&bad).unwrap_err().is_unexpected());
    }

    #[test]
    fn test_token_without_nbf_and_iat_accepted() {
        let service = service();
        let claims = Claims {
            username: Some("carol".into()),
            role: None,
            nbf: None,
            iat: None,
            exp: Utc::now().timestamp() + 60,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &service.encoding_key).unwrap();

        let principal = service.validate(&token).unwrap();
        assert_eq!(principal.username(), "carol");
        assert_eq!(principal.role(), "");
        assert_eq!(principal.issued_at(), None);
    }

    #[test]
    fn test_expiry_overflow_is_error_not_panic() {
        let err = service().issue_at("alice", DateTime::<Utc>::MAX_UTC).unwrap_err();
        assert!(err.is_unexpected());
    }

    #[test]
    fn test_from_config_rejects_out_of_range_durations() {
        let huge_lifetime = TokenConfig {
            lifetime_minutes: 10_000_000_000_000,
            ..TokenConfig::default()
        };
        assert!(TokenService::from_config(&huge_lifetime).unwrap_err().is_unexpected());

        let overflowing_cast = TokenConfig {
            lifetime_minutes: u64::MAX,
            ..TokenConfig::default()
        };
        assert!(TokenService::from_config(&overflowing_cast).is_err());

        let huge_leeway = TokenConfig {
            leeway_secs: u64::MAX,
            ..TokenConfig::default()
        };
        assert!(TokenService::from_config(&huge_leeway).unwrap_err().is_unexpected());

        let max_leeway = TokenConfig {
            leeway_secs: MAX_LEEWAY_SECS,
            ..TokenConfig::default()
        };
        let service = TokenService::from_config(&max_leeway).unwrap();
        let token = service.issue("dave").unwrap();
        assert_eq!(service.validate(&token).unwrap().username(), "dave");
    }
}
