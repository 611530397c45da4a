//! Submitter Authentication
//!
//! Validates JWTs issued by an external auth provider and maps them to
//! ledger player ids. The service never issues tokens.
//!
//! Without any key material configured the service runs in development mode
//! and trusts the player id the client sends.

use std::collections::HashSet;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::game::player::PlayerId;
use crate::network::protocol::AuthRequest;

/// Prefix hashed with the `sub` claim to derive a player id.
const PLAYER_ID_DOMAIN: &[u8] = b"battleship-player:";

/// Authentication configuration.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    /// Expected issuer claim ("iss"). If None, any issuer accepted.
    pub issuer: Option<String>,
    /// Expected audience claim ("aud"). If None, any audience accepted.
    pub audience: Option<String>,
    /// RS256 public key in PEM format (preferred for external providers).
    pub public_key_pem: Option<String>,
    /// HS256 secret (fallback for simple setups).
    pub secret: Option<String>,
    /// Whether to skip expiry validation (for testing only).
    pub skip_expiry: bool,
}

impl AuthConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            issuer: std::env::var("SETTLE_AUTH_ISSUER").ok(),
            audience: std::env::var("SETTLE_AUTH_AUDIENCE").ok(),
            public_key_pem: std::env::var("SETTLE_AUTH_PUBLIC_KEY_PEM").ok(),
            secret: std::env::var("SETTLE_AUTH_SECRET").ok(),
            skip_expiry: std::env::var("SETTLE_AUTH_SKIP_EXPIRY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Check if token authentication is configured.
    pub fn is_configured(&self) -> bool {
        self.public_key_pem.is_some() || self.secret.is_some()
    }

    /// Decoding key and algorithm for the configured key material.
    fn decoding_key(&self) -> Result<(DecodingKey, Algorithm), AuthError> {
        if let Some(pem) = &self.public_key_pem {
            let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| AuthError::DecodeError(format!("invalid public key: {}", e)))?;
            return Ok((key, Algorithm::RS256));
        }
        if let Some(secret) = &self.secret {
            return Ok((DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256));
        }
        Err(AuthError::NotConfigured)
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims = HashSet::new();

        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if self.skip_expiry {
            validation.validate_exp = false;
        }
        validation
    }
}

/// Claims read from provider tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the provider's user id.
    pub sub: String,
    /// Expiry timestamp (Unix seconds).
    #[serde(default)]
    pub exp: u64,
    /// Issued at timestamp.
    #[serde(default)]
    pub iat: u64,
    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
}

impl TokenClaims {
    /// Ledger player id for this subject: first 16 bytes of
    /// `SHA-256("battleship-player:" || sub)`.
    pub fn player_id(&self) -> PlayerId {
        let mut hasher = Sha256::new();
        hasher.update(PLAYER_ID_DOMAIN);
        hasher.update(self.sub.as_bytes());
        let hash = hasher.finalize();

        let mut id = [0u8; 16];
        id.copy_from_slice(&hash[..16]);
        PlayerId::new(id)
    }
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token authentication configured.
    #[error("authentication not configured")]
    NotConfigured,
    /// Token format is invalid.
    #[error("invalid token format")]
    InvalidFormat,
    /// Token signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,
    /// Token has expired.
    #[error("token expired")]
    Expired,
    /// Issuer claim doesn't match.
    #[error("invalid issuer")]
    InvalidIssuer,
    /// Audience claim doesn't match.
    #[error("invalid audience")]
    InvalidAudience,
    /// Required claim (or the token itself) is missing.
    #[error("missing required claim: {0}")]
    MissingClaim(String),
    /// JWT decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),
    /// Development mode: supplied player id is not a UUID.
    #[error("invalid player id: {0}")]
    InvalidPlayerId(String),
}

/// Resolve the player id for an auth request.
///
/// With key material configured a token is mandatory and the id comes from
/// its `sub` claim. Otherwise the supplied UUID is taken as-is.
pub fn authenticate(request: &AuthRequest, config: &AuthConfig) -> Result<PlayerId, AuthError> {
    if config.is_configured() {
        let token = request
            .token
            .as_deref()
            .ok_or_else(|| AuthError::MissingClaim("token".into()))?;
        let claims = validate_token(token, config)?;
        return Ok(claims.player_id());
    }

    PlayerId::from_uuid_str(&request.player_id).ok_or_else(|| AuthError::InvalidPlayerId(request.player_id.clone()))
}

/// Validate a JWT and extract its claims.
pub fn validate_token(token: &str, config: &AuthConfig) -> Result<TokenClaims, AuthError> {
    let (key, algorithm) = config.decoding_key()?;
    let claims = decode::<TokenClaims>(token, &key, &config.validation(algorithm))
        .map_err(map_jwt_error)?
        .claims;

    if claims.sub.is_empty() {
        return Err(AuthError::MissingClaim("sub".into()));
    }

    // Library check is skipped when exp is absent from required claims
    if !config.skip_expiry && claims.exp > 0 {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        if now > claims.exp {
            return Err(AuthError::Expired);
        }
    }

    Ok(claims)
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) => AuthError::InvalidFormat,
        _ => AuthError::DecodeError(err.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "settlement-test-secret-32-bytes!";

    fn token_for(claims: &TokenClaims, secret: &str) -> String {
        let key = EncodingKey::from_secret(secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &key).unwrap()
    }

    fn claims(sub: &str) -> TokenClaims {
        let now = chrono::Utc::now().timestamp() as u64;
        TokenClaims {
            sub: sub.into(),
            exp: now + 3600,
            iat: now,
            iss: Some("settle-issuer".into()),
            aud: Some(serde_json::json!("settle-audience")),
        }
    }

    fn secret_config() -> AuthConfig {
        AuthConfig {
            secret: Some(SECRET.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_token() {
        let token = token_for(&claims("captain"), SECRET);
        let validated = validate_token(&token, &secret_config()).unwrap();
        assert_eq!(validated.sub, "captain");
    }

    #[test]
    fn test_rejections() {
        let mut expired = claims("captain");
        expired.exp = 1;
        let token = token_for(&expired, SECRET);
        assert!(matches!(validate_token(&token, &secret_config()), Err(AuthError::Expired)));

        let token = token_for(&claims("captain"), "some-other-secret-entirely!!!!!!");
        assert!(matches!(validate_token(&token, &secret_config()), Err(AuthError::InvalidSignature)));

        let token = token_for(&claims(""), SECRET);
        assert!(matches!(validate_token(&token, &secret_config()), Err(AuthError::MissingClaim(_))));

        let token = token_for(&claims("captain"), SECRET);
        let config = AuthConfig {
            issuer: Some("someone-else".into()),
            ..secret_config()
        };
        assert!(matches!(validate_token(&token, &config), Err(AuthError::InvalidIssuer)));

        assert!(matches!(validate_token(&token, &AuthConfig::default()), Err(AuthError::NotConfigured)));
    }

    #[test]
    fn test_skip_expiry() {
        let mut expired = claims("captain");
        expired.exp = 1;
        let token = token_for(&expired, SECRET);
        let config = AuthConfig {
            skip_expiry: true,
            ..secret_config()
        };
        assert!(validate_token(&token, &config).is_ok());
    }

    #[test]
    fn test_player_id_derivation() {
        let id = claims("captain").player_id();
        assert_eq!(id, claims("captain").player_id());
        assert_ne!(id, claims("mate").player_id());

        let mut hasher = Sha256::new();
        hasher.update(b"battleship-player:captain");
        let hash = hasher.finalize();
        assert_eq!(id.as_bytes()[..], hash[..16]);
    }

    #[test]
    fn test_authenticate_dev_mode_uses_supplied_id() {
        let request = AuthRequest {
            player_id: "11111111-1111-1111-1111-111111111111".into(),
            token: None,
        };
        let id = authenticate(&request, &AuthConfig::default()).unwrap();
        assert_eq!(id, PlayerId::new([0x11; 16]));

        let bad = AuthRequest {
            player_id: "nope".into(),
            token: None,
        };
        assert!(matches!(
            authenticate(&bad, &AuthConfig::default()),
            Err(AuthError::InvalidPlayerId(_))
        ));
    }

    #[test]
    fn test_authenticate_with_token_ignores_supplied_id() {
        let request = AuthRequest {
            player_id: "11111111-1111-1111-1111-111111111111".into(),
            token: Some(token_for(&claims("captain"), SECRET)),
        };
        let id = authenticate(&request, &secret_config()).unwrap();
        assert_eq!(id, claims("captain").player_id());

        let no_token = AuthRequest {
            player_id: request.player_id.clone(),
            token: None,
        };
        assert!(matches!(
            authenticate(&no_token, &secret_config()),
            Err(AuthError::MissingClaim(_))
        ));
    }
}
