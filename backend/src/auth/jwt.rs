//! JWT session tokens
//!
//! Keys are derived once from the configured secret and shared behind an
//! `Arc`, so cloning the service per request is free.

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Which kind of session token a JWT represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
    pub kind: TokenKind,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies session tokens
#[derive(Clone)]
pub struct JwtService {
    keys: Arc<Keys>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtService {
    /// Derive keys from the secret; call once at startup
    pub fn new(secret: &str, access_token_expiry_secs: i64, refresh_token_expiry_secs: i64) -> Self {
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            access_ttl: Duration::seconds(access_token_expiry_secs),
            refresh_ttl: Duration::seconds(refresh_token_expiry_secs),
        }
    }

    pub fn issue(&self, user_id: Uuid, kind: TokenKind) -> Result<String> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            kind,
        };

        encode(&Header::default(), &claims, &self.keys.encoding)
            .map_err(|e| anyhow!("Failed to sign {:?} token: {}", kind, e))
    }

    /// Verify signature and expiry, and that the token is of the expected kind
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.keys.decoding, &Validation::default())
            .map_err(|e| anyhow!("Invalid token: {}", e))?
            .claims;

        if claims.kind != expected {
            return Err(anyhow!("Expected a {:?} token", expected));
        }
        Ok(claims)
    }

    pub fn access_token_expiry_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }
}
