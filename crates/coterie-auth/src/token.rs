use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Present on access tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Unique per token, so a refreshed pair never equals its predecessor.
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies the access/refresh token pair. Verification always
/// checks signature, expiry, and the declared token type: a refresh token
/// presented where an access token is expected is rejected, and vice versa.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access(&self, user_id: Uuid, email: &str) -> Result<String, AuthError> {
        self.issue(user_id, TokenKind::Access, Some(email.to_string()), self.access_ttl)
    }

    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.issue(user_id, TokenKind::Refresh, None, self.refresh_ttl)
    }

    fn issue(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        email: Option<String>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            kind,
            email,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Encode(e.to_string()))
    }

    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            }
        })?;

        if data.claims.kind != expected {
            return Err(AuthError::WrongKind);
        }

        Ok(data.claims)
    }
}
