use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::{Caller, Role};
use crate::{CoreError, CoreResult};

/// Seven days, matching the lifetime of issued session tokens.
const DEFAULT_EXPIRATION_SECONDS: u64 = 7 * 24 * 60 * 60;

fn default_expiration() -> u64 {
    DEFAULT_EXPIRATION_SECONDS
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_expiration")]
    pub jwt_expiration_seconds: u64,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_expiration_seconds: DEFAULT_EXPIRATION_SECONDS,
        }
    }
}

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// Issues and verifies HS256 session tokens with a secret supplied at construction.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiration: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            expiration: Duration::seconds(config.jwt_expiration_seconds as i64),
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> CoreResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp() as usize,
            exp: (now + self.expiration).timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| CoreError::InternalError(format!("Token encoding failed: {}", e)))
    }

    /// Decode a bearer token into the caller it identifies.
    pub fn verify(&self, token: &str) -> CoreResult<Caller> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| CoreError::IdentityError(e.to_string()))?;

        Ok(Caller::new(data.claims.sub, data.claims.role))
    }
}
