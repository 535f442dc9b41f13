use chrono::{Duration, Utc};
use folio_core::prelude::{AuthError, User};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Lifetime of a token issued by `/auth/login`, in days.
pub const SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub scopes: Vec<String>,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn mint(&self, user: &User, ttl: Duration) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user.id.clone(),
            exp: (Utc::now() + ttl).timestamp(),
            scopes: user.scopes.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Generic(format!("Failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<User, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(User {
            id: token_data.claims.sub,
            scopes: token_data.claims.scopes,
        })
    }
}
