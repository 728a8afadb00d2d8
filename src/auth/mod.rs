use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(issuer: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            iss: issuer.into(),
            iat: now.timestamp(),
            exp,
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),

    #[error("invalid JWT token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

fn secret(security: &SecurityConfig) -> Result<&[u8], JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }
    Ok(security.jwt_secret.as_bytes())
}

/// Sign an HS256 token for `issuer`, valid for `jwt_expiry_hours`.
pub fn generate_jwt(issuer: &str, security: &SecurityConfig) -> Result<String, JwtError> {
    let claims = Claims::new(issuer, security.jwt_expiry_hours);
    encode_claims(&claims, security)
}

pub fn encode_claims(claims: &Claims, security: &SecurityConfig) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret(security)?);
    encode(&Header::new(Algorithm::HS256), claims, &key).map_err(JwtError::Encode)
}

/// Verify `token` and return its issuer.
pub fn parse_jwt(token: &str, security: &SecurityConfig) -> Result<String, JwtError> {
    let key = DecodingKey::from_secret(secret(security)?);
    let validation = Validation::new(Algorithm::HS256);

    let data = decode::<Claims>(token, &key, &validation).map_err(JwtError::Invalid)?;
    Ok(data.claims.iss)
}
