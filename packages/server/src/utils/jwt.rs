use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use common::UserRole;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT Claims structure.
///
/// Only `uid` is trusted by the server; `role` is carried for clients and is
/// re-checked against the store on every request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID as string
    pub uid: i32,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
}

/// Sign a new JWT token for a user.
pub fn sign(user_id: i32, role: UserRole, secret: &str, ttl_hours: i64) -> Result<String> {
    let now = Utc::now();
    let ttl = Duration::try_hours(ttl_hours)
        .ok_or_else(|| anyhow!("token TTL of {ttl_hours} hours is out of range"))?;
    let expiration = now
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow!("token expiry overflows"))?;

    let claims = Claims {
        sub: user_id.to_string(),
        uid: user_id,
        role,
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a JWT token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
