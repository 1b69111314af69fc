use anyhow::{Result, bail};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// What a token is good for. Access tokens authenticate requests, refresh
/// tokens mint new pairs, email tokens confirm an address. Each verification
/// site names the kind it expects so tokens cannot cross scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    Email,
}

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Email
    pub uid: i32,    // User ID
    pub username: String,
    pub role: String,
    pub kind: TokenKind,
    pub exp: usize, // Expiration timestamp
}

const ACCESS_TTL_MINUTES: i64 = 60;
const REFRESH_TTL_DAYS: i64 = 7;
const EMAIL_TTL_DAYS: i64 = 3;

fn ttl(kind: TokenKind) -> Duration {
    match kind {
        TokenKind::Access => Duration::minutes(ACCESS_TTL_MINUTES),
        TokenKind::Refresh => Duration::days(REFRESH_TTL_DAYS),
        TokenKind::Email => Duration::days(EMAIL_TTL_DAYS),
    }
}

/// Sign a token of the given kind for a user.
pub fn sign(
    kind: TokenKind,
    user_id: i32,
    email: &str,
    username: &str,
    role: &str,
    secret: &str,
) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl(kind))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        sub: email.to_owned(),
        uid: user_id,
        username: username.to_owned(),
        role: role.to_owned(),
        kind,
        exp: expiration as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a token, rejecting tokens of the wrong kind.
pub fn verify(token: &str, kind: TokenKind, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    if token_data.claims.kind != kind {
        bail!("token kind mismatch");
    }

    Ok(token_data.claims)
}
