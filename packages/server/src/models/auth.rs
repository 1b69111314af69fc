use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::{validate_email, validate_password, validate_username};

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    /// Display name (3-50 characters).
    #[schema(example = "alice")]
    pub username: String,
    /// Unique email address; a confirmation link is sent here.
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Password (6-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_signup_request(payload: &SignupRequest) -> Result<(), AppError> {
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;
    Ok(())
}

/// Request body for login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Account password.
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::Validation("Email must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Successful registration response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SignupResponse {
    /// ID of the newly created user.
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Assigned role; the very first account becomes `admin`.
    #[schema(example = "user")]
    pub role: String,
}

impl From<crate::entity::user::Model> for SignupResponse {
    fn from(user: crate::entity::user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// Access/refresh token pair returned by login and refresh.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TokenResponse {
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub refresh_token: String,
    #[schema(example = "bearer")]
    pub token_type: &'static str,
}

/// Current authenticated user's profile.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Avatar image URL, if one has been uploaded.
    pub avatar: Option<String>,
    #[schema(example = "user")]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::user::Model> for UserResponse {
    fn from(user: crate::entity::user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            avatar: user.avatar,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Plain acknowledgement body for logout and email confirmation.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Logged out")]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(username: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn well_formed_signup_passes() {
        assert!(validate_signup_request(&signup("alice", "alice@example.com", "hunter22")).is_ok());
    }

    #[test]
    fn short_username_or_password_is_rejected() {
        assert!(validate_signup_request(&signup("al", "alice@example.com", "hunter22")).is_err());
        assert!(validate_signup_request(&signup("alice", "alice@example.com", "pw")).is_err());
    }

    #[test]
    fn malformed_email_is_rejected() {
        assert!(validate_signup_request(&signup("alice", "alice.example.com", "hunter22")).is_err());
    }
}
