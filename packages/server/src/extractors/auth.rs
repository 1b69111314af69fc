use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entity::blacklist;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt::{self, TokenKind};

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication. Tokens
/// blacklisted at logout are rejected even before their natural expiry.
/// Role checks happen via `require_role()` in the handler body; ownership
/// checks stay with the handlers themselves.
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
    /// The raw bearer token, kept so logout can blacklist it.
    pub token: String,
}

impl AuthUser {
    /// Returns `Ok(())` if the user's role is in the allowed set,
    /// `Err(PermissionDenied)` otherwise.
    pub fn require_role(&self, allowed: &[&str]) -> Result<(), AppError> {
        if allowed.iter().any(|r| *r == self.role) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let claims = jwt::verify(token, TokenKind::Access, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        let blacklisted = blacklist::Entity::find()
            .filter(blacklist::Column::Token.eq(token))
            .count(&state.db)
            .await?;
        if blacklisted > 0 {
            return Err(AppError::TokenInvalid);
        }

        Ok(AuthUser {
            user_id: claims.uid,
            username: claims.username,
            email: claims.sub,
            role: claims.role,
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::user::{ROLE_ADMIN, ROLE_MODERATOR, ROLE_USER};

    fn auth_user(role: &str) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            role: role.into(),
            token: "tok".into(),
        }
    }

    #[test]
    fn admin_and_moderator_pass_the_moderation_gate() {
        let gate = [ROLE_ADMIN, ROLE_MODERATOR];
        assert!(auth_user(ROLE_ADMIN).require_role(&gate).is_ok());
        assert!(auth_user(ROLE_MODERATOR).require_role(&gate).is_ok());
    }

    #[test]
    fn plain_user_is_denied_by_the_moderation_gate() {
        let err = auth_user(ROLE_USER)
            .require_role(&[ROLE_ADMIN, ROLE_MODERATOR])
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied));
    }
}
