use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::instrument;

use common::mail::Mailer;

use crate::entity::{blacklist, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::{
    LoginRequest, MessageResponse, SignupRequest, SignupResponse, TokenResponse, UserResponse,
    validate_login_request, validate_signup_request,
};
use crate::state::AppState;
use crate::utils::{hash, jwt};

async fn find_user_by_email<C: ConnectionTrait>(
    conn: &C,
    email: &str,
) -> Result<Option<user::Model>, AppError> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(conn)
        .await?)
}

fn token_pair(user: &user::Model, secret: &str) -> Result<TokenResponse, AppError> {
    let access = jwt::sign(
        jwt::TokenKind::Access,
        user.id,
        &user.email,
        &user.username,
        &user.role,
        secret,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;
    let refresh = jwt::sign(
        jwt::TokenKind::Refresh,
        user.id,
        &user.email,
        &user.username,
        &user.role,
        secret,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(TokenResponse {
        access_token: access,
        refresh_token: refresh,
        token_type: "bearer",
    })
}

/// Store a freshly issued refresh token on the user row; login and refresh
/// both rotate it, and only the stored one is accepted.
async fn store_refresh_token<C: ConnectionTrait>(
    conn: &C,
    user: user::Model,
    token: Option<String>,
) -> Result<(), AppError> {
    let mut active: user::ActiveModel = user.into();
    active.refresh_token = Set(token);
    active.updated_at = Set(chrono::Utc::now());
    active.update(conn).await?;
    Ok(())
}

fn send_confirmation_email(state: &AppState, user: &user::Model) {
    let Ok(token) = jwt::sign(
        jwt::TokenKind::Email,
        user.id,
        &user.email,
        &user.username,
        &user.role,
        &state.config.auth.jwt_secret,
    ) else {
        tracing::error!("Failed to sign confirmation token for {}", user.email);
        return;
    };

    let confirm_url = format!(
        "{}/api/v1/auth/confirmed_email/{token}",
        state.config.server.base_url.trim_end_matches('/')
    );
    let mailer: Arc<dyn Mailer> = state.mailer.clone();
    let email = user.email.clone();
    let username = user.username.clone();

    // Fire-and-forget: delivery failures are logged, never surfaced.
    tokio::spawn(async move {
        if let Err(e) = mailer.send_confirmation(&email, &username, &confirm_url).await {
            tracing::warn!("Confirmation email to {email} failed: {e}");
        }
    });
}

#[utoipa::path(
    post,
    path = "/signup",
    tag = "Auth",
    operation_id = "signup",
    summary = "Register a new account",
    description = "Creates an account and sends a confirmation email. The very first account \
        registered becomes admin; all later ones get the `user` role.",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = SignupResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_signup_request(&payload)?;

    let email = payload.email.trim().to_lowercase();
    if find_user_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::EmailTaken);
    }

    let password_hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let existing_accounts = user::Entity::find().count(&state.db).await?;
    let role = if existing_accounts == 0 {
        user::ROLE_ADMIN
    } else {
        user::DEFAULT_ROLE
    };

    let now = chrono::Utc::now();
    let new_user = user::ActiveModel {
        username: Set(payload.username.trim().to_string()),
        email: Set(email),
        password: Set(password_hash),
        confirmed: Set(false),
        role: Set(role.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Signup race: unique constraint caught on insert");
            AppError::EmailTaken
        }
        _ => AppError::from(e),
    })?;

    send_confirmation_email(&state, &created);

    Ok((StatusCode::CREATED, Json(SignupResponse::from(created))))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in with email and password",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Bad credentials or unconfirmed email \
            (INVALID_CREDENTIALS, EMAIL_NOT_CONFIRMED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_login_request(&payload)?;

    let email = payload.email.trim().to_lowercase();
    let account = find_user_by_email(&state.db, &email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !account.confirmed {
        return Err(AppError::EmailNotConfirmed);
    }

    let is_valid = hash::verify_password(&payload.password, &account.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    let tokens = token_pair(&account, &state.config.auth.jwt_secret)?;
    store_refresh_token(&state.db, account, Some(tokens.refresh_token.clone())).await?;

    Ok(Json(tokens))
}

#[utoipa::path(
    get,
    path = "/refresh",
    tag = "Auth",
    operation_id = "refreshToken",
    summary = "Exchange a refresh token for a new token pair",
    description = "Send the refresh token as the bearer token. A token that does not match \
        the one stored for the user is rejected and the stored one is revoked.",
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, headers))]
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    let presented = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::TokenMissing)?
        .strip_prefix("Bearer ")
        .ok_or(AppError::TokenInvalid)?;

    let claims = jwt::verify(presented, jwt::TokenKind::Refresh, &state.config.auth.jwt_secret)
        .map_err(|_| AppError::TokenInvalid)?;

    let account = user::Entity::find_by_id(claims.uid)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    if account.refresh_token.as_deref() != Some(presented) {
        tracing::warn!("Refresh token mismatch for user {}; revoking", claims.uid);
        store_refresh_token(&state.db, account, None).await?;
        return Err(AppError::TokenInvalid);
    }

    let tokens = token_pair(&account, &state.config.auth.jwt_secret)?;
    store_refresh_token(&state.db, account, Some(tokens.refresh_token.clone())).await?;

    Ok(Json(tokens))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    operation_id = "logout",
    summary = "Log out",
    description = "Blacklists the presented access token until its natural expiry and revokes \
        the stored refresh token.",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn logout(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let entry = blacklist::ActiveModel {
        token: Set(auth_user.token.clone()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    blacklist::Entity::insert(entry)
        .on_conflict(
            OnConflict::column(blacklist::Column::Token)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&state.db)
        .await?;

    if let Some(account) = user::Entity::find_by_id(auth_user.user_id).one(&state.db).await? {
        store_refresh_token(&state.db, account, None).await?;
    }

    Ok(Json(MessageResponse {
        message: "Logged out".into(),
    }))
}

#[utoipa::path(
    get,
    path = "/confirmed_email/{token}",
    tag = "Auth",
    operation_id = "confirmEmail",
    summary = "Confirm an email address",
    description = "Follows the link from the confirmation email. Repeating the request after \
        confirmation is a no-op.",
    params(("token" = String, Path, description = "Email confirmation token")),
    responses(
        (status = 200, description = "Email confirmed", body = MessageResponse),
        (status = 401, description = "Invalid confirmation token (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, token))]
pub async fn confirmed_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let claims = jwt::verify(&token, jwt::TokenKind::Email, &state.config.auth.jwt_secret)
        .map_err(|_| AppError::TokenInvalid)?;

    let account = find_user_by_email(&state.db, &claims.sub)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    if account.confirmed {
        return Ok(Json(MessageResponse {
            message: "Your email is already confirmed".into(),
        }));
    }

    let mut active: user::ActiveModel = account.into();
    active.confirmed = Set(true);
    active.updated_at = Set(chrono::Utc::now());
    active.update(&state.db).await?;

    Ok(Json(MessageResponse {
        message: "Email confirmed".into(),
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "authMe",
    summary = "Current account profile",
    responses(
        (status = 200, description = "Profile", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let account = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(UserResponse::from(account)))
}
