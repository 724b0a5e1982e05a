use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use common::UserRole;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::request::AppJson;
use crate::models::auth::{
    AuthResponse, LoginRequest, RegisterRequest, UserResponse, validate_login_request,
    validate_register_request,
};
use crate::state::AppState;
use crate::utils::{account, hash, jwt};

fn issue_token(state: &AppState, user: &user::Model) -> Result<String, AppError> {
    jwt::sign(
        user.id,
        user.role,
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))
}

fn auth_response(state: &AppState, user: user::Model) -> Result<AuthResponse, AppError> {
    let token = issue_token(state, &user)?;
    Ok(AuthResponse {
        user: UserResponse::from(user),
        token,
    })
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Register a new account",
    description = "Creates a regular `USER` account and returns it with a bearer token. The role cannot be chosen by the client.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation error or email taken (VALIDATION_ERROR, EMAIL_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    if account::find_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::EmailTaken);
    }

    let user = account::create_user(
        &state.db,
        &payload.email,
        &payload.password,
        &payload.name,
        UserRole::User,
    )
    .await?;
    tracing::info!(user_id = user.id, "Account registered");

    Ok((StatusCode::CREATED, Json(auth_response(&state, user)?)))
}

#[utoipa::path(
    post,
    path = "/create-admin",
    tag = "Auth",
    operation_id = "createAdmin",
    summary = "Bootstrap the admin account",
    description = "Creates the single `ADMIN` account. Only succeeds while no admin exists; every later call returns 400 regardless of payload.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Admin created", body = AuthResponse),
        (status = 400, description = "Admin already exists or validation error (ADMIN_EXISTS, EMAIL_TAKEN, VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn create_admin(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if account::admin_exists(&state.db).await? {
        return Err(AppError::AdminExists);
    }
    validate_register_request(&payload)?;

    if account::find_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::EmailTaken);
    }

    let user = account::create_user(
        &state.db,
        &payload.email,
        &payload.password,
        &payload.name,
        UserRole::Admin,
    )
    .await?;
    tracing::info!(user_id = user.id, "Admin account created");

    Ok((StatusCode::CREATED, Json(auth_response(&state, user)?)))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in",
    description = "Verifies email and password and returns the account with a fresh bearer token.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong email or password (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate_login_request(&payload)?;

    let user = account::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    Ok(Json(auth_response(&state, user)?))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getCurrentUser",
    summary = "Get the current account",
    description = "Returns the account behind the bearer token, as currently stored.",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = account::find_by_id(&state.db, auth_user.user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    Ok(Json(UserResponse::from(user)))
}
