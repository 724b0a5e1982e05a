use chrono::{DateTime, Utc};
use common::UserRole;
use serde::{Deserialize, Serialize};

use super::shared::{validate_email, validate_name};
use crate::error::AppError;

/// Request body for account registration and admin bootstrap.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique email address, used as the login name.
    #[schema(example = "user@test.com")]
    pub email: String,
    /// Password (8-128 characters).
    #[schema(example = "userpass123")]
    pub password: String,
    /// Display name (1-100 characters).
    #[schema(example = "Test User")]
    pub name: String,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    validate_email(&payload.email)?;
    validate_name(&payload.name)?;
    if payload.password.len() < 8 || payload.password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

/// Request body for login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "user@test.com")]
    pub email: String,
    #[schema(example = "userpass123")]
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

/// Public view of an account. Never includes the password hash.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "user@test.com")]
    pub email: String,
    #[schema(example = "Test User")]
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::user::Model> for UserResponse {
    fn from(user: crate::entity::user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Returned by register, create-admin and login.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
}
