use common::UserRole;
use sea_orm::*;

use crate::entity::user;
use crate::error::AppError;
use crate::utils::hash;

/// Name of the partial unique index allowing a single `ADMIN` row.
pub const SINGLE_ADMIN_INDEX: &str = "uq_user_single_admin";

/// Normalize an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn admin_exists<C: ConnectionTrait>(db: &C) -> Result<bool, DbErr> {
    let count = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Admin))
        .count(db)
        .await?;
    Ok(count > 0)
}

pub async fn find_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
}

pub async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(user_id).one(db).await
}

/// Insert a new account with a freshly hashed password.
///
/// Unique violations are mapped to `EmailTaken`, or to `AdminExists` when the
/// single-admin index rejected the row.
pub async fn create_user<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
    name: &str,
    role: UserRole,
) -> Result<user::Model, AppError> {
    let hash = hash::hash_password(password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let now = chrono::Utc::now();
    let new_user = user::ActiveModel {
        email: Set(normalize_email(email)),
        password: Set(hash),
        name: Set(name.trim().to_string()),
        role: Set(role),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    new_user.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains(SINGLE_ADMIN_INDEX) => {
            tracing::debug!("Admin bootstrap race caught by unique index");
            AppError::AdminExists
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Registration race condition: unique constraint caught on insert");
            AppError::EmailTaken
        }
        _ => AppError::from(e),
    })
}
