use common::UserRole;
use sea_orm::sea_query::{Index, LockType, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::config::AdminBootstrapConfig;
use crate::entity::{registration, user};
use crate::error::AppError;
use crate::models::auth::{RegisterRequest, validate_register_request};
use crate::utils::account::{self, SINGLE_ADMIN_INDEX};
use crate::utils::hash;

/// Ensure the uniqueness indexes the booking rules rely on exist.
///
/// Schema sync creates tables and single-column constraints only, so the
/// composite and partial indexes are created here on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // One row per (event, account). NULL user ids (guests) never collide.
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("uq_registration_event_user")
        .table(registration::Entity)
        .col(registration::Column::EventId)
        .col(registration::Column::UserId)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&stmt).await?;
    info!("Ensured index uq_registration_event_user exists");

    // One row per (event, guest email).
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("uq_registration_event_guest_email")
        .table(registration::Entity)
        .col(registration::Column::EventId)
        .col(registration::Column::GuestEmail)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&stmt).await?;
    info!("Ensured index uq_registration_event_guest_email exists");

    // sea-query has no partial index builder for Postgres.
    let stmt = format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {SINGLE_ADMIN_INDEX} ON \"user\" (role) WHERE role = '{}'",
        UserRole::Admin.as_str()
    );
    db.execute_unprepared(&stmt).await?;
    info!("Ensured index {} exists", SINGLE_ADMIN_INDEX);

    Ok(())
}

/// Create the admin account from configuration if none exists yet.
pub async fn bootstrap_admin(
    db: &DatabaseConnection,
    admin: &AdminBootstrapConfig,
) -> Result<(), AppError> {
    if account::admin_exists(db).await? {
        info!("Admin account already present, skipping bootstrap");
        return Ok(());
    }

    let request = RegisterRequest {
        email: admin.email.clone(),
        password: admin.password.clone(),
        name: admin.name.clone(),
    };
    validate_register_request(&request)?;

    match account::create_user(
        db,
        &request.email,
        &request.password,
        &request.name,
        UserRole::Admin,
    )
    .await
    {
        Ok(user) => {
            info!(user_id = user.id, "Bootstrapped admin account");
            Ok(())
        }
        // Another instance won the race.
        Err(AppError::AdminExists) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Replace the existing admin's email and password with the configured ones.
///
/// Falls back to [`bootstrap_admin`] when no admin exists yet. The name is
/// left unchanged.
pub async fn update_admin(
    db: &DatabaseConnection,
    admin: &AdminBootstrapConfig,
) -> Result<(), AppError> {
    let request = RegisterRequest {
        email: admin.email.clone(),
        password: admin.password.clone(),
        name: admin.name.clone(),
    };
    validate_register_request(&request)?;

    let txn = db.begin().await?;

    let Some(current) = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Admin))
        .lock(LockType::Update)
        .one(&txn)
        .await?
    else {
        txn.rollback().await?;
        info!("No admin account to update, bootstrapping instead");
        return bootstrap_admin(db, admin).await;
    };

    let email = account::normalize_email(&request.email);
    if account::find_by_email(&txn, &email)
        .await?
        .is_some_and(|other| other.id != current.id)
    {
        return Err(AppError::EmailTaken);
    }

    let password = hash::hash_password(&request.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let admin_id = current.id;
    let mut active: user::ActiveModel = current.into();
    active.email = Set(email);
    active.password = Set(password);
    active.updated_at = Set(chrono::Utc::now());
    active.update(&txn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::EmailTaken,
        _ => AppError::from(e),
    })?;

    txn.commit().await?;
    info!(user_id = admin_id, "Updated admin credentials");
    Ok(())
}
