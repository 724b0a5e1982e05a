use axum::Json;
use axum::extract::State;
use common::RegistrationStatus;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{event, registration, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::request::AppPath;
use crate::handlers::event::event_responses;
use crate::models::auth::UserResponse;
use crate::models::event::{EventResponse, EventSummary};
use crate::models::registration::RegistrationResponse;
use crate::models::user::UserDetailResponse;
use crate::state::AppState;
use crate::utils::account;

#[utoipa::path(
    get,
    path = "/",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List accounts",
    description = "Returns all accounts ordered by id. Requires the `ADMIN` role.",
    responses(
        (status = 200, description = "Accounts", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
        (status = 403, description = "Admin rights required (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    auth_user.require_admin()?;

    let users = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get an account",
    description = "Returns an account with the events it created and all of its registrations. Requires the `ADMIN` role.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account details", body = UserDetailResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
        (status = 403, description = "Admin rights required (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(target_user_id = id))]
pub async fn get_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<UserDetailResponse>, AppError> {
    auth_user.require_admin()?;

    let target = account::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let events = event::Entity::find()
        .filter(event::Column::UserId.eq(id))
        .order_by_asc(event::Column::Date)
        .all(&state.db)
        .await?;

    let registrations = registration::Entity::find()
        .filter(registration::Column::UserId.eq(id))
        .find_also_related(event::Entity)
        .order_by_desc(registration::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let registrations = registrations
        .into_iter()
        .map(|(r, e)| RegistrationResponse::new(r, Some(&target)).with_event(e))
        .collect();

    Ok(Json(UserDetailResponse {
        user: UserResponse::from(target),
        events: events.into_iter().map(EventSummary::from).collect(),
        registrations,
    }))
}

#[utoipa::path(
    get,
    path = "/me/events",
    tag = "Users",
    operation_id = "listMyEvents",
    summary = "List events the caller attends",
    description = "Returns the events for which the caller holds an active registration, ordered by date.",
    responses(
        (status = 200, description = "Events", body = Vec<EventResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn my_events(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let event_ids: Vec<i32> = registration::Entity::find()
        .filter(registration::Column::UserId.eq(auth_user.user_id))
        .filter(registration::Column::Status.is_in(RegistrationStatus::ACTIVE.iter().copied()))
        .select_only()
        .column(registration::Column::EventId)
        .into_tuple()
        .all(&state.db)
        .await?;

    if event_ids.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let events = event::Entity::find()
        .filter(event::Column::Id.is_in(event_ids))
        .order_by_asc(event::Column::Date)
        .order_by_asc(event::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(event_responses(&state.db, events).await?))
}
