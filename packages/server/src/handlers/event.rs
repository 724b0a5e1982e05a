use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, LockType};
use sea_orm::*;
use tracing::instrument;

use crate::admission::{AdmissionService, active_counts};
use crate::entity::{event, registration, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::request::{AppJson, AppPath, AppQuery};
use crate::models::event::*;
use crate::models::shared::escape_like;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Events",
    operation_id = "listEvents",
    summary = "List events",
    description = "Returns all events ordered by date, each with its creator, active registration count and available places. `search` filters titles case-insensitively; `upcoming=true` keeps only events dated now or later.",
    params(EventListQuery),
    responses(
        (status = 200, description = "Event list", body = Vec<EventResponse>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query), fields(search = ?query.search, upcoming = ?query.upcoming))]
pub async fn list_events(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<EventListQuery>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let mut select = event::Entity::find();

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(event::Column::Title)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    if query.upcoming.unwrap_or(false) {
        select = select.filter(event::Column::Date.gte(Utc::now()));
    }

    let events = select
        .order_by_asc(event::Column::Date)
        .order_by_asc(event::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(event_responses(&state.db, events).await?))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Events",
    operation_id = "getEvent",
    summary = "Get an event",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event details", body = EventResponse),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(event_id = id))]
pub async fn get_event(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<EventResponse>, AppError> {
    let model = find_event(&state.db, id).await?;
    let mut responses = event_responses(&state.db, vec![model]).await?;
    responses
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Event not found".into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Events",
    operation_id = "createEvent",
    summary = "Create an event",
    description = "Creates an event owned by the calling admin. Requires the `ADMIN` role.",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
        (status = 403, description = "Admin rights required (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Creating admin no longer exists (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, title = %payload.title))]
pub async fn create_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;
    validate_create_event(&payload)?;

    let txn = state.db.begin().await?;
    let creator = user::Entity::find_by_id(auth_user.user_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let now = Utc::now();
    let new_event = event::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        date: Set(payload.date),
        location: Set(payload.location.trim().to_string()),
        capacity: Set(payload.capacity),
        price: Set(payload.price.round_dp(2)),
        user_id: Set(creator.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = new_event.insert(&txn).await?;
    txn.commit().await?;

    tracing::info!(event_id = model.id, "Event created");
    Ok((
        StatusCode::CREATED,
        Json(EventResponse::new(model, Some(creator), 0)),
    ))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Events",
    operation_id = "updateEvent",
    summary = "Update an event",
    description = "Partially updates an event; absent fields keep their value. Requires the `ADMIN` role. Capacity may be lowered below the current registration count, in which case no further registrations are admitted.",
    params(("id" = i32, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = EventResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
        (status = 403, description = "Admin rights required (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(event_id = id))]
pub async fn update_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateEventRequest>,
) -> Result<Json<EventResponse>, AppError> {
    auth_user.require_admin()?;
    validate_update_event(&payload)?;

    let txn = state.db.begin().await?;
    let existing = AdmissionService::new(&txn).lock_event(id).await?;

    let mut active: event::ActiveModel = existing.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(date) = payload.date {
        active.date = Set(date);
    }
    if let Some(ref location) = payload.location {
        active.location = Set(location.trim().to_string());
    }
    if let Some(capacity) = payload.capacity {
        active.capacity = Set(capacity);
    }
    if let Some(price) = payload.price {
        active.price = Set(price.round_dp(2));
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&txn).await?;
    txn.commit().await?;

    let mut responses = event_responses(&state.db, vec![updated]).await?;
    responses
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Event not found".into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Events",
    operation_id = "deleteEvent",
    summary = "Delete an event",
    description = "Deletes the event together with all of its registrations. Requires the `ADMIN` role.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
        (status = 403, description = "Admin rights required (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(event_id = id))]
pub async fn delete_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;

    let txn = state.db.begin().await?;
    AdmissionService::new(&txn).lock_event(id).await?;

    let removed = registration::Entity::delete_many()
        .filter(registration::Column::EventId.eq(id))
        .exec(&txn)
        .await?;
    event::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!(
        registrations_removed = removed.rows_affected,
        "Event deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn find_event<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<event::Model, AppError> {
    event::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))
}

/// Attach creators and live occupancy to a batch of events, keeping order.
pub(crate) async fn event_responses<C: ConnectionTrait>(
    db: &C,
    events: Vec<event::Model>,
) -> Result<Vec<EventResponse>, DbErr> {
    let event_ids: Vec<i32> = events.iter().map(|e| e.id).collect();
    let mut creator_ids: Vec<i32> = events.iter().map(|e| e.user_id).collect();
    creator_ids.sort_unstable();
    creator_ids.dedup();

    let counts = active_counts(db, &event_ids).await?;
    let creators: HashMap<i32, user::Model> = if creator_ids.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(creator_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };

    Ok(events
        .into_iter()
        .map(|e| {
            let occupied = counts.get(&e.id).copied().unwrap_or(0);
            let creator = creators.get(&e.user_id).cloned();
            EventResponse::new(e, creator, occupied)
        })
        .collect())
}
