use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::admission::{AdmissionService, Registrant};
use crate::entity::{event, registration};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::request::{AppJson, AppPath};
use crate::handlers::registration::{admit, registrations_of_event};
use crate::models::registration::*;
use crate::state::AppState;
use crate::utils::account;

#[utoipa::path(
    post,
    path = "/",
    tag = "Bookings",
    operation_id = "createBooking",
    summary = "Book a place",
    description = "Books a place at the given event for the caller. Same rules as `POST /api/events/{id}/register`.",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = RegistrationResponse),
        (status = 400, description = "Already registered or event full (ALREADY_REGISTERED, EVENT_FULL, VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, event_id = payload.event_id))]
pub async fn create_booking(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = admit(
        &state,
        payload.event_id,
        Registrant::User(auth_user.user_id),
        Some(&auth_user),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/user",
    tag = "Bookings",
    operation_id = "listUserBookings",
    summary = "List own bookings",
    description = "Returns all of the caller's bookings, cancelled ones included, newest first, each with a summary of its event.",
    responses(
        (status = 200, description = "Bookings", body = Vec<RegistrationResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn user_bookings(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<RegistrationResponse>>, AppError> {
    let rows = registration::Entity::find()
        .filter(registration::Column::UserId.eq(auth_user.user_id))
        .find_also_related(event::Entity)
        .order_by_desc(registration::Column::CreatedAt)
        .order_by_desc(registration::Column::Id)
        .all(&state.db)
        .await?;

    let items = rows
        .into_iter()
        .map(|(r, e)| RegistrationResponse::for_caller(r, &auth_user).with_event(e))
        .collect();

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/event/{id}",
    tag = "Bookings",
    operation_id = "listEventBookings",
    summary = "List an event's bookings",
    description = "Returns every booking of the event, oldest first. An unknown event yields an empty list. Requires the `ADMIN` role.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Bookings", body = Vec<RegistrationResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
        (status = 403, description = "Admin rights required (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(event_id))]
pub async fn event_bookings(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(event_id): AppPath<i32>,
) -> Result<Json<Vec<RegistrationResponse>>, AppError> {
    auth_user.require_admin()?;
    Ok(Json(registrations_of_event(&state.db, event_id).await?))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Bookings",
    operation_id = "updateBooking",
    summary = "Change a booking's status",
    description = "Sets the status of a booking to `CONFIRMED`, `CANCELLED` or `PENDING`. Allowed for the booking's owner and for the admin. Reactivating a cancelled booking needs a free place.",
    params(("id" = i32, Path, description = "Booking ID")),
    request_body = UpdateBookingRequest,
    responses(
        (status = 200, description = "Booking updated", body = RegistrationResponse),
        (status = 400, description = "Invalid status or event full (VALIDATION_ERROR, EVENT_FULL)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Booking not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, booking_id = id, status = %payload.status))]
pub async fn update_booking(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateBookingRequest>,
) -> Result<Json<RegistrationResponse>, AppError> {
    let status = parse_status(&payload.status)?;

    let txn = state.db.begin().await?;
    let updated = AdmissionService::new(&txn)
        .set_status(id, status, &auth_user)
        .await?;
    let event_model = event::Entity::find_by_id(updated.event_id).one(&txn).await?;
    let owner = match updated.user_id {
        Some(owner_id) => account::find_by_id(&txn, owner_id).await?,
        None => None,
    };
    txn.commit().await?;

    tracing::info!(status = %updated.status, "Booking status changed");
    Ok(Json(
        RegistrationResponse::new(updated, owner.as_ref()).with_event(event_model),
    ))
}
