use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::admission::{AdmissionService, GuestContact, Registrant};
use crate::entity::{event, registration, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::request::{AppJson, AppPath};
use crate::handlers::event::find_event;
use crate::models::registration::*;
use crate::state::AppState;

/// Admit a registrant in its own transaction and describe the result.
pub(crate) async fn admit(
    state: &AppState,
    event_id: i32,
    registrant: Registrant,
    caller: Option<&AuthUser>,
) -> Result<RegistrationResponse, AppError> {
    let txn = state.db.begin().await?;
    let service = AdmissionService::new(&txn);
    let model = service.admit(event_id, registrant).await?;
    let event_model = event::Entity::find_by_id(event_id).one(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        registration_id = model.id,
        event_id,
        "Registration admitted"
    );
    let response = match caller {
        Some(caller) => RegistrationResponse::for_caller(model, caller),
        None => RegistrationResponse::new(model, None),
    };
    Ok(response.with_event(event_model))
}

#[utoipa::path(
    post,
    path = "/{id}/register",
    tag = "Registrations",
    operation_id = "registerForEvent",
    summary = "Register for an event",
    description = "Takes a place at the event for the caller. A previously cancelled registration is reactivated. Returns 400 when the caller is already registered or no place is left.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 201, description = "Registered", body = RegistrationResponse),
        (status = 400, description = "Already registered or event full (ALREADY_REGISTERED, EVENT_FULL)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, event_id))]
pub async fn register_for_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(event_id): AppPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let response = admit(
        &state,
        event_id,
        Registrant::User(auth_user.user_id),
        Some(&auth_user),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    delete,
    path = "/{id}/register",
    tag = "Registrations",
    operation_id = "cancelEventRegistration",
    summary = "Cancel own registration",
    description = "Marks the caller's active registration for the event as `CANCELLED`, releasing its place.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Registration cancelled", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
        (status = 404, description = "Event not found or no active registration (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, event_id))]
pub async fn cancel_event_registration(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(event_id): AppPath<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    let txn = state.db.begin().await?;
    let cancelled = AdmissionService::new(&txn)
        .cancel_for_user(event_id, auth_user.user_id)
        .await?;
    txn.commit().await?;

    tracing::info!(registration_id = cancelled.id, "Registration cancelled");
    Ok(Json(MessageResponse {
        message: "Registration cancelled".into(),
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/guest-register",
    tag = "Registrations",
    operation_id = "guestRegisterForEvent",
    summary = "Register as a guest",
    description = "Takes a place at the event for a visitor without an account, identified by email. Subject to the same capacity and duplicate rules as account registrations.",
    params(("id" = i32, Path, description = "Event ID")),
    request_body = GuestRegistrationRequest,
    responses(
        (status = 201, description = "Registered", body = RegistrationResponse),
        (status = 400, description = "Validation error, already registered or event full (VALIDATION_ERROR, ALREADY_REGISTERED, EVENT_FULL)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(event_id))]
pub async fn guest_register(
    State(state): State<AppState>,
    AppPath(event_id): AppPath<i32>,
    AppJson(payload): AppJson<GuestRegistrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_guest_registration(&payload)?;

    let contact = GuestContact {
        name: payload.name,
        email: payload.email,
        phone: payload.phone.filter(|p| !p.trim().is_empty()),
    };
    let response = admit(&state, event_id, Registrant::Guest(contact), None).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/{id}/registration-status",
    tag = "Registrations",
    operation_id = "getRegistrationStatus",
    summary = "Check own registration",
    description = "Reports whether the caller holds an active registration for the event. `registration` carries the caller's row when one exists, including a cancelled one.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Registration status", body = RegistrationStatusResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, event_id))]
pub async fn registration_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(event_id): AppPath<i32>,
) -> Result<Json<RegistrationStatusResponse>, AppError> {
    find_event(&state.db, event_id).await?;

    let current = AdmissionService::new(&state.db)
        .find_for(event_id, &Registrant::User(auth_user.user_id))
        .await?;

    Ok(Json(RegistrationStatusResponse {
        is_registered: current.as_ref().is_some_and(|r| r.status.is_active()),
        registration: current.map(|r| RegistrationResponse::for_caller(r, &auth_user)),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}/registrations",
    tag = "Registrations",
    operation_id = "listEventRegistrations",
    summary = "List an event's registrations",
    description = "Returns every registration of the event, account and guest alike, oldest first. Requires the `ADMIN` role.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Registrations", body = Vec<RegistrationResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID, USER_NOT_FOUND)", body = ErrorBody),
        (status = 403, description = "Admin rights required (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(event_id))]
pub async fn list_event_registrations(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppPath(event_id): AppPath<i32>,
) -> Result<Json<Vec<RegistrationResponse>>, AppError> {
    auth_user.require_admin()?;
    find_event(&state.db, event_id).await?;

    Ok(Json(registrations_of_event(&state.db, event_id).await?))
}

/// All registrations of an event with their account holders, oldest first.
pub(crate) async fn registrations_of_event<C: ConnectionTrait>(
    db: &C,
    event_id: i32,
) -> Result<Vec<RegistrationResponse>, DbErr> {
    let rows = registration::Entity::find()
        .filter(registration::Column::EventId.eq(event_id))
        .find_also_related(user::Entity)
        .order_by_asc(registration::Column::CreatedAt)
        .order_by_asc(registration::Column::Id)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(r, account)| RegistrationResponse::new(r, account.as_ref()))
        .collect())
}
