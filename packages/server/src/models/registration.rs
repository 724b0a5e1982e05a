use chrono::{DateTime, Utc};
use common::RegistrationStatus;
use serde::{Deserialize, Serialize};

use super::event::EventSummary;
use super::shared::{validate_email, validate_name};
use crate::entity::{event, registration, user};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateBookingRequest {
    #[schema(example = 1)]
    pub event_id: i32,
}

/// Contact details for a registration without an account.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct GuestRegistrationRequest {
    #[schema(example = "Jane Guest")]
    pub name: String,
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[schema(example = "+49 30 1234567")]
    pub phone: Option<String>,
}

pub fn validate_guest_registration(req: &GuestRegistrationRequest) -> Result<(), AppError> {
    validate_name(&req.name)?;
    validate_email(&req.email)?;
    if let Some(ref phone) = req.phone {
        let phone = phone.trim();
        let valid = phone.chars().count() <= 32
            && phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '/'));
        if !valid {
            return Err(AppError::Validation("Phone number is invalid".into()));
        }
    }
    Ok(())
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateBookingRequest {
    /// One of `CONFIRMED`, `CANCELLED`, `PENDING`.
    #[schema(example = "CANCELLED")]
    pub status: String,
}

pub fn parse_status(raw: &str) -> Result<RegistrationStatus, AppError> {
    raw.parse::<RegistrationStatus>()
        .map_err(|e| AppError::Validation(format!("Invalid booking status: {e}")))
}

/// Who holds a registration.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, utoipa::ToSchema)]
pub enum RegistrantKind {
    User,
    Guest,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RegistrationResponse {
    pub id: i32,
    pub event_id: i32,
    /// NULL for guest registrations.
    pub user_id: Option<i32>,
    #[serde(rename = "type")]
    pub kind: RegistrantKind,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventSummary>,
}

impl RegistrationResponse {
    /// Build the response; `account` is the owning user for account
    /// registrations and is ignored for guests.
    pub fn new(r: registration::Model, account: Option<&user::Model>) -> Self {
        Self::build(r, account.map(|u| (u.name.as_str(), u.email.as_str())))
    }

    /// Response for a registration held by the caller.
    pub fn for_caller(r: registration::Model, caller: &AuthUser) -> Self {
        Self::build(r, Some((caller.name.as_str(), caller.email.as_str())))
    }

    fn build(r: registration::Model, account: Option<(&str, &str)>) -> Self {
        let (kind, name, email, phone) = match r.user_id {
            Some(_) => {
                let (name, email) = account.unwrap_or_default();
                (
                    RegistrantKind::User,
                    name.to_string(),
                    email.to_string(),
                    None,
                )
            }
            None => (
                RegistrantKind::Guest,
                r.guest_name.unwrap_or_default(),
                r.guest_email.unwrap_or_default(),
                r.guest_phone,
            ),
        };
        Self {
            id: r.id,
            event_id: r.event_id,
            user_id: r.user_id,
            kind,
            name,
            email,
            phone,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
            event: None,
        }
    }

    pub fn with_event(mut self, event: Option<event::Model>) -> Self {
        self.event = event.map(EventSummary::from);
        self
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RegistrationStatusResponse {
    /// Whether the caller holds an active registration.
    pub is_registered: bool,
    pub registration: Option<RegistrationResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Registration cancelled")]
    pub message: String,
}
