use chrono::{DateTime, Utc};
use common::Occupancy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::shared::validate_title;
use crate::entity::{event, user};
use crate::error::AppError;

const MAX_CAPACITY: i32 = 100_000;
const MAX_DESCRIPTION_LEN: usize = 10_000;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateEventRequest {
    #[schema(example = "Rust Meetup")]
    pub title: String,
    #[schema(example = "Monthly meetup with two talks")]
    pub description: String,
    #[schema(example = "2024-12-20T18:00:00Z")]
    pub date: DateTime<Utc>,
    #[schema(example = "Berlin")]
    pub location: String,
    /// Maximum number of active registrations (1-100000).
    #[schema(example = 100)]
    pub capacity: i32,
    /// Ticket price, non-negative, two decimal places.
    #[schema(value_type = String, example = "29.99")]
    pub price: Decimal,
}

/// Partial update. Absent fields keep their current value.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventListQuery {
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
    /// Only events dated now or later.
    pub upcoming: Option<bool>,
}

/// Minimal view of the admin who created an event.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CreatorSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
}

impl From<user::Model> for CreatorSummary {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EventResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub capacity: i32,
    #[schema(value_type = String, example = "29.99")]
    pub price: Decimal,
    pub user_id: i32,
    pub created_by: Option<CreatorSummary>,
    /// Number of active (non-cancelled) registrations.
    pub registrations: u64,
    /// `capacity - registrations`, never negative.
    pub available_places: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventResponse {
    pub fn new(m: event::Model, creator: Option<user::Model>, occupied: u64) -> Self {
        let occupancy = Occupancy::new(m.capacity, occupied);
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            date: m.date,
            location: m.location,
            capacity: m.capacity,
            price: m.price,
            user_id: m.user_id,
            created_by: creator.map(CreatorSummary::from),
            registrations: occupancy.occupied,
            available_places: occupancy.available(),
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Compact event view embedded in registration listings.
#[derive(Serialize, utoipa::ToSchema)]
pub struct EventSummary {
    pub id: i32,
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: String,
}

impl From<event::Model> for EventSummary {
    fn from(m: event::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            date: m.date,
            location: m.location,
        }
    }
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.trim().is_empty() || description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "Description must be 1-{MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_location(location: &str) -> Result<(), AppError> {
    let location = location.trim();
    if location.is_empty() || location.chars().count() > 256 {
        return Err(AppError::Validation(
            "Location must be 1-256 characters".into(),
        ));
    }
    Ok(())
}

fn validate_capacity(capacity: i32) -> Result<(), AppError> {
    if !(1..=MAX_CAPACITY).contains(&capacity) {
        return Err(AppError::Validation(format!(
            "Capacity must be between 1 and {MAX_CAPACITY}"
        )));
    }
    Ok(())
}

/// Checked after rounding to cents, the precision the price is stored at.
fn validate_price(price: Decimal) -> Result<(), AppError> {
    let price = price.round_dp(2);
    if price.is_sign_negative() && !price.is_zero() {
        return Err(AppError::Validation("Price must be >= 0".into()));
    }
    if price >= Decimal::new(100_000_000, 0) {
        return Err(AppError::Validation("Price is too large".into()));
    }
    Ok(())
}

pub fn validate_create_event(req: &CreateEventRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_description(&req.description)?;
    validate_location(&req.location)?;
    validate_capacity(req.capacity)?;
    validate_price(req.price)
}

pub fn validate_update_event(req: &UpdateEventRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref description) = req.description {
        validate_description(description)?;
    }
    if let Some(ref location) = req.location {
        validate_location(location)?;
    }
    if let Some(capacity) = req.capacity {
        validate_capacity(capacity)?;
    }
    if let Some(price) = req.price {
        validate_price(price)?;
    }
    Ok(())
}
