use common::RegistrationStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A place held at an event, either by an account or by a guest.
///
/// Exactly one of `user_id` and the guest contact columns is populated.
/// Unique per (event, user) and per (event, guest email); see `seed::ensure_indexes`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registration")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub event_id: i32,
    #[sea_orm(belongs_to, from = "event_id", to = "id")]
    pub event: HasOne<super::event::Entity>,

    /// NULL for guest registrations.
    pub user_id: Option<i32>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,

    pub status: RegistrationStatus,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
