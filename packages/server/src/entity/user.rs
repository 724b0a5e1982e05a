use common::UserRole;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    /// At most one row may hold `ADMIN`, see `seed::ensure_indexes`.
    pub role: UserRole,

    #[sea_orm(has_many)]
    pub events: HasMany<super::event::Entity>,

    #[sea_orm(has_many)]
    pub registrations: HasMany<super::registration::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
