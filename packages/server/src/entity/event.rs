use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub date: DateTimeUtc,
    pub location: String,
    /// Maximum number of active registrations.
    pub capacity: i32,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,

    /// Admin who created the event.
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub created_by: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub registrations: HasMany<super::registration::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
