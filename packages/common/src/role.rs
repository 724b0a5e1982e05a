#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseEnumError;

/// Role attached to every account.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    /// Manages events and sees every registration. At most one per deployment.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ADMIN"))]
    Admin,
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "USER"))]
    User,
}

impl UserRole {
    pub const ALL: &'static [UserRole] = &[Self::Admin, Self::User];

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "USER" => Ok(Self::User),
            _ => Err(ParseEnumError::new(
                "role",
                s,
                Self::ALL.iter().map(|r| r.as_str()),
            )),
        }
    }
}
