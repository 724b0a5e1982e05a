#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParseEnumError;

/// Lifecycle status of a registration.
///
/// Cancellation is a status change, never a row deletion. Only cancelled
/// registrations release their place.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegistrationStatus {
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CONFIRMED"))]
    Confirmed,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CANCELLED"))]
    Cancelled,
    /// Holds a place without being confirmed yet.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PENDING"))]
    Pending,
}

impl RegistrationStatus {
    pub const ALL: &'static [RegistrationStatus] =
        &[Self::Confirmed, Self::Cancelled, Self::Pending];

    /// Statuses that occupy a place at the event.
    pub const ACTIVE: &'static [RegistrationStatus] = &[Self::Confirmed, Self::Pending];

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::Pending => "PENDING",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            "PENDING" => Ok(Self::Pending),
            _ => Err(ParseEnumError::new(
                "status",
                s,
                Self::ALL.iter().map(|st| st.as_str()),
            )),
        }
    }
}
