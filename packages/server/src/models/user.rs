use serde::Serialize;

use super::auth::UserResponse;
use super::event::EventSummary;
use super::registration::RegistrationResponse;

/// Admin view of a single account with its created events and registrations.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserDetailResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub events: Vec<EventSummary>,
    pub registrations: Vec<RegistrationResponse>,
}
