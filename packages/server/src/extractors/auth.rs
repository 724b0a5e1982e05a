use axum::{extract::FromRequestParts, http::request::Parts};
use common::UserRole;

use crate::entity::user;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::{account, jwt};

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// The token only identifies the account; the user row is reloaded from the
/// store on every request so that a role change applies immediately.
/// Role checks happen via `require_admin()` in the handler body.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Returns `Ok(())` for admins, `Err(AdminRequired)` otherwise.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::AdminRequired)
        }
    }

    /// Whether the caller may act on a record owned by `owner_id`.
    pub fn owns_or_admin(&self, owner_id: Option<i32>) -> bool {
        self.is_admin() || owner_id == Some(self.user_id)
    }
}

impl From<user::Model> for AuthUser {
    fn from(user: user::Model) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        }
    }
}

/// Pull the raw token out of the request headers.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::TokenMissing)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::TokenInvalid)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims =
            jwt::verify(token, &state.config.auth.jwt_secret).map_err(|_| AppError::TokenInvalid)?;

        let user = account::find_by_id(&state.db, claims.uid)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if user.role != claims.role {
            tracing::debug!(
                user_id = user.id,
                token_role = %claims.role,
                stored_role = %user.role,
                "Token role is stale, using stored role"
            );
        }

        Ok(AuthUser::from(user))
    }
}
