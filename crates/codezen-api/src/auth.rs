//! Request principal.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use codezen_core::User;

use crate::error::ApiError;
use crate::state::AppState;

/// Header naming the calling user.
pub const USER_HEADER: &str = "x-user-email";

/// The user a request acts for, resolved from [`USER_HEADER`] and created on
/// first sight.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let email = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let user = state.service.resolve_user(email)?;
        Ok(CurrentUser(user))
    }
}
