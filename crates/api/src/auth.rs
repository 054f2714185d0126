//! Caller identity forwarded by the upstream gateway.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use lifecycle::{Actor, Role};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller, read from `x-user-id` and `x-user-role`.
///
/// A missing role means `customer`.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .map(|value| value.to_str().map(str::trim))
        };

        let user_id: UserId = match header(USER_ID_HEADER) {
            Some(Ok(raw)) => raw
                .parse()
                .map_err(|_| ApiError::Unauthorized("Invalid user identity".to_string()))?,
            _ => return Err(ApiError::Unauthorized("Not authenticated".to_string())),
        };

        let role = match header(USER_ROLE_HEADER) {
            None => Role::Customer,
            Some(Ok(raw)) => raw
                .parse()
                .map_err(|_| ApiError::Unauthorized(format!("Unknown role: {raw}")))?,
            Some(Err(_)) => return Err(ApiError::Unauthorized("Invalid role header".to_string())),
        };

        Ok(Caller(Actor { user_id, role }))
    }
}
