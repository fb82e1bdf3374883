//! Caller identity as forwarded by the upstream gateway.
//!
//! Authentication happens before requests reach us; the gateway sets
//! `x-user-id` and `x-user-role`. These extractors only read them.

use axum::{
  async_trait,
  extract::FromRequestParts,
  http::{request::Parts, HeaderMap},
};

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const ADMIN_ROLE: &str = "admin";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
}

/// The caller's user id, if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<String>);

/// A signed-in caller.
#[derive(Debug, Clone)]
pub struct User(pub String);

/// A signed-in caller with the admin role.
#[derive(Debug, Clone)]
pub struct Admin(pub String);

pub fn user_from_headers(headers: &HeaderMap) -> Option<String> {
  header_value(headers, USER_ID_HEADER)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    Ok(MaybeUser(user_from_headers(&parts.headers)))
  }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for User {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    user_from_headers(&parts.headers)
      .map(User)
      .ok_or_else(|| AppError::Unauthorized("Not signed in".into()))
  }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Admin {
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let user = user_from_headers(&parts.headers).ok_or_else(|| AppError::Unauthorized("Not signed in".into()))?;
    match header_value(&parts.headers, USER_ROLE_HEADER) {
      Some(role) if role == ADMIN_ROLE => Ok(Admin(user)),
      _ => Err(AppError::Forbidden("Admin role required".into())),
    }
  }
}
