//! Error types surfaced by handlers, and their JSON rendering.
//!
//! Every failure leaves the API as `{ "success": false, "message", "code" }`
//! with a matching HTTP status.

use axum::{
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::cloze::GradeError;

/// Rejected input at the API boundary (clip metadata, activity payloads).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
  pub fn new(message: impl Into<String>) -> Self {
    Self(message.into())
  }
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Unauthorized(String),
  #[error("{0}")]
  Forbidden(String),
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error(transparent)]
  Grade(#[from] GradeError),
}

#[derive(Serialize)]
struct ErrorBody {
  success: bool,
  message: String,
  code: &'static str,
}

impl AppError {
  pub fn not_found(message: impl Into<String>) -> Self {
    Self::NotFound(message.into())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::Validation(_) | AppError::Grade(_) => StatusCode::BAD_REQUEST,
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      AppError::NotFound(_) => "NOT_FOUND",
      AppError::Unauthorized(_) => "UNAUTHORIZED",
      AppError::Forbidden(_) => "FORBIDDEN",
      AppError::Validation(_) => "VALIDATION_ERROR",
      AppError::Grade(GradeError::MalformedInput { .. }) => "MALFORMED_INPUT",
      AppError::Grade(GradeError::InputMismatch { .. }) => "INPUT_MISMATCH",
    }
  }
}

impl From<JsonRejection> for AppError {
  fn from(rejection: JsonRejection) -> Self {
    Self::Validation(ValidationError::new(rejection.body_text()))
  }
}

impl From<QueryRejection> for AppError {
  fn from(rejection: QueryRejection) -> Self {
    Self::Validation(ValidationError::new(rejection.body_text()))
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    debug!(target: "listening_backend", %status, code = self.code(), error = %self, "Request rejected");
    let message = self.to_string();
    let body = ErrorBody { success: false, message, code: self.code() };
    (status, Json(body)).into_response()
  }
}
