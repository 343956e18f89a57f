//! API error taxonomy and the boundary that turns errors into responses.
//!
//! Handlers return [`ApiError`] for expected failures; its status, code and
//! message reach the caller verbatim. Anything else that escapes a handler
//! goes through an [`ExceptionFilter`], which logs it and answers with a
//! generic internal error.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display, EnumIter};
use thiserror::Error;

pub mod http;

pub use http::HttpExceptionFilter;

/// Which side of the exchange is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFamily {
    Client,
    Server,
}

/// Concrete API error kinds, each with a fixed status and default code/message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Validation,
    Internal,
    NotImplemented,
    ServiceUnavailable,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn default_code(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation_error",
            ErrorKind::Internal => "internal_server_error",
            ErrorKind::NotImplemented => "not_implemented",
            ErrorKind::ServiceUnavailable => "service_unavailable",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "The request could not be processed",
            ErrorKind::Unauthorized => "Authentication failed or user doesn't have permissions",
            ErrorKind::Forbidden => "Access to the requested resource is forbidden",
            ErrorKind::NotFound => "The requested resource could not be found",
            ErrorKind::Conflict => "A conflict occurred while processing the request",
            ErrorKind::Validation => "The request contained validation errors",
            ErrorKind::Internal => "An unexpected error occurred",
            ErrorKind::NotImplemented => "The requested functionality is not implemented",
            ErrorKind::ServiceUnavailable => "The service is currently unavailable",
        }
    }

    pub fn family(self) -> ErrorFamily {
        if self.status().is_client_error() {
            ErrorFamily::Client
        } else {
            ErrorFamily::Server
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

/// A typed API error.
///
/// ```
/// use nanoservice::exception::ApiError;
///
/// let err = ApiError::not_found()
///     .with_message("No message with id 42")
///     .with_detail("id", 42);
/// assert_eq!(err.status().as_u16(), 404);
/// assert_eq!(err.code(), "not_found");
/// ```
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    kind: ErrorKind,
    code: String,
    message: String,
    details: Option<Map<String, Value>>,
}

impl ApiError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            code: kind.default_code().to_string(),
            message: kind.default_message().to_string(),
            details: None,
        }
    }

    pub fn bad_request() -> Self {
        Self::new(ErrorKind::BadRequest)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden)
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    pub fn conflict() -> Self {
        Self::new(ErrorKind::Conflict)
    }

    pub fn validation() -> Self {
        Self::new(ErrorKind::Validation)
    }

    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    pub fn not_implemented() -> Self {
        Self::new(ErrorKind::NotImplemented)
    }

    pub fn service_unavailable() -> Self {
        Self::new(ErrorKind::ServiceUnavailable)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&Map<String, Value>> {
        self.details.as_ref()
    }

    pub fn to_detail(&self) -> ErrorDetail {
        ErrorDetail {
            code: self.code.clone(),
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }
}

impl ApiError {
    /// The response body without logging, for callers that already logged the cause.
    pub fn render(self) -> Response {
        let status = self.status();
        let body = ErrorDetail {
            code: self.code,
            message: self.message,
            details: self.details,
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.kind.family() {
            ErrorFamily::Server => {
                tracing::error!(status = status.as_u16(), code = %self.code, "API error: {}", self.message)
            }
            ErrorFamily::Client => {
                tracing::warn!(status = status.as_u16(), code = %self.code, "API error: {}", self.message)
            }
        }
        self.render()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

fn from_rejection(status: StatusCode, text: String) -> ApiError {
    let base = if status == StatusCode::UNPROCESSABLE_ENTITY {
        ApiError::validation()
    } else {
        ApiError::bad_request()
    };
    base.with_message(text)
}

/// Turns an error that escaped a handler into a response.
pub trait ExceptionFilter: Send + Sync + 'static {
    fn catch(&self, error: anyhow::Error) -> Response;
}
