//! Uniform response envelope and error mapping for the HTTP API.
//!
//! Success: `{"success": true, "message": ..., "data": ...}`
//! Failure: `{"success": false, "message": ...}`

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::Error;

#[derive(Debug, Serialize)]
struct SuccessBody<T> {
    success: bool,
    message: String,
    data: T,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_fields: Option<Vec<String>>,
}

/// Successful response with a payload, message and status code
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    message: String,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data,
        }
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = SuccessBody {
            success: true,
            message: self.message,
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request (body, query string or path)
    BadRequest(String),
    /// Unknown resource or route
    NotFound(String),
    /// Failure from the CMDB services
    Cmdb(Error),
}

impl ApiError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Cmdb(err) => match err {
                Error::InvalidInput(_) | Error::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
                Error::ReferenceNotFound { .. } => StatusCode::NOT_FOUND,
                Error::DanglingReference { .. } | Error::HierarchyRejected(_) => {
                    StatusCode::CONFLICT
                }
                Error::Storage(_) | Error::Serialization(_) | Error::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => format!("Validation error: {}", msg),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Cmdb(Error::InvalidInput(msg)) => format!("Validation error: {}", msg),
            // Store details stay in the logs
            ApiError::Cmdb(err) if !err.is_rejection() => "Internal server error".to_string(),
            ApiError::Cmdb(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let missing_fields = match &self {
            ApiError::Cmdb(Error::ValidationFailed { missing, .. }) => Some(missing.clone()),
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            message: self.message(),
            missing_fields,
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Cmdb(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
