use crate::services::material_validator::{Conflict, ValidationError};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Conflict(Vec<Conflict>),
    AlreadySubmitted,
    NotSubmitted,
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    InvalidRequest(String),
    DatabaseError(String),
    SpreadsheetRead(String),
    SpreadsheetWrite(String),
}

impl AppError {
    /// Stable classification sent to clients alongside the message
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(e) => e.kind(),
            AppError::Conflict(_) => "conflict",
            AppError::AlreadySubmitted => "already_submitted",
            AppError::NotSubmitted => "not_submitted",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::DatabaseError(_) => "database",
            AppError::SpreadsheetRead(_) | AppError::SpreadsheetWrite(_) => "spreadsheet",
        }
    }

    /// Conflicting materials as submitted, in submission order
    pub fn duplicates(&self) -> Vec<String> {
        match self {
            AppError::Conflict(conflicts) => conflicts.iter().map(|c| c.material.clone()).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Conflict(_) => write!(
                f,
                "The following materials are already claimed by other students: {}",
                self.duplicates().join(", ")
            ),
            AppError::AlreadySubmitted => write!(f, "You have already submitted your materials."),
            AppError::NotSubmitted => write!(
                f,
                "You have not submitted your materials yet. Submit them before editing."
            ),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::SpreadsheetRead(msg) => write!(f, "Could not read spreadsheet: {}", msg),
            AppError::SpreadsheetWrite(msg) => write!(f, "Could not build spreadsheet: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e)
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidRequest(_) | AppError::SpreadsheetRead(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict(_) | AppError::AlreadySubmitted | AppError::NotSubmitted => {
                StatusCode::CONFLICT
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_) | AppError::SpreadsheetWrite(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        crate::api::metrics::increment_error_count();

        let mut body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "kind": self.kind(),
        });
        if let AppError::Conflict(conflicts) = self {
            body["duplicates"] = serde_json::json!(self.duplicates());
            body["conflicts"] = serde_json::json!(conflicts);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}
