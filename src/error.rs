// src/error.rs
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

use crate::inventory::ValidationError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    InternalServerError(String),
    ValidationError(String),
    ReservedExceedsTotal { reserved: i64, total: i64 },
    DatabaseError(sqlx::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::ReservedExceedsTotal { reserved, total } => write!(
                f,
                "Validation Error: Reserved beds ({}) cannot exceed total beds ({})",
                reserved, total
            ),
            ApiError::DatabaseError(err) => write!(f, "Database Error: {}", err),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse {
            success: false,
            message: self.to_string(),
        };

        match self {
            ApiError::BadRequest(_) => HttpResponse::BadRequest().json(error_response),
            ApiError::NotFound(_) => HttpResponse::NotFound().json(error_response),
            ApiError::Unauthorized(_) => HttpResponse::Unauthorized().json(error_response),
            ApiError::Forbidden(_) => HttpResponse::Forbidden().json(error_response),
            ApiError::ValidationError(_) => HttpResponse::UnprocessableEntity().json(error_response),
            ApiError::ReservedExceedsTotal { .. } => {
                HttpResponse::UnprocessableEntity().json(error_response)
            }
            ApiError::DatabaseError(_) => HttpResponse::InternalServerError().json(error_response),
            ApiError::InternalServerError(_) => HttpResponse::InternalServerError().json(error_response),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::ReservedExceedsTotal { reserved, total } => {
                ApiError::ReservedExceedsTotal { reserved, total }
            }
        }
    }
}

// Bed-management specific errors
impl ApiError {
    pub fn bad_request(msg: &str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }

    pub fn ward_not_found(id: i64) -> Self {
        ApiError::NotFound(format!("Ward with ID '{}' not found", id))
    }

    pub fn hospital_not_found(id: i64) -> Self {
        ApiError::NotFound(format!("Hospital with ID '{}' not found", id))
    }

    pub fn unknown_ward_slot(ward_type: &str, ac_type: &str, room_config: Option<&str>) -> Self {
        ApiError::BadRequest(format!(
            "Unknown ward configuration: ward_type='{}', ac_type='{}', room_config='{}'",
            ward_type,
            ac_type,
            room_config.unwrap_or("-")
        ))
    }

    pub fn no_beds_available() -> Self {
        ApiError::BadRequest(
            "No beds available for the selected ward type. Please choose a different option."
                .to_string(),
        )
    }

    pub fn session_required() -> Self {
        ApiError::Unauthorized("A valid session is required".to_string())
    }
}
