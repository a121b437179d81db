// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    #[error("Validation failed")]
    Validation(ValidationErrors),

    #[error("This email is already taken")]
    EmailTaken,

    #[error("This phone number is already taken")]
    PhoneTaken,

    #[error("Email or Password is incorrect")]
    InvalidCredentials,

    #[error("Unauthorized Access! Only registered customer can log in.")]
    UnauthorizedAccess,

    #[error("Email address not found")]
    EmailNotFound,

    #[error("Invalid OTP, please try again")]
    InvalidOtp,

    #[error("Please verify OTP first")]
    OtpNotVerified,

    #[error("Password reset failed")]
    ResetFailed,

    #[error("Authentication required")]
    AuthRequired,

    #[error("Password hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Service error: {0}")]
    ServiceError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Validation and uniqueness failures carry field-scoped messages.
        match &self {
            AppError::Validation(errors) => {
                let body = Json(json!({
                    "message": "Validation failed",
                    "status": false,
                    "errors": validation_details(errors),
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::EmailTaken => {
                let body = Json(json!({
                    "message": self.to_string(),
                    "status": false,
                    "errors": { "email": [self.to_string()] },
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::PhoneTaken => {
                let body = Json(json!({
                    "message": self.to_string(),
                    "status": false,
                    "errors": { "phone": [self.to_string()] },
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            _ => {}
        }

        let (status, message) = match &self {
            AppError::MongoDB(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Bcrypt(e) => {
                tracing::error!("Password hashing error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong".to_string())
            }
            AppError::Mail(e) => {
                tracing::error!("Mail error: {}", e);
                (StatusCode::BAD_GATEWAY, "Failed to send OTP email".to_string())
            }
            AppError::ServiceError(e) => {
                tracing::error!("Service error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong".to_string())
            }
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::UnauthorizedAccess => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::EmailNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::InvalidOtp => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::OtpNotVerified => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::ResetFailed => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong".to_string())
            }
            AppError::AuthRequired => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Validation(_) | AppError::EmailTaken | AppError::PhoneTaken => {
                unreachable!()
            }
        };

        let body = Json(json!({
            "message": message,
            "status": false,
        }));

        (status, body).into_response()
    }
}

/// Flatten `ValidationErrors` into a `{ field: [messages] }` object.
pub fn validation_details(errors: &ValidationErrors) -> Value {
    let mut map = serde_json::Map::new();
    for (field, errs) in errors.field_errors() {
        let messages: Vec<Value> = errs
            .iter()
            .map(|e| {
                Value::String(
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                )
            })
            .collect();
        map.insert(field.to_string(), Value::Array(messages));
    }
    Value::Object(map)
}

pub type Result<T> = std::result::Result<T, AppError>;
