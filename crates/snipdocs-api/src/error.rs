//! Mapping of domain errors onto HTTP responses

use axum::{http::StatusCode, Json};
use snipdocs_auth::AuthError;
use snipdocs_core::ServiceError;
use tracing::{error, warn};

use crate::models::ErrorResponse;

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = Result<T, ApiError>;

fn respond(status: StatusCode, body: ErrorResponse) -> ApiError {
    (status, Json(body))
}

fn field_error(field: &str, message: String) -> ApiError {
    let mut fields = std::collections::BTreeMap::new();
    fields.insert(field.to_string(), vec![message]);
    respond(
        StatusCode::UNPROCESSABLE_ENTITY,
        ErrorResponse {
            fields: Some(fields),
            ..ErrorResponse::new("Validation failed", "VALIDATION_FAILED")
        },
    )
}

pub fn service_error(err: ServiceError) -> ApiError {
    match err {
        ServiceError::Validation(fields) => respond(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse {
                fields: Some(fields),
                ..ErrorResponse::new("Validation failed", "VALIDATION_FAILED")
            },
        ),
        ServiceError::Unauthenticated => respond(
            StatusCode::UNAUTHORIZED,
            ErrorResponse::new("Authentication required", "UNAUTHENTICATED"),
        ),
        ServiceError::NotFound => respond(
            StatusCode::NOT_FOUND,
            ErrorResponse::new("Not found", "NOT_FOUND"),
        ),
        ServiceError::Forbidden => respond(
            StatusCode::FORBIDDEN,
            ErrorResponse::new("You do not have permission to do this", "FORBIDDEN"),
        ),
        ServiceError::Conflict { message, hint } => respond(
            StatusCode::CONFLICT,
            ErrorResponse {
                hint: Some(hint),
                ..ErrorResponse::new(message, "CONFLICT")
            },
        ),
        ServiceError::Transient(cause) => {
            warn!("Transient failure: {}", cause);
            respond(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    hint: Some("Try again in a moment".to_string()),
                    ..ErrorResponse::new("Service temporarily unavailable", "UNAVAILABLE")
                },
            )
        }
        ServiceError::Database(err) => {
            error!("Database error: {}", err);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Internal server error", "INTERNAL_ERROR"),
            )
        }
        ServiceError::Auth(err) => auth_error(err),
    }
}

pub fn auth_error(err: AuthError) -> ApiError {
    let message = err.to_string();
    match err {
        AuthError::InvalidCredentials => respond(
            StatusCode::UNAUTHORIZED,
            ErrorResponse::new(message, "INVALID_CREDENTIALS"),
        ),
        AuthError::EmailNotConfirmed => respond(
            StatusCode::FORBIDDEN,
            ErrorResponse {
                hint: Some("Check your inbox for the confirmation link".to_string()),
                ..ErrorResponse::new(message, "EMAIL_NOT_CONFIRMED")
            },
        ),
        AuthError::EmailTaken => respond(
            StatusCode::CONFLICT,
            ErrorResponse {
                hint: Some("Sign in instead, or reset your password".to_string()),
                ..ErrorResponse::new(message, "EMAIL_TAKEN")
            },
        ),
        AuthError::InvalidEmail => field_error("email", message),
        AuthError::WeakPassword(reason) => field_error("password", reason),
        AuthError::InvalidToken => respond(
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(message, "INVALID_TOKEN"),
        ),
        AuthError::UserNotFound => respond(
            StatusCode::NOT_FOUND,
            ErrorResponse::new(message, "USER_NOT_FOUND"),
        ),
        AuthError::UnknownProvider(_) => respond(
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(message, "UNKNOWN_PROVIDER"),
        ),
        AuthError::OAuthUnavailable(_) => respond(
            StatusCode::NOT_IMPLEMENTED,
            ErrorResponse::new(message, "OAUTH_UNAVAILABLE"),
        ),
        AuthError::Unavailable(_) => {
            warn!("Identity provider unavailable: {}", message);
            respond(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    hint: Some("Try again in a moment".to_string()),
                    ..ErrorResponse::new("Service temporarily unavailable", "UNAVAILABLE")
                },
            )
        }
        AuthError::Provider(_) => {
            error!("Identity provider error: {}", message);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Internal server error", "INTERNAL_ERROR"),
            )
        }
    }
}
