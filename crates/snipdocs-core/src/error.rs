//! Service error taxonomy

use std::collections::BTreeMap;

use sea_orm::{DbErr, SqlErr};
use snipdocs_auth::AuthError;
use thiserror::Error;
use tracing::debug;
use validator::ValidationErrors;

/// Field name → human readable messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input, reported per field before anything is written
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Authentication required")]
    Unauthenticated,

    /// Missing, or not visible to the caller
    #[error("Not found")]
    NotFound,

    /// Authenticated but lacking the required role
    #[error("Forbidden")]
    Forbidden,

    /// Uniqueness violation the caller can fix
    #[error("{message}")]
    Conflict { message: String, hint: String },

    /// Database or identity service unreachable; safe to retry
    #[error("Service temporarily unavailable: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(DbErr),

    /// Rejected by the identity provider
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ServiceError {
    /// Single-field validation failure
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ServiceError::Validation(errors)
    }

    pub fn conflict(message: impl Into<String>, hint: impl Into<String>) -> Self {
        ServiceError::Conflict {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Classify `err`, reporting unique violations with the given wording
    pub fn from_db_conflict(err: DbErr, message: &str, hint: &str) -> Self {
        match ServiceError::from(err) {
            ServiceError::Conflict { .. } => ServiceError::conflict(message, hint),
            other => other,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, ServiceError::Conflict { .. })
    }
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            debug!(detail = %detail, "Unique constraint violation");
            return ServiceError::conflict(
                "This value is already in use",
                "Refresh the page and try again",
            );
        }

        match err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => {
                ServiceError::Transient(err.to_string())
            }
            other => ServiceError::Database(other),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let messages = fields.entry(field.to_string()).or_default();
            for err in errs.iter() {
                let message = match &err.message {
                    Some(message) => message.to_string(),
                    None => format!("Invalid value ({})", err.code),
                };
                messages.push(message);
            }
        }
        ServiceError::Validation(fields)
    }
}

/// Merge two validation outcomes, keeping every field message
pub(crate) fn merge_validation(
    result: Result<(), ValidationErrors>,
    extra: FieldErrors,
) -> ServiceResult<()> {
    let mut fields = match result {
        Ok(()) => FieldErrors::new(),
        Err(errors) => match ServiceError::from(errors) {
            ServiceError::Validation(fields) => fields,
            other => return Err(other),
        },
    };

    for (field, messages) in extra {
        fields.entry(field).or_default().extend(messages);
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::Validation(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "Too short"))]
        name: String,
    }

    #[test]
    fn test_validation_errors_become_field_map() {
        let err = ServiceError::from(
            Sample {
                name: "ab".to_string(),
            }
            .validate()
            .unwrap_err(),
        );

        match err {
            ServiceError::Validation(fields) => {
                assert_eq!(fields["name"], vec!["Too short".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_merge_keeps_extra_fields() {
        let mut extra = FieldErrors::new();
        extra.insert("category_id".into(), vec!["Category is required".into()]);

        let err = merge_validation(Ok(()), extra).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(f) if f.contains_key("category_id")));
        assert!(merge_validation(Ok(()), FieldErrors::new()).is_ok());
    }

    #[tokio::test]
    async fn test_unique_violation_hint_hides_database_text() {
        use chrono::Utc;
        use sea_orm::{ActiveModelTrait, Set};
        use snipdocs_db::entities::tag;

        let db = snipdocs_db::connect("sqlite::memory:").await.unwrap();
        snipdocs_db::migrate(&db).await.unwrap();
        let model = || tag::ActiveModel {
            id: Set(uuid::Uuid::new_v4()),
            name: Set("Rust".to_string()),
            slug: Set("rust".to_string()),
            usage_count: Set(0),
            created_at: Set(Utc::now()),
        };
        model().insert(&db).await.unwrap();
        let err = ServiceError::from(model().insert(&db).await.unwrap_err());

        match err {
            ServiceError::Conflict { message, hint } => {
                assert_eq!(message, "This value is already in use");
                assert_eq!(hint, "Refresh the page and try again");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_connection_errors_are_transient() {
        let err = ServiceError::from(DbErr::Conn(sea_orm::RuntimeErr::Internal(
            "refused".into(),
        )));
        assert!(matches!(err, ServiceError::Transient(_)));

        let err = ServiceError::from(DbErr::RecordNotFound("x".into()));
        assert!(matches!(err, ServiceError::Database(_)));
    }
}
