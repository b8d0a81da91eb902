//! Error types for the Adssimsim rewards platform
//!
//! All crates in the workspace report failures through [`AdssimsimError`].
//! Database errors are translated into the taxonomy at a single boundary
//! (`AdssimsimError::from_sqlx`) so callers can branch on the error kind
//! instead of inspecting driver codes.

use uuid::Uuid;

/// Platform-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AdssimsimError {
    /// The viewer already holds an ad view for this campaign
    #[error("reward already claimed by viewer {viewer_id} for campaign {campaign_id}")]
    DuplicateClaim { viewer_id: Uuid, campaign_id: Uuid },

    /// The viewer point credit failed; the settlement is aborted
    #[error("critical write failed: {message}")]
    CriticalWriteFailure { message: String },

    /// Campaign stats or advertiser debit failed after the credit landed
    #[error("non-critical write failed during {stage}: {message}")]
    NonCriticalWriteFailure { stage: String, message: String },

    /// Transport-level failure reaching the store
    #[error("network unavailable: {message}")]
    NetworkUnavailable { message: String },

    /// The store is missing an expected table or column
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// An authorization policy rejected the operation
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// Input failed validation
    #[error("validation failed: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    /// Configuration could not be loaded or validated
    #[error("configuration error: {message}")]
    ConfigurationError {
        message: String,
        key: Option<String>,
    },

    /// A store operation failed for a reason outside the taxonomy above
    #[error("database error during {operation}: {message}")]
    DatabaseError { message: String, operation: String },

    /// A referenced row does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },
}

impl AdssimsimError {
    pub fn duplicate_claim(viewer_id: Uuid, campaign_id: Uuid) -> Self {
        Self::DuplicateClaim {
            viewer_id,
            campaign_id,
        }
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::CriticalWriteFailure {
            message: message.into(),
        }
    }

    pub fn non_critical(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NonCriticalWriteFailure {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkUnavailable {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }

    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn configuration(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    pub fn database(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::DatabaseError {
            message: message.into(),
            operation: operation.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Whether a retry of the failed operation can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnavailable { .. } | Self::DatabaseError { .. }
        )
    }

    /// Translate a driver error into the platform taxonomy
    ///
    /// Postgres codes: `42501` is a row-level security rejection, `42P01`
    /// and `42703` are missing relation/column, anything transport-shaped
    /// becomes `NetworkUnavailable`.
    pub fn from_sqlx(err: sqlx::Error, operation: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("42501") => Self::PermissionDenied {
                    message: db.message().to_string(),
                },
                Some("42P01") | Some("42703") => Self::SchemaMismatch {
                    message: db.message().to_string(),
                },
                _ => Self::database(db.message(), operation),
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => Self::network(err.to_string()),
            _ => Self::database(err.to_string(), operation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_constructors() {
        let viewer = Uuid::new_v4();
        let campaign = Uuid::new_v4();

        let err = AdssimsimError::duplicate_claim(viewer, campaign);
        assert!(matches!(err, AdssimsimError::DuplicateClaim { .. }));
        assert!(err.to_string().contains(&viewer.to_string()));

        let err = AdssimsimError::non_critical("advertiser debit", "timeout");
        match err {
            AdssimsimError::NonCriticalWriteFailure { stage, .. } => {
                assert_eq!(stage, "advertiser debit");
            }
            _ => panic!("expected NonCriticalWriteFailure"),
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AdssimsimError::network("connection reset").is_retryable());
        assert!(AdssimsimError::database("deadlock", "settle").is_retryable());
        assert!(!AdssimsimError::validation("bad reward").is_retryable());
        assert!(!AdssimsimError::duplicate_claim(Uuid::new_v4(), Uuid::new_v4()).is_retryable());
    }

    #[test]
    fn test_from_sqlx_transport_errors() {
        let io = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(
            AdssimsimError::from_sqlx(io, "list campaigns"),
            AdssimsimError::NetworkUnavailable { .. }
        ));

        assert!(matches!(
            AdssimsimError::from_sqlx(sqlx::Error::PoolTimedOut, "list campaigns"),
            AdssimsimError::NetworkUnavailable { .. }
        ));
    }

    #[test]
    fn test_from_sqlx_fallback_keeps_operation() {
        let err = AdssimsimError::from_sqlx(sqlx::Error::RowNotFound, "credit points");
        match err {
            AdssimsimError::DatabaseError { operation, .. } => {
                assert_eq!(operation, "credit points");
            }
            _ => panic!("expected DatabaseError"),
        }
    }
}
