//! Audit trail error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by audit trail operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Stored fingerprint differs from the recomputed one.
    #[error("Audit record {0} failed integrity verification")]
    IntegrityMismatch(Uuid),

    /// Referenced record not found.
    #[error("Audit record {0} not found")]
    NotFound(Uuid),

    /// A resolution or approval requires a non-empty reason.
    #[error("A non-empty reason is required")]
    ReasonRequired,

    /// The actor's role may not perform this operation.
    #[error("Role '{0}' may not perform this audit operation")]
    Forbidden(String),

    /// Invalid lifecycle transition.
    #[error("Record {id} is {status}, cannot {action}")]
    InvalidTransition {
        /// Record id.
        id: Uuid,
        /// Current status.
        status: String,
        /// Attempted action.
        action: String,
    },

    /// Unsupported export format.
    #[error("Unsupported export format '{0}'")]
    UnsupportedFormat(String),

    /// Export serialization failed.
    #[error("Export failed: {0}")]
    ExportFailed(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl AuditError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::IntegrityMismatch(_) => "INTEGRITY_MISMATCH",
            Self::NotFound(_) => "AUDIT_RECORD_NOT_FOUND",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::ExportFailed(_) => "EXPORT_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::IntegrityMismatch(_) | Self::InvalidTransition { .. } => 409,
            Self::NotFound(_) => 404,
            Self::ReasonRequired | Self::UnsupportedFormat(_) => 400,
            Self::Forbidden(_) => 403,
            Self::ExportFailed(_) | Self::Database(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_status() {
        let id = Uuid::nil();
        assert_eq!(
            AuditError::IntegrityMismatch(id).error_code(),
            "INTEGRITY_MISMATCH"
        );
        assert_eq!(AuditError::IntegrityMismatch(id).http_status_code(), 409);
        assert_eq!(AuditError::NotFound(id).http_status_code(), 404);
        assert_eq!(
            AuditError::UnsupportedFormat("xml".into()).http_status_code(),
            400
        );
        assert_eq!(
            AuditError::Forbidden("viewer".into()).http_status_code(),
            403
        );
    }
}
