//! Error types module
//!
//! All failures surfaced by the review core are unified under `AppError`. The variants
//! follow the user-facing taxonomy: local validation failures, failed resolution calls
//! against the relational store, per-image upload failures, and partial multi-row writes.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::collections::BTreeMap;
use std::fmt;
use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "RESOLUTION_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether the user may retry the same action
    fn is_recoverable(&self) -> bool;

    /// Message suitable for a toast or inline hint
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Field-keyed validation messages, rendered inline next to the offending field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message for a field. The first message per field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Convert into a `Result`, failing when any field has a message.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

impl FieldErrors {
    fn collect(&mut self, prefix: &str, errors: &validator::ValidationErrors) {
        use validator::ValidationErrorsKind;

        for (field, kind) in errors.errors() {
            let path = if prefix.is_empty() {
                field.to_string()
            } else {
                format!("{}.{}", prefix, field)
            };
            match kind {
                ValidationErrorsKind::Field(field_errors) => {
                    if let Some(first) = field_errors.first() {
                        let message = first
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| first.code.to_string());
                        self.add(path, message);
                    }
                }
                ValidationErrorsKind::Struct(inner) => self.collect(&path, inner),
                ValidationErrorsKind::List(items) => {
                    for (index, inner) in items {
                        self.collect(&format!("{}[{}]", path, index), inner);
                    }
                }
            }
        }
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        out.collect("", &errors);
        out
    }
}

/// Which dependent row of a concert submission failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    Schedule,
    ArtistLink,
}

impl fmt::Display for WriteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStep::Schedule => write!(f, "schedule"),
            WriteStep::ArtistLink => write!(f, "artist link"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Concert lookup failed: {0}")]
    Resolution(String),

    #[error("Upload of {filename} failed: {message}")]
    Upload { filename: String, message: String },

    #[error(
        "Concert {concert_id} was created but its {failed_step} could not be saved \
         ({schedules_written} schedule rows written, compensated: {compensated}): {message}"
    )]
    PartialWrite {
        concert_id: uuid::Uuid,
        schedules_written: usize,
        failed_step: WriteStep,
        compensated: bool,
        message: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(FieldErrors::single(field, message))
    }

    /// Wrap a store failure raised while searching or creating catalog rows.
    pub fn resolution(err: AppError) -> Self {
        match err {
            AppError::Resolution(_) | AppError::Validation(_) | AppError::Unauthorized(_) => err,
            other => AppError::Resolution(other.to_string()),
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.into())
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, LogLevel) {
    match err {
        AppError::Database(_) => ("DATABASE_ERROR", true, LogLevel::Error),
        AppError::Validation(_) => ("VALIDATION_FAILED", true, LogLevel::Debug),
        AppError::Resolution(_) => ("RESOLUTION_FAILED", true, LogLevel::Warn),
        AppError::Upload { .. } => ("UPLOAD_FAILED", true, LogLevel::Warn),
        AppError::PartialWrite { .. } => ("PARTIAL_WRITE", false, LogLevel::Error),
        AppError::Storage(_) => ("STORAGE_ERROR", true, LogLevel::Error),
        AppError::NotFound(_) => ("NOT_FOUND", false, LogLevel::Debug),
        AppError::Unauthorized(_) => ("UNAUTHORIZED", false, LogLevel::Debug),
        AppError::Conflict(_) => ("SUBMISSION_IN_FLIGHT", true, LogLevel::Debug),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            ("INTERNAL_ERROR", true, LogLevel::Error)
        }
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(fields) => fields.to_string(),
            AppError::Resolution(_) => {
                "Could not reach the concert catalog. Please try again.".to_string()
            }
            AppError::Upload { filename, .. } => {
                format!("{} could not be uploaded and was left out.", filename)
            }
            AppError::PartialWrite { .. } => {
                "The concert could not be registered completely. Please register it again."
                    .to_string()
            }
            AppError::NotFound(what) => format!("{} was not found.", what),
            AppError::Unauthorized(_) => "Please sign in to continue.".to_string(),
            AppError::Conflict(_) => "Your submission is already being processed.".to_string(),
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Internal(_)
            | AppError::InternalWithSource { .. } => "The operation failed.".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).2
    }
}

/// Log an error at the level its metadata asks for.
pub fn log_error(error: &AppError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, error_code = code, "Error occurred"),
        LogLevel::Warn => tracing::warn!(error = %error, error_code = code, "Error occurred"),
        LogLevel::Error => tracing::error!(error = %error, error_code = code, "Error occurred"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_keep_first_message() {
        let mut errors = FieldErrors::new();
        errors.add("title", "required");
        errors.add("title", "too long");
        assert_eq!(errors.get("title"), Some("required"));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn empty_field_errors_pass() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn resolution_wraps_store_failures() {
        let err = AppError::resolution(AppError::Internal("connection reset".into()));
        assert!(matches!(err, AppError::Resolution(ref m) if m.contains("connection reset")));
        assert_eq!(err.error_code(), "RESOLUTION_FAILED");
        assert!(err.is_recoverable());
    }

    #[test]
    fn resolution_keeps_validation_errors() {
        let err = AppError::resolution(AppError::validation("artist", "Select an artist"));
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn upload_failures_read_as_a_dropped_image() {
        let err = AppError::Upload {
            filename: "stage.jpg".into(),
            message: "connection reset".into(),
        };
        assert_eq!(err.error_code(), "UPLOAD_FAILED");
        assert_eq!(err.log_level(), LogLevel::Warn);
        assert_eq!(
            err.client_message(),
            "stage.jpg could not be uploaded and was left out."
        );
    }

    #[test]
    fn partial_write_is_not_recoverable() {
        let err = AppError::PartialWrite {
            concert_id: uuid::Uuid::new_v4(),
            schedules_written: 0,
            failed_step: WriteStep::Schedule,
            compensated: true,
            message: "insert failed".into(),
        };
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Error);
        assert!(err.to_string().contains("schedule"));
    }
}
