//! Logging and observability
//!
//! Console output plus an optional rotating JSON file. Per-record events use
//! the [`RECORD_TARGET`] target so the two outputs can filter them apart.
//!
//! # Example
//!
//! ```no_run
//! use deident::logging::init_logging;
//! use deident::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard, RECORD_TARGET};

/// Log a record that was skipped
///
/// # Example
///
/// ```no_run
/// use deident::log_record_skipped;
/// use deident::domain::RecordError;
///
/// let reason = RecordError::MissingStudyIdentifier { tag: "StudyDescription".to_string() };
/// log_record_skipped!("scan/0001.json", &reason);
/// ```
#[macro_export]
macro_rules! log_record_skipped {
    ($origin:expr, $reason:expr) => {
        tracing::warn!(
            target: $crate::logging::RECORD_TARGET,
            origin = %$origin,
            reason = $reason.label(),
            detail = %$reason,
            "Record skipped"
        );
    };
}

/// Log a field-local issue
///
/// # Example
///
/// ```no_run
/// use deident::log_field_issue;
/// use deident::domain::FieldError;
///
/// log_field_issue!("StudyTime", "offset", &FieldError::UnrecognizedTag);
/// ```
#[macro_export]
macro_rules! log_field_issue {
    ($path:expr, $action:expr, $error:expr) => {
        tracing::debug!(
            target: $crate::logging::RECORD_TARGET,
            field = %$path,
            action = %$action,
            issue = $error.label(),
            "Field issue"
        );
    };
}

/// Log batch progress
///
/// # Example
///
/// ```no_run
/// use deident::log_batch_progress;
///
/// log_batch_progress!(100, 3);
/// ```
#[macro_export]
macro_rules! log_batch_progress {
    ($processed:expr, $skipped:expr) => {
        tracing::info!(
            processed = $processed,
            skipped = $skipped,
            "Batch progress"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use deident::log_error_with_context;
/// use deident::domain::DeidError;
///
/// let error = DeidError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::{DeidError, FieldError, RecordError};

    #[test]
    fn test_macros_compile() {
        let reason = RecordError::InvalidInputRecord {
            reason: "bad json".to_string(),
        };
        log_record_skipped!("a.json", &reason);
        log_field_issue!("StudyTime", "offset", &FieldError::AlreadyDeletedParent);
        log_batch_progress!(1usize, 0usize);
        log_error_with_context!(&DeidError::Other("x".to_string()), "test");
    }
}
