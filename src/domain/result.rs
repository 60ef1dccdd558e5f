//! Result type alias for deident

use super::errors::DeidError;

/// Result type alias for batch-level operations
///
/// # Examples
///
/// ```
/// use deident::domain::result::Result;
/// use deident::domain::errors::DeidError;
///
/// fn failing_function() -> Result<()> {
///     Err(DeidError::Validation("Invalid input".to_string()))
/// }
/// assert!(failing_function().is_err());
/// ```
pub type Result<T> = std::result::Result<T, DeidError>;
