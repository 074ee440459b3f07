//! Result type alias for Vellum

use super::errors::VellumError;

/// Result type alias for Vellum operations
///
/// # Examples
///
/// ```
/// use vellum::domain::result::Result;
/// use vellum::domain::errors::VellumError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(VellumError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, VellumError>;
