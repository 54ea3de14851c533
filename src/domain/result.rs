//! Result type alias for Shelfport

use super::errors::ShelfportError;

/// Result type alias for Shelfport operations
///
/// # Examples
///
/// ```
/// use shelfport::domain::result::Result;
/// use shelfport::domain::errors::ShelfportError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(ShelfportError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ShelfportError>;
