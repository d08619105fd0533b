//! Application result alias.

use crate::error::AppError;

/// Result alias used across the entire application.
pub type AppResult<T> = Result<T, AppError>;
