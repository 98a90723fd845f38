//! Convenience result type alias for jackstack.

use crate::error::AppError;

/// A specialized `Result` type for boot operations.
///
/// Every crate returns `AppResult<T>` at its public boundary so errors from
/// registration, stage handlers and deferred work flow through `?` unchanged.
pub type AppResult<T> = Result<T, AppError>;
