//! # jackstack-core
//!
//! Core crate for jackstack. Contains the unified error system and the
//! configuration schema that stage handlers read and hooks may override
//! before the stack boots.
//!
//! This crate has **no** internal dependencies on other jackstack crates.

pub mod config;
pub mod error;
pub mod result;

pub use config::StackConfig;
pub use error::{AppError, ErrorKind};
pub use result::AppResult;
