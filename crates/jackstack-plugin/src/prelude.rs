//! Convenience re-exports for plugin authors.

pub use crate::error::StackError;
pub use crate::gate::Deferred;
pub use crate::hooks::definitions::{HookPoint, Stage, StageEvent};
pub use crate::registry::Plugin;
pub use crate::service::ServiceHandle;
pub use crate::stack::Stack;

pub use jackstack_core::config::StackConfig;
pub use jackstack_core::error::{AppError, ErrorKind};
pub use jackstack_core::result::AppResult;
