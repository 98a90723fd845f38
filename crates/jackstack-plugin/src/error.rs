//! Registration and resolution errors.
//!
//! These surface synchronously at the call site that caused them. Boot
//! operations convert them into `AppError` through the `From` impl below.

use jackstack_core::error::{AppError, ErrorKind};
use thiserror::Error;

/// Errors raised while registering plugins and hooks or ordering plugins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// A plugin with this name is already registered.
    #[error("Duplicate plugin definition: {0}")]
    DuplicateName(String),

    /// The plugin name collides with a reserved word.
    #[error("Plugin name reserved: {0}")]
    ReservedName(String),

    /// The plugin descriptor itself is unusable.
    #[error("Invalid plugin: {0}")]
    InvalidPlugin(String),

    /// A before/after hook was registered without a label.
    #[error("No label provided for hook on '{0}'")]
    MissingLabel(String),

    /// A hook's label names the stage it is attached to.
    #[error("Hook '{0}' would run inside its own stage")]
    SelfReferencingHook(String),

    /// An event name could not be parsed into a hook point.
    #[error("Unknown event name: '{0}'")]
    InvalidEvent(String),

    /// An enabled plugin depends on a name that is not enabled.
    #[error("Unfulfilled dependency: {0}")]
    UnfulfilledDependency(String),

    /// The enabled plugins depend on each other in a loop.
    #[error("Dependency cycle between plugins: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
}

impl StackError {
    /// Returns whether this error comes from ordering rather than registration.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::UnfulfilledDependency(_) | Self::DependencyCycle(_)
        )
    }
}

impl From<StackError> for AppError {
    fn from(err: StackError) -> Self {
        let kind = if err.is_resolution_error() {
            ErrorKind::Resolution
        } else {
            ErrorKind::Registration
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_errors_map_to_resolution_kind() {
        let err: AppError = StackError::UnfulfilledDependency("Z".to_string()).into();
        assert_eq!(err.kind, ErrorKind::Resolution);
        assert_eq!(err.message, "Unfulfilled dependency: Z");

        let source = err
            .source
            .as_ref()
            .and_then(|s| s.downcast_ref::<StackError>());
        assert_eq!(
            source,
            Some(&StackError::UnfulfilledDependency("Z".to_string()))
        );
    }

    #[test]
    fn test_registration_errors_map_to_registration_kind() {
        let err: AppError = StackError::DuplicateName("cookie".to_string()).into();
        assert_eq!(err.kind, ErrorKind::Registration);
    }

    #[test]
    fn test_cycle_message_lists_plugins() {
        let err = StackError::DependencyCycle(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "Dependency cycle between plugins: a, b");
    }
}
