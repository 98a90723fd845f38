//! Hook dispatcher: delivers an event to its subscribers synchronously.
//!
//! - Subscribers run in registration order on the caller's thread.
//! - The subscriber list is snapshotted first, so a subscriber registered
//!   while an event is being delivered only sees later deliveries.
//! - The first failing subscriber aborts delivery and its error propagates to
//!   the publisher unchanged; there is no isolation between subscribers.

use tracing::{debug, error};

use jackstack_core::result::AppResult;

use super::definitions::{HookPoint, StageEvent};
use super::registry::EventModule;
use crate::stack::Stack;

impl Stack {
    /// Delivers `event` to every subscriber of `event.point`.
    pub fn publish(&mut self, event: &StageEvent) -> AppResult<()> {
        let handlers = self.hooks.get_handlers(&event.point);

        if handlers.is_empty() {
            return Ok(());
        }

        debug!(
            hook = %event.point,
            stage = %event.stage,
            handler_count = handlers.len(),
            "Dispatching hook"
        );

        for handler in &handlers {
            if let Err(err) = handler(self, event) {
                error!(
                    hook = %event.point,
                    stage = %event.stage,
                    error = %err,
                    "Hook subscriber failed"
                );
                return Err(err);
            }
        }

        Ok(())
    }

    /// Registers a subscriber for a hook point.
    pub fn subscribe<F>(&mut self, point: HookPoint, handler: F)
    where
        F: Fn(&mut Stack, &StageEvent) -> AppResult<()> + Send + Sync + 'static,
    {
        self.hooks.subscribe(point, std::sync::Arc::new(handler));
    }

    /// Registers a batch of `{ point, handler }` pairs in order.
    pub fn use_modules(&mut self, modules: impl IntoIterator<Item = EventModule>) {
        for module in modules {
            self.hooks.subscribe(module.point, module.handler);
        }
    }
}
