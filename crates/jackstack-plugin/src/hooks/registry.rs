//! Hook registry: subscribers stored per hook point in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use jackstack_core::result::AppResult;

use super::definitions::{HookPoint, StageEvent};
use crate::error::StackError;
use crate::stack::{Stack, Subscriber};

/// Entry in the hook registry.
struct HookEntry {
    /// The subscriber.
    subscriber: Subscriber,
    /// Label of the sub-stage a before/after hook runs as.
    label: Option<String>,
}

/// Registry of subscribers organized by hook point.
///
/// There is no limit on subscribers per point and no removal; subscriptions
/// live as long as the stack.
#[derive(Default)]
pub struct HookRegistry {
    /// Hook point → subscribers in registration order.
    handlers: HashMap<HookPoint, Vec<HookEntry>>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<String, usize> = self
            .handlers
            .iter()
            .map(|(point, entries)| (point.to_string(), entries.len()))
            .collect();
        f.debug_struct("HookRegistry")
            .field("handlers", &counts)
            .finish()
    }
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber for a hook point.
    pub fn subscribe(&mut self, point: HookPoint, subscriber: Subscriber) {
        self.push(point, subscriber, None);
    }

    /// Registers a subscriber that runs as the labeled sub-stage.
    pub(crate) fn subscribe_labeled(
        &mut self,
        point: HookPoint,
        label: String,
        subscriber: Subscriber,
    ) {
        self.push(point, subscriber, Some(label));
    }

    fn push(&mut self, point: HookPoint, subscriber: Subscriber, label: Option<String>) {
        info!(
            hook = %point,
            label = label.as_deref().unwrap_or("-"),
            "Hook handler registered"
        );

        self.handlers
            .entry(point)
            .or_default()
            .push(HookEntry { subscriber, label });
    }

    /// Returns a snapshot of the subscribers for a hook point, in order.
    pub fn get_handlers(&self, point: &HookPoint) -> Vec<Subscriber> {
        self.handlers
            .get(point)
            .map(|entries| entries.iter().map(|e| Arc::clone(&e.subscriber)).collect())
            .unwrap_or_default()
    }

    /// Returns the labels of the hooks bound to a hook point, in order.
    pub fn labels(&self, point: &HookPoint) -> Vec<String> {
        self.handlers
            .get(point)
            .map(|entries| entries.iter().filter_map(|e| e.label.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns whether any subscribers are registered for a hook point.
    pub fn has_handlers(&self, point: &HookPoint) -> bool {
        self.handler_count(point) > 0
    }

    /// Returns the number of subscribers registered for a hook point.
    pub fn handler_count(&self, point: &HookPoint) -> usize {
        self.handlers.get(point).map(Vec::len).unwrap_or(0)
    }

    /// Returns all hook points that have subscribers.
    pub fn registered_hooks(&self) -> Vec<HookPoint> {
        self.handlers.keys().cloned().collect()
    }
}

/// A `{ point, handler }` pair registered in bulk with [`Stack::use_modules`].
pub struct EventModule {
    /// Hook point to bind to.
    pub point: HookPoint,
    /// Subscriber to bind.
    pub handler: Subscriber,
}

impl std::fmt::Debug for EventModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventModule")
            .field("point", &self.point)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl EventModule {
    /// Creates a module bound to a typed hook point.
    pub fn new<F>(point: HookPoint, handler: F) -> Self
    where
        F: Fn(&mut Stack, &StageEvent) -> AppResult<()> + Send + Sync + 'static,
    {
        Self {
            point,
            handler: Arc::new(handler),
        }
    }

    /// Creates a module from an event name such as `after.session`.
    pub fn parse<F>(event: &str, handler: F) -> Result<Self, StackError>
    where
        F: Fn(&mut Stack, &StageEvent) -> AppResult<()> + Send + Sync + 'static,
    {
        Ok(Self::new(event.parse()?, handler))
    }
}
