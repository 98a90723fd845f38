//! The boot context.
//!
//! A [`Stack`] owns everything a boot run mutates: configuration, the
//! service handle, the plugin and hook registries, stage handlers, the
//! deferred gate and the sequencer state. It is driven from a single task;
//! every stage, hook and plugin initializer receives it as `&mut Stack`.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::net::TcpListener;
use uuid::Uuid;

use jackstack_core::config::StackConfig;
use jackstack_core::error::AppError;
use jackstack_core::result::AppResult;

use crate::error::StackError;
use crate::gate::{Deferred, DeferredGate};
use crate::hooks::definitions::{Stage, StageEvent};
use crate::hooks::registry::HookRegistry;
use crate::orchestrator::StageRecord;
use crate::registry::{Plugin, PluginRegistry};
use crate::sequencer::{BootState, ServerHandle};
use crate::service::ServiceHandle;

/// The body of a built-in stage. May hand back work for the gate.
pub type StageHandler = Arc<dyn Fn(&mut Stack) -> AppResult<Option<Deferred>> + Send + Sync>;

/// A hook point subscriber.
pub type Subscriber = Arc<dyn Fn(&mut Stack, &StageEvent) -> AppResult<()> + Send + Sync>;

/// Boot context shared by every stage.
pub struct Stack {
    /// Identifies this boot run in logs.
    pub(crate) boot_id: Uuid,
    /// Live configuration.
    pub(crate) config: StackConfig,
    /// Routes and middleware under construction.
    pub(crate) app: ServiceHandle,
    /// Registered plugins.
    pub(crate) plugins: PluginRegistry,
    /// Hook subscribers.
    pub(crate) hooks: HookRegistry,
    /// Handlers for the built-in stages.
    pub(crate) stage_handlers: HashMap<Stage, StageHandler>,
    /// Work the listener waits for.
    pub(crate) gate: DeferredGate,
    /// Number of stages started so far.
    pub(crate) stage_counter: u32,
    /// Every stage started, in order.
    pub(crate) history: Vec<StageRecord>,
    /// Stages currently running, outermost first.
    pub(crate) active: Vec<Stage>,
    /// Sequencer state.
    pub(crate) state: BootState,
    /// Listener supplied by the caller instead of binding one.
    pub(crate) listener: Option<TcpListener>,
    /// The running server, once started.
    pub(crate) server: Option<ServerHandle>,
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("boot_id", &self.boot_id)
            .field("state", &self.state)
            .field("stage_counter", &self.stage_counter)
            .field("plugins", &self.plugins)
            .field("hooks", &self.hooks)
            .field("pending_deferred", &self.gate.pending())
            .finish_non_exhaustive()
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new(StackConfig::default())
    }
}

impl Stack {
    /// Creates an uninitialized stack.
    pub fn new(config: StackConfig) -> Self {
        Self {
            boot_id: Uuid::new_v4(),
            config,
            app: ServiceHandle::new(),
            plugins: PluginRegistry::new(),
            hooks: HookRegistry::new(),
            stage_handlers: HashMap::new(),
            gate: DeferredGate::new(),
            stage_counter: 0,
            history: Vec::new(),
            active: Vec::new(),
            state: BootState::Uninitialized,
            listener: None,
            server: None,
        }
    }

    pub fn boot_id(&self) -> Uuid {
        self.boot_id
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut StackConfig {
        &mut self.config
    }

    /// Shallow-merges `partial` into the configuration.
    pub fn assign(&mut self, partial: Value) -> AppResult<()> {
        self.config.assign(partial)
    }

    pub fn app(&self) -> &ServiceHandle {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut ServiceHandle {
        &mut self.app
    }

    /// Registers a plugin. See [`PluginRegistry::register`].
    pub fn register(&mut self, plugin: Plugin) -> Result<(), StackError> {
        self.plugins.register(plugin)
    }

    pub fn enable(&mut self, name: &str) {
        self.plugins.enable(name);
    }

    pub fn disable(&mut self, name: &str) {
        self.plugins.disable(name);
    }

    /// Applies `plugins.toggles` from the configuration.
    pub fn apply_toggles(&mut self) {
        let toggles = self.config.plugins.toggles.clone();
        self.plugins.apply_toggles(toggles);
    }

    pub fn plugin(&self, name: &str) -> Option<&Plugin> {
        self.plugins.get(name)
    }

    pub fn plugin_mut(&mut self, name: &str) -> Option<&mut Plugin> {
        self.plugins.get_mut(name)
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Installs the handler a built-in stage runs. Replaces any earlier one.
    pub fn set_stage_handler<F>(&mut self, stage: Stage, handler: F) -> AppResult<()>
    where
        F: Fn(&mut Stack) -> AppResult<Option<Deferred>> + Send + Sync + 'static,
    {
        if !stage.is_builtin() {
            return Err(AppError::stage(format!(
                "'{stage}' is not a built-in stage"
            )));
        }
        self.stage_handlers.insert(stage, Arc::new(handler));
        Ok(())
    }

    /// Returns whether a built-in stage has a handler installed.
    pub fn has_stage_handler(&self, stage: &Stage) -> bool {
        self.stage_handlers.contains_key(stage)
    }

    /// Adds work the listener must wait for.
    pub fn register_deferred(&mut self, deferred: Deferred) {
        self.gate.register(deferred);
    }

    pub fn pending_deferred(&self) -> usize {
        self.gate.pending()
    }

    pub fn stage_counter(&self) -> u32 {
        self.stage_counter
    }

    /// Stages started so far, in order.
    pub fn history(&self) -> &[StageRecord] {
        &self.history
    }

    pub fn state(&self) -> &BootState {
        &self.state
    }

    /// Serves on `listener` instead of binding `server.host:server.port`.
    pub fn set_listener(&mut self, listener: TcpListener) {
        self.listener = Some(listener);
    }
}
