//! # jackstack-plugin
//!
//! Boot engine for jackstack. Provides:
//!
//! - Plugin registry with enable/disable toggles and per-plugin configuration
//! - Dependency ordering of the enabled plugins
//! - Typed lifecycle stages with `before`/`after` hook points
//! - Stage orchestration (`wrap`) with hooks that run as their own stages
//! - A deferred-start gate that holds the listener until async work settles
//! - The boot sequencer driving Uninitialized -> Initializing -> Ready

pub mod error;
pub mod gate;
pub mod hooks;
pub mod orchestrator;
pub mod prelude;
pub mod registry;
pub mod resolver;
pub mod sequencer;
pub mod service;
pub mod stack;

pub use error::StackError;
pub use gate::{Deferred, DeferredGate};
pub use hooks::definitions::{HookPoint, Phase, Stage, StageEvent};
pub use hooks::registry::{EventModule, HookRegistry};
pub use orchestrator::StageRecord;
pub use registry::{Plugin, PluginRegistry};
pub use sequencer::BootState;
pub use service::ServiceHandle;
pub use stack::{Stack, StageHandler, Subscriber};
