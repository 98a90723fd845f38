//! Hook system: typed stage definitions, subscriber registry, and dispatcher.

pub mod definitions;
pub mod dispatcher;
pub mod registry;

pub use definitions::{HookPoint, Phase, Stage, StageEvent};
pub use registry::{EventModule, HookRegistry};
