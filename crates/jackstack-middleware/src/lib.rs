//! # jackstack-middleware
//!
//! Framework handlers for the built-in boot stages, plus the route module
//! interface and the health plugin.
//!
//! | Stage | Handler |
//! |-------|---------|
//! | `cookie` | [`cookie`] |
//! | `session` | [`session`] |
//! | `static` | [`static_files`] |
//! | `logging` | [`logging`] |
//! | `experiments` | [`experiments`] |
//! | `body-parsing` | [`body`] |
//! | `override` | [`method_override`] |
//! | `compression` | [`compression`] |
//! | `routing` | [`routing`] |
//!
//! `config` and `end` have no handler; they exist for hooks to attach to.

pub mod body;
pub mod compression;
pub mod cookie;
pub mod experiments;
pub mod health;
pub mod logging;
pub mod method_override;
pub mod routing;
pub mod session;
pub mod static_files;

pub use cookie::SignedCookies;
pub use experiments::Experiments;
pub use routing::{RouteKind, RouteModule, RouteTable};
pub use session::{MemoryStore, Session, SessionStore};

use jackstack_plugin::prelude::*;

/// Installs every framework stage handler on `stack`.
pub fn install(stack: &mut Stack, routes: RouteTable) -> AppResult<()> {
    stack.set_stage_handler(Stage::Cookie, cookie::stage)?;
    stack.set_stage_handler(Stage::Session, session::stage)?;
    stack.set_stage_handler(Stage::Static, static_files::stage)?;
    stack.set_stage_handler(Stage::Logging, logging::stage)?;
    stack.set_stage_handler(Stage::Experiments, experiments::stage)?;
    stack.set_stage_handler(Stage::BodyParsing, body::stage)?;
    stack.set_stage_handler(Stage::Override, method_override::stage)?;
    stack.set_stage_handler(Stage::Compression, compression::stage)?;
    stack.set_stage_handler(Stage::Routing, routing::stage(routes))?;
    Ok(())
}
