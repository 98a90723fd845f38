//! Route modules.
//!
//! Routes are contributed as [`RouteModule`]s, each tagged with how it is
//! attached:
//!
//! - [`RouteKind::Mount`]: a ready-made `Router`, nested at the module's path.
//! - [`RouteKind::Register`]: a function given the service handle, free to
//!   add routes or middleware itself.
//!
//! Modules belong to a group. The `routing` stage walks the groups listed in
//! `dirnames.routes`, in that order, and within a group loads modules sorted
//! by path so `/` comes first. When two modules of a group map to the same
//! path, the one added last wins. Paths must not collide across groups:
//! axum rejects overlapping routes.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use tracing::{debug, info, warn};

use jackstack_plugin::prelude::*;

/// A function that registers routes on the service handle.
pub type RegisterFn = Arc<dyn Fn(&mut ServiceHandle) -> AppResult<()> + Send + Sync>;

/// How a route module attaches to the service.
#[derive(Clone)]
pub enum RouteKind {
    /// Nest this router at the module path.
    Mount(Router),
    /// Call this function with the service handle.
    Register(RegisterFn),
}

impl std::fmt::Debug for RouteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mount(_) => f.write_str("Mount(<router>)"),
            Self::Register(_) => f.write_str("Register(<fn>)"),
        }
    }
}

/// One unit of routes.
#[derive(Debug, Clone)]
pub struct RouteModule {
    /// Group the module belongs to.
    pub group: String,
    /// Module name relative to its group, such as `users/index`.
    pub source: String,
    pub kind: RouteKind,
}

impl RouteModule {
    /// A router mounted at the path derived from `source`.
    pub fn mount(source: impl Into<String>, router: Router) -> Self {
        Self {
            group: DEFAULT_GROUP.to_string(),
            source: source.into(),
            kind: RouteKind::Mount(router),
        }
    }

    /// A registration function run during the `routing` stage.
    pub fn register<F>(source: impl Into<String>, register: F) -> Self
    where
        F: Fn(&mut ServiceHandle) -> AppResult<()> + Send + Sync + 'static,
    {
        Self {
            group: DEFAULT_GROUP.to_string(),
            source: source.into(),
            kind: RouteKind::Register(Arc::new(register)),
        }
    }

    /// Moves the module to `group`.
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// The path this module is mounted at.
    pub fn path(&self) -> String {
        route_path(&self.source)
    }
}

/// Group modules land in unless moved with [`RouteModule::in_group`].
pub const DEFAULT_GROUP: &str = "routes";

/// Maps a module name to its mount path.
///
/// A trailing `index` names the directory itself:
/// `index` → `/`, `users/index` → `/users/`, `users/show` → `/users/show`.
pub fn route_path(source: &str) -> String {
    let trimmed = source.trim_start_matches('/');
    let trimmed = trimmed.strip_suffix("index").unwrap_or(trimmed);
    format!("/{trimmed}")
}

/// Route modules waiting for the `routing` stage.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    modules: Vec<RouteModule>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module.
    pub fn add(&mut self, module: RouteModule) -> &mut Self {
        self.modules.push(module);
        self
    }

    /// Builder form of [`RouteTable::add`].
    pub fn with(mut self, module: RouteModule) -> Self {
        self.modules.push(module);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// `routing` stage handler for `table`.
pub fn stage(
    table: RouteTable,
) -> impl Fn(&mut Stack) -> AppResult<Option<Deferred>> + Send + Sync {
    move |stack: &mut Stack| {
        let groups = stack.config().dirnames.routes.clone();
        mount_routes(stack.app_mut(), &groups, &table)?;
        Ok(None)
    }
}

/// Attaches the modules of `groups`, in group order.
pub fn mount_routes(
    app: &mut ServiceHandle,
    groups: &[String],
    table: &RouteTable,
) -> AppResult<()> {
    for module in &table.modules {
        if !groups.contains(&module.group) {
            warn!(
                group = %module.group,
                source = %module.source,
                "Route group not listed in dirnames.routes, module not loaded"
            );
        }
    }

    for group in groups {
        let mut by_path: BTreeMap<String, &RouteModule> = BTreeMap::new();
        for module in table.modules.iter().filter(|m| &m.group == group) {
            by_path.insert(module.path(), module);
        }

        for (path, module) in by_path {
            debug!(group = %group, path = %path, source = %module.source, "Loading route module");
            match &module.kind {
                RouteKind::Mount(router) => app.mount(&path, router.clone()),
                RouteKind::Register(register) => register(app)?,
            }
        }

        info!(group = %group, "Routes loaded");
    }

    Ok(())
}
