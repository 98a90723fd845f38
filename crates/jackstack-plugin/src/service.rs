//! The live service handle stages build up before the listener opens.

use axum::Router;

/// A middleware step applied when the router is assembled.
type LayerFn = Box<dyn FnOnce(Router) -> Router + Send>;

/// Routes and middleware accumulated during boot.
///
/// Middleware is recorded in registration order and applied when the router
/// is assembled, so a layer added by an early stage still wraps routes that a
/// later stage mounts. The first registered layer is the outermost.
#[derive(Default)]
pub struct ServiceHandle {
    /// Routes mounted so far.
    routes: Router,
    /// Middleware in registration order.
    layers: Vec<LayerFn>,
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("routes", &self.routes)
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl ServiceHandle {
    /// Creates an empty service handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records middleware; `wrap` receives everything registered after it.
    pub fn use_layer<F>(&mut self, wrap: F)
    where
        F: FnOnce(Router) -> Router + Send + 'static,
    {
        self.layers.push(Box::new(wrap));
    }

    /// Transforms the route table in place.
    pub fn map_routes<F>(&mut self, f: F)
    where
        F: FnOnce(Router) -> Router,
    {
        let routes = std::mem::take(&mut self.routes);
        self.routes = f(routes);
    }

    /// Merges a router's routes into the route table.
    pub fn merge(&mut self, router: Router) {
        self.map_routes(|routes| routes.merge(router));
    }

    /// Mounts a router under `path`. The root path merges instead.
    pub fn mount(&mut self, path: &str, router: Router) {
        let prefix = path.trim_end_matches('/');
        if prefix.is_empty() {
            self.merge(router);
        } else if prefix.starts_with('/') {
            self.map_routes(|routes| routes.nest(prefix, router));
        } else {
            let prefix = format!("/{prefix}");
            self.map_routes(|routes| routes.nest(&prefix, router));
        }
    }

    /// Number of middleware steps recorded.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Assembles the router, leaving this handle empty.
    pub fn build(&mut self) -> Router {
        let mut router = std::mem::take(&mut self.routes);
        for wrap in std::mem::take(&mut self.layers).into_iter().rev() {
            router = wrap(router);
        }
        router
    }
}
