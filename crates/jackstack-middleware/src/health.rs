//! Health endpoint plugin.
//!
//! Mounts `GET <path>` (default `/health`) once routing has run. Disable it
//! with the toggle `!health` or the plugin configuration `{"disabled": true}`.

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use jackstack_plugin::prelude::*;

/// Plugin name.
pub const NAME: &str = "health";

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub boot_id: Uuid,
}

/// The health plugin.
pub fn plugin() -> Plugin {
    Plugin::new(NAME, |stack, config| {
        let path = config
            .get("path")
            .and_then(|path| path.as_str())
            .unwrap_or("/health")
            .to_string();

        stack.use_after(Stage::Routing, NAME, move |stack| {
            let body = HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                boot_id: stack.boot_id(),
            };
            stack.app_mut().merge(
                Router::new().route(&path, get(move || async move { Json(body) })),
            );
            Ok(None)
        })?;
        Ok(())
    })
    .with_config(json!({ "path": "/health" }))
}
