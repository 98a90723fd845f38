//! Request access logging.

use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderName;
use axum::http::header::{REFERER, USER_AGENT};
use axum::middleware::{self, Next};
use axum::response::Response;
use tower_http::trace::TraceLayer;
use tracing::info;

use jackstack_core::config::logging::AccessLog;
use jackstack_plugin::prelude::*;

/// `logging` stage handler.
pub fn stage(stack: &mut Stack) -> AppResult<Option<Deferred>> {
    let access = stack.config().logging.access;
    info!(?access, "Access logging");

    match access {
        AccessLog::Off => {}
        AccessLog::Dev => stack
            .app_mut()
            .use_layer(|router| router.layer(TraceLayer::new_for_http())),
        AccessLog::Combined => stack
            .app_mut()
            .use_layer(|router| router.layer(middleware::from_fn(access_log))),
    }

    Ok(None)
}

/// Logs one line per request with client details, status and duration.
pub async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();
    let (user_agent, referer) = {
        let header = |name: HeaderName| {
            request
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-")
                .to_string()
        };
        (header(USER_AGENT), header(REFERER))
    };
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %uri,
        version = ?version,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        referer = %referer,
        user_agent = %user_agent,
        "HTTP request"
    );

    response
}
