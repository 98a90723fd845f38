//! HTTP method override for clients that can only send `GET` and `POST`.
//!
//! A `POST` carrying the override header is routed as the method the header
//! names. The rewrite happens before routing, so it wraps the whole router
//! rather than being a route layer.

use axum::Router;
use axum::extract::Request;
use axum::http::{HeaderName, Method};
use tower::ServiceExt;
use tracing::{debug, info};

use jackstack_plugin::prelude::*;

/// `override` stage handler.
pub fn stage(stack: &mut Stack) -> AppResult<Option<Deferred>> {
    let configured = &stack.config().method_override.header;
    let header = HeaderName::from_bytes(configured.as_bytes()).map_err(|e| {
        AppError::with_source(
            ErrorKind::Configuration,
            format!("Invalid method override header '{configured}'"),
            e,
        )
    })?;

    info!(header = %header, "Method override");
    stack
        .app_mut()
        .use_layer(move |router| with_method_override(router, header));
    Ok(None)
}

/// Wraps `router` so overridden methods are seen by its routes.
pub fn with_method_override(router: Router, header: HeaderName) -> Router {
    let rewrite = router.map_request(move |request: Request| rewrite_method(&header, request));
    Router::new().fallback_service(rewrite)
}

/// Applies the override header of a `POST` request.
///
/// Unknown or malformed method names leave the request untouched.
pub fn rewrite_method(header: &HeaderName, mut request: Request) -> Request {
    if request.method() != Method::POST {
        return request;
    }

    let overridden = request
        .headers()
        .get(header)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_uppercase())
        .and_then(|name| Method::from_bytes(name.as_bytes()).ok());

    if let Some(method) = overridden {
        debug!(from = %request.method(), to = %method, "Method overridden");
        *request.method_mut() = method;
    }

    request
}
