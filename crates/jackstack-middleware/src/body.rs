//! Request body size limit.

use axum::extract::DefaultBodyLimit;
use tracing::info;

use jackstack_plugin::prelude::*;

/// `body-parsing` stage handler.
///
/// Bounds the bodies that `Json`, `Form` and `Bytes` extractors read in the
/// routes mounted after this stage.
pub fn stage(stack: &mut Stack) -> AppResult<Option<Deferred>> {
    let limit = stack.config().body_parser.limit_bytes;
    info!(limit_bytes = limit, "Request body limit");

    stack
        .app_mut()
        .use_layer(move |router| router.layer(DefaultBodyLimit::max(limit)));
    Ok(None)
}
