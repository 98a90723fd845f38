//! Response compression.

use tower_http::compression::CompressionLayer;
use tracing::info;

use jackstack_plugin::prelude::*;

/// `compression` stage handler.
pub fn stage(stack: &mut Stack) -> AppResult<Option<Deferred>> {
    if !stack.config().compression.enabled {
        info!("Response compression disabled");
        return Ok(None);
    }

    stack
        .app_mut()
        .use_layer(|router| router.layer(CompressionLayer::new()));
    Ok(None)
}
