//! Static file serving.
//!
//! Each configured directory is tried in order for `GET` and `HEAD`
//! requests. The first directory that has the file answers; when none does,
//! the request continues to whatever was registered after this stage.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, info};

use jackstack_plugin::prelude::*;

/// Directories searched, in order.
#[derive(Debug, Clone)]
pub struct StaticDirs(Arc<[PathBuf]>);

impl StaticDirs {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self(dirs.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `static` stage handler.
pub fn stage(stack: &mut Stack) -> AppResult<Option<Deferred>> {
    let dirs = StaticDirs::new(stack.config().dirnames.static_dirs.iter());
    if dirs.is_empty() {
        return Ok(None);
    }

    info!(dirs = ?dirs.0, "Serving static files");
    stack.app_mut().use_layer(move |router| {
        router.layer(middleware::from_fn_with_state(dirs, serve_static))
    });
    Ok(None)
}

/// Answers from the first directory holding the requested file.
pub async fn serve_static(
    State(dirs): State<StaticDirs>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }

    for dir in dirs.0.iter() {
        if let Some(response) = serve_from(dir, probe(&request)).await {
            debug!(path = %request.uri().path(), dir = %dir.display(), "Static file hit");
            return response;
        }
    }

    next.run(request).await
}

/// Bodyless copy of `request` for one directory lookup.
fn probe(request: &Request) -> Request {
    let mut probe = Request::new(Body::empty());
    *probe.method_mut() = request.method().clone();
    *probe.uri_mut() = request.uri().clone();
    *probe.version_mut() = request.version();
    *probe.headers_mut() = request.headers().clone();
    probe
}

/// Serves `probe` from `dir`. `None` when the file is not there.
async fn serve_from(dir: &Path, probe: Request) -> Option<Response> {
    let response = match ServeDir::new(dir).oneshot(probe).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    match response.status() {
        StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => None,
        _ => Some(response.map(Body::new).into_response()),
    }
}
