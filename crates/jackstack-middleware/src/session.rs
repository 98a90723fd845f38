//! Server-side sessions keyed by a signed cookie.
//!
//! The `session` stage reads the session cookie named by `session.name`,
//! signed with `session.secret`, and loads the session it points to from a
//! [`SessionStore`]. Handlers use the [`Session`] extractor. A session is only
//! saved, and its cookie only set, once a handler writes to it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{FromRequestParts, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, Key, SignedCookieJar};
use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use jackstack_plugin::prelude::*;

use crate::cookie::signing_key;

/// Session values, keyed by name.
pub type SessionData = Map<String, Value>;

/// Where session data lives between requests.
pub trait SessionStore: Send + Sync + 'static {
    fn load(&self, id: &str) -> Option<SessionData>;
    fn save(&self, id: &str, data: SessionData);
    fn remove(&self, id: &str);
}

/// Process-local store. Sessions are lost on restart and never expire.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: DashMap<String, SessionData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, id: &str) -> Option<SessionData> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    fn save(&self, id: &str, data: SessionData) {
        self.sessions.insert(id.to_string(), data);
    }

    fn remove(&self, id: &str) {
        self.sessions.remove(id);
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    id: Option<String>,
    data: SessionData,
    modified: bool,
    destroyed: bool,
}

/// The current request's session.
#[derive(Debug, Clone, Default)]
pub struct Session(Arc<Mutex<SessionInner>>);

impl Session {
    fn loaded(id: String, data: SessionData) -> Self {
        Self(Arc::new(Mutex::new(SessionInner {
            id: Some(id),
            data,
            ..Default::default()
        })))
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Session id, once the session has been saved.
    pub fn id(&self) -> Option<String> {
        self.lock().id.clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().data.get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        let mut inner = self.lock();
        inner.data.insert(key.into(), value);
        inner.modified = true;
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut inner = self.lock();
        let removed = inner.data.remove(key);
        inner.modified |= removed.is_some();
        removed
    }

    /// Drops the session from the store and clears its cookie.
    pub fn destroy(&self) {
        let mut inner = self.lock();
        inner.data.clear();
        inner.destroyed = true;
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Sessions are not enabled",
        ))
    }
}

/// What the session middleware needs per request.
#[derive(Clone)]
pub struct SessionLayerState {
    name: Arc<str>,
    key: Key,
    store: Arc<dyn SessionStore>,
}

/// `session` stage handler backed by a [`MemoryStore`].
pub fn stage(stack: &mut Stack) -> AppResult<Option<Deferred>> {
    warn!("Using the in-memory session store; sessions do not survive restarts");
    install(stack, Arc::new(MemoryStore::new()))
}

/// `session` stage handler backed by `store`.
pub fn stage_with_store(
    store: Arc<dyn SessionStore>,
) -> impl Fn(&mut Stack) -> AppResult<Option<Deferred>> + Send + Sync + 'static {
    move |stack: &mut Stack| install(stack, Arc::clone(&store))
}

fn install(stack: &mut Stack, store: Arc<dyn SessionStore>) -> AppResult<Option<Deferred>> {
    let config = &stack.config().session;
    if config.name.is_empty() {
        return Err(AppError::configuration("Session cookie name must not be empty"));
    }

    let state = SessionLayerState {
        name: Arc::from(config.name.as_str()),
        key: signing_key(&config.secret)?,
        store,
    };
    info!(cookie = %state.name, "Sessions enabled");

    stack.app_mut().use_layer(move |router| {
        router.layer(middleware::from_fn_with_state(state, load_session))
    });
    Ok(None)
}

/// Attaches the session to the request and persists it afterwards.
pub async fn load_session(
    State(state): State<SessionLayerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = SignedCookieJar::from_headers(request.headers(), state.key.clone());
    let session = jar
        .get(&state.name)
        .and_then(|cookie| {
            let id = cookie.value().to_string();
            state.store.load(&id).map(|data| Session::loaded(id, data))
        })
        .unwrap_or_default();

    request.extensions_mut().insert(session.clone());
    let response = next.run(request).await;

    let jar = {
        let mut inner = session.lock();
        if inner.destroyed {
            if let Some(id) = inner.id.take() {
                debug!(session = %id, "Session destroyed");
                state.store.remove(&id);
            }
            Some(jar.remove(Cookie::build((state.name.to_string(), "")).path("/")))
        } else if inner.modified {
            let is_new = inner.id.is_none();
            let id = inner
                .id
                .get_or_insert_with(|| Uuid::new_v4().to_string())
                .clone();
            state.store.save(&id, inner.data.clone());
            is_new.then(|| {
                debug!(session = %id, "Session created");
                jar.add(
                    Cookie::build((state.name.to_string(), id))
                        .path("/")
                        .http_only(true),
                )
            })
        } else {
            None
        }
    };

    match jar {
        Some(jar) => (jar, response).into_response(),
        None => response,
    }
}
