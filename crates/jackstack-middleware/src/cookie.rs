//! Signed cookies.
//!
//! The `cookie` stage derives a signing key from `cookie.secret` and makes
//! it available to every request. Handlers read and write signed cookies
//! through the [`SignedCookies`] extractor; a cookie whose signature does
//! not verify is treated as absent.

use axum::Extension;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use sha2::{Digest, Sha512};
use tracing::info;

use jackstack_plugin::prelude::*;

/// Key every signed cookie is checked against.
#[derive(Clone)]
pub struct CookieKey(pub Key);

impl std::fmt::Debug for CookieKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CookieKey(..)")
    }
}

/// Derives a signing key from a secret of any length.
pub fn signing_key(secret: &str) -> AppResult<Key> {
    if secret.is_empty() {
        return Err(AppError::configuration("Cookie secret must not be empty"));
    }

    let digest = Sha512::digest(secret.as_bytes());
    Key::try_from(digest.as_slice())
        .map_err(|e| AppError::configuration(format!("Invalid cookie key: {e}")))
}

/// `cookie` stage handler.
pub fn stage(stack: &mut Stack) -> AppResult<Option<Deferred>> {
    let key = CookieKey(signing_key(&stack.config().cookie.secret)?);
    info!("Signed cookies enabled");

    stack
        .app_mut()
        .use_layer(move |router| router.layer(Extension(key)));
    Ok(None)
}

/// The request's signed cookies. Return it from a handler to set cookies.
#[derive(Debug, Clone)]
pub struct SignedCookies(pub SignedCookieJar);

impl<S> FromRequestParts<S> for SignedCookies
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(CookieKey(key)) = parts.extensions.get::<CookieKey>().cloned() else {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Signed cookies are not enabled",
            ));
        };
        Ok(Self(SignedCookieJar::from_headers(&parts.headers, key)))
    }
}
