//! Settings read by the framework stage handlers.

use serde::{Deserialize, Serialize};

/// Cookie signing settings for the `cookie` stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Secret used to sign cookies.
    #[serde(default = "default_cookie_secret")]
    pub secret: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secret: default_cookie_secret(),
        }
    }
}

/// Session settings for the `session` stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the session cookie.
    #[serde(default = "default_session_name")]
    pub name: String,
    /// Secret used to sign the session cookie.
    #[serde(default = "default_session_secret")]
    pub secret: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: default_session_name(),
            secret: default_session_secret(),
        }
    }
}

/// Request body limits applied by the `body-parsing` stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyParserConfig {
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_body_limit")]
    pub limit_bytes: usize,
}

impl Default for BodyParserConfig {
    fn default() -> Self {
        Self {
            limit_bytes: default_body_limit(),
        }
    }
}

/// Method override settings for the `override` stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodOverrideConfig {
    /// Header carrying the method a `POST` should be treated as.
    #[serde(default = "default_override_header")]
    pub header: String,
}

impl Default for MethodOverrideConfig {
    fn default() -> Self {
        Self {
            header: default_override_header(),
        }
    }
}

/// Response compression settings for the `compression` stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Whether responses are compressed.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Directories consumed by the `static` and `routing` stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirnamesConfig {
    /// Directories served as static files, searched in order.
    #[serde(default = "default_static_dirs")]
    pub static_dirs: Vec<String>,
    /// Route groups mounted by the `routing` stage, in mount order.
    #[serde(default = "default_route_groups")]
    pub routes: Vec<String>,
}

impl Default for DirnamesConfig {
    fn default() -> Self {
        Self {
            static_dirs: default_static_dirs(),
            routes: default_route_groups(),
        }
    }
}

/// Feature experiment settings for the `experiments` stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentsConfig {
    /// Dashboard base URL the experiments are announced to.
    pub endpoint: String,
    /// Experiment names this service knows about.
    #[serde(default)]
    pub experiments: Vec<String>,
    /// Timeout for the announce request in seconds.
    #[serde(default = "default_announce_timeout")]
    pub timeout_seconds: u64,
}

fn default_cookie_secret() -> String {
    "change-me-cookie-secret".to_string()
}

fn default_session_name() -> String {
    "sessionID".to_string()
}

fn default_session_secret() -> String {
    "change-me-session-secret".to_string()
}

fn default_body_limit() -> usize {
    100 * 1024
}

fn default_override_header() -> String {
    "X-HTTP-Method-Override".to_string()
}

fn default_true() -> bool {
    true
}

fn default_static_dirs() -> Vec<String> {
    vec!["public".to_string()]
}

fn default_route_groups() -> Vec<String> {
    vec!["routes".to_string()]
}

fn default_announce_timeout() -> u64 {
    5
}
