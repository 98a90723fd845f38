//! Stack configuration schema.
//!
//! The configuration is deserialized from TOML files via the `config` crate
//! and stays mutable until the stack boots: hooks subscribed to
//! `before.config` may override it with [`StackConfig::assign`].

pub mod logging;
pub mod middleware;
pub mod plugin;
pub mod server;

use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;
use self::middleware::{
    BodyParserConfig, CompressionConfig, CookieConfig, DirnamesConfig, ExperimentsConfig,
    MethodOverrideConfig, SessionConfig,
};
use self::plugin::PluginsConfig;
use self::server::ServerConfig;

use crate::error::AppError;

/// Root stack configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Listener settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Cookie settings.
    pub cookie: CookieConfig,
    /// Session settings.
    pub session: SessionConfig,
    /// Body parsing settings.
    pub body_parser: BodyParserConfig,
    /// Method override settings.
    pub method_override: MethodOverrideConfig,
    /// Compression settings.
    pub compression: CompressionConfig,
    /// Static and route directories.
    pub dirnames: DirnamesConfig,
    /// Feature experiments; `None` disables the experiments stage.
    pub experiments: Option<ExperimentsConfig>,
    /// Plugin toggles and ordering.
    pub plugins: PluginsConfig,
    /// Any other top-level key, kept for plugins to read.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StackConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the file at `path` with an environment-specific overlay
    /// (`config/{env}`) and environment variables prefixed with `JACKSTACK`.
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("JACKSTACK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Shallow-merges the top-level keys of `partial` over this configuration.
    ///
    /// Each key replaces the whole section it names, so
    /// `{"server": {"port": 8080}}` resets every other server field to its
    /// default. Unknown keys land in [`StackConfig::extra`].
    pub fn assign(&mut self, partial: serde_json::Value) -> Result<(), AppError> {
        let serde_json::Value::Object(overrides) = partial else {
            return Err(AppError::configuration(
                "Configuration overrides must be a JSON object",
            ));
        };

        let mut current = serde_json::to_value(&*self)?;
        if let Some(map) = current.as_object_mut() {
            for (key, value) in overrides {
                map.insert(key, value);
            }
        }

        *self = serde_json::from_value(current).map_err(|e| {
            AppError::configuration(format!("Configuration overrides rejected: {e}"))
        })?;

        tracing::debug!("Configuration overrides applied");
        Ok(())
    }

    /// Reads a plugin-owned top-level key.
    pub fn extra(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }
}
