//! Plugin registry: stores plugin descriptors and the enabled set.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{info, warn};

use jackstack_core::config::plugin::OrderingStrategy;
use jackstack_core::result::AppResult;

use crate::error::StackError;
use crate::resolver;
use crate::stack::Stack;

/// Names no plugin may take.
pub const RESERVED_NAMES: &[&str] = &["all"];

/// Prefix that flips an enable into a disable (and back).
pub const NEGATION_PREFIX: char = '!';

/// One-shot plugin initializer. Receives the stack and the plugin's configuration.
pub type PluginInitializer = Box<dyn FnOnce(&mut Stack, &Value) -> AppResult<()> + Send>;

/// A self-contained initialization unit.
pub struct Plugin {
    /// Unique plugin name.
    name: String,
    /// Names of plugins that must initialize first.
    dependencies: Vec<String>,
    /// Whether registration enables the plugin.
    enabled: bool,
    /// Plugin-owned configuration, merged by [`Plugin::configure`].
    config: Value,
    /// Taken when the plugin initializes.
    initializer: Option<PluginInitializer>,
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("enabled", &self.enabled)
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Plugin {
    /// Creates an enabled plugin with no dependencies and an empty configuration.
    pub fn new<F>(name: impl Into<String>, initializer: F) -> Self
    where
        F: FnOnce(&mut Stack, &Value) -> AppResult<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            enabled: true,
            config: Value::Object(serde_json::Map::new()),
            initializer: Some(Box::new(initializer)),
        }
    }

    /// Declares the plugins that must initialize before this one.
    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// Registers the plugin without enabling it.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Sets the default configuration.
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Returns the plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared dependencies.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Shallow-merges `overrides` into the configuration.
    ///
    /// Object keys replace the keys of the same name; `null` changes nothing;
    /// any other value replaces the configuration.
    pub fn configure(&mut self, overrides: Value) -> &mut Self {
        match (overrides, &mut self.config) {
            (Value::Null, _) => {}
            (Value::Object(overrides), Value::Object(current)) => {
                for (key, value) in overrides {
                    current.insert(key, value);
                }
            }
            (other, current) => *current = other,
        }
        self
    }

    /// Returns whether the configuration asks for the plugin to be skipped.
    pub fn is_disabled_by_config(&self) -> bool {
        is_disabled_by(&self.config)
    }

    /// Returns whether the initializer has already been consumed.
    pub fn is_initialized(&self) -> bool {
        self.initializer.is_none()
    }
}

/// Truthy `disable` or `disabled` keys skip a plugin at initialization.
pub(crate) fn is_disabled_by(config: &Value) -> bool {
    ["disable", "disabled"].iter().any(|key| match config.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    })
}

/// Registry of all plugins known to a stack.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    /// Plugin name → descriptor.
    registered: HashMap<String, Plugin>,
    /// Enabled plugin names, in the order they were enabled.
    enabled: Vec<String>,
    /// Every dependency name declared by any registered plugin, with repeats.
    all_dependencies: Vec<String>,
}

impl PluginRegistry {
    /// Creates a new empty plugin registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin and, unless it was created disabled, enables it.
    pub fn register(&mut self, plugin: Plugin) -> Result<(), StackError> {
        let name = plugin.name.clone();

        if name.is_empty() {
            return Err(StackError::InvalidPlugin(
                "plugin name not defined".to_string(),
            ));
        }
        if name.starts_with(NEGATION_PREFIX) {
            return Err(StackError::InvalidPlugin(format!(
                "plugin name may not start with '{NEGATION_PREFIX}': {name}"
            )));
        }
        if self.registered.contains_key(&name) {
            return Err(StackError::DuplicateName(name));
        }
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(StackError::ReservedName(name));
        }

        info!(
            plugin = %name,
            dependencies = ?plugin.dependencies,
            enabled = plugin.enabled,
            "Registering plugin"
        );

        self.all_dependencies
            .extend(plugin.dependencies.iter().cloned());
        let enabled = plugin.enabled;
        self.registered.insert(name.clone(), plugin);

        if enabled {
            self.enable(&name);
        }

        Ok(())
    }

    /// Adds a plugin to the enabled set. `!name` disables `name` instead.
    ///
    /// Unknown names are logged and ignored.
    pub fn enable(&mut self, name: &str) {
        if let Some(rest) = name.strip_prefix(NEGATION_PREFIX) {
            return self.disable(rest);
        }

        if !self.registered.contains_key(name) {
            warn!(plugin = %name, "Unknown plugin");
            return;
        }

        if !self.is_enabled(name) {
            self.enabled.push(name.to_string());
        }
    }

    /// Removes a plugin from the enabled set. `!name` enables `name` instead.
    pub fn disable(&mut self, name: &str) {
        if let Some(rest) = name.strip_prefix(NEGATION_PREFIX) {
            return self.enable(rest);
        }

        self.enabled.retain(|enabled| enabled != name);
    }

    /// Applies a list of toggles such as `["session", "!experiments"]`.
    pub fn apply_toggles<I, S>(&mut self, toggles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for toggle in toggles {
            self.enable(toggle.as_ref());
        }
    }

    /// Gets a plugin by name.
    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.registered.get(name)
    }

    /// Gets a plugin by name for configuration before boot.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Plugin> {
        self.registered.get_mut(name)
    }

    /// Checks whether a plugin is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.registered.contains_key(name)
    }

    /// Checks whether a plugin is enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.iter().any(|enabled| enabled == name)
    }

    /// Returns the enabled plugin names in enable order.
    pub fn enabled(&self) -> &[String] {
        &self.enabled
    }

    /// Returns every declared dependency name, with repeats.
    pub fn all_dependencies(&self) -> &[String] {
        &self.all_dependencies
    }

    /// Returns the dependencies declared by a plugin.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.registered
            .get(name)
            .map(|plugin| plugin.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Returns plugin count.
    pub fn count(&self) -> usize {
        self.registered.len()
    }

    /// Orders the enabled plugins for initialization.
    pub fn resolve(&self, strategy: OrderingStrategy) -> Result<Vec<String>, StackError> {
        resolver::resolve(self, strategy)
    }

    /// Takes a plugin's initializer and a copy of its configuration.
    ///
    /// Returns `None` once the initializer has been taken.
    pub(crate) fn take_initializer(&mut self, name: &str) -> Option<(PluginInitializer, Value)> {
        let plugin = self.registered.get_mut(name)?;
        let initializer = plugin.initializer.take()?;
        Some((initializer, plugin.config.clone()))
    }
}
