//! Plugin system configuration.

use serde::{Deserialize, Serialize};

/// Plugin system configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Enable/disable toggles applied before boot. A leading `!` disables.
    #[serde(default)]
    pub toggles: Vec<String>,
    /// How the enabled plugins are ordered for initialization.
    #[serde(default)]
    pub ordering: OrderingStrategy,
}

/// Plugin ordering algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingStrategy {
    /// Dependency graph walk; every dependency precedes its dependents.
    #[default]
    Topological,
    /// Pairwise comparator sort. Does not order through unrelated plugins.
    Pairwise,
}
