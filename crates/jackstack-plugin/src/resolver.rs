//! Initialization order for the enabled plugins.
//!
//! Two strategies are available:
//!
//! - [`OrderingStrategy::Topological`] walks the dependency graph and places
//!   every dependency ahead of its dependents, however many hops apart.
//!   Plugins that something depends on are preferred when several are ready;
//!   ties keep enable order. Cycles fail with [`StackError::DependencyCycle`].
//! - [`OrderingStrategy::Pairwise`] sorts with a comparator that only sees
//!   direct dependencies and a coarse "is depended upon" signal. A chain that
//!   runs through a plugin unrelated to both ends is not guaranteed to come
//!   out ordered.
//!
//! Both strategies first verify that every dependency of an enabled plugin is
//! itself enabled.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use jackstack_core::config::plugin::OrderingStrategy;

use crate::error::StackError;
use crate::registry::PluginRegistry;

/// Orders the registry's enabled plugins.
pub fn resolve(
    registry: &PluginRegistry,
    strategy: OrderingStrategy,
) -> Result<Vec<String>, StackError> {
    check_fulfilled(registry)?;

    let order = match strategy {
        OrderingStrategy::Topological => topological(registry)?,
        OrderingStrategy::Pairwise => pairwise(registry),
    };

    debug!(?strategy, order = ?order, "Resolved plugin order");
    Ok(order)
}

/// Fails with the first dependency, in enable order, that is not enabled.
pub fn check_fulfilled(registry: &PluginRegistry) -> Result<(), StackError> {
    for name in registry.enabled() {
        if let Some(missing) = registry
            .dependencies_of(name)
            .iter()
            .find(|dep| !registry.is_enabled(dep))
        {
            return Err(StackError::UnfulfilledDependency(missing.clone()));
        }
    }
    Ok(())
}

/// Compares two plugins for initialization order.
///
/// `a` sorts first when `b` depends on it, last when it depends on `b`.
/// Otherwise the one that appears among all declared dependencies sorts
/// first; if both or neither do, they compare equal.
pub fn compare(registry: &PluginRegistry, a: &str, b: &str) -> Ordering {
    let depends = |who: &str, on: &str| registry.dependencies_of(who).iter().any(|d| d == on);

    if depends(b, a) {
        return Ordering::Less;
    }
    if depends(a, b) {
        return Ordering::Greater;
    }

    let depended_upon = |name: &str| registry.all_dependencies().iter().any(|d| d == name);
    match (depended_upon(a), depended_upon(b)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Stable insertion sort of the enabled set under [`compare`].
///
/// The comparator is not a total order, so a library sort could reject it;
/// insertion sort only ever moves an element past strictly greater ones.
fn pairwise(registry: &PluginRegistry) -> Vec<String> {
    let mut order: Vec<String> = Vec::with_capacity(registry.enabled().len());

    for name in registry.enabled() {
        let mut at = order.len();
        while at > 0 && compare(registry, &order[at - 1], name) == Ordering::Greater {
            at -= 1;
        }
        order.insert(at, name.clone());
    }

    order
}

/// Kahn's algorithm over the enabled set.
fn topological(registry: &PluginRegistry) -> Result<Vec<String>, StackError> {
    let enabled = registry.enabled();
    let depended_upon: HashSet<&str> = registry
        .all_dependencies()
        .iter()
        .map(String::as_str)
        .collect();

    let mut remaining: HashMap<&str, HashSet<&str>> = enabled
        .iter()
        .map(|name| {
            let deps = registry
                .dependencies_of(name)
                .iter()
                .map(String::as_str)
                .collect();
            (name.as_str(), deps)
        })
        .collect();

    let mut order = Vec::with_capacity(enabled.len());

    while order.len() < enabled.len() {
        let ready = enabled
            .iter()
            .map(String::as_str)
            .filter(|name| remaining.get(name).is_some_and(HashSet::is_empty));

        // Prefer plugins something depends on, then enable order.
        let mut next = None;
        for name in ready {
            if depended_upon.contains(name) {
                next = Some(name);
                break;
            }
            next.get_or_insert(name);
        }

        let Some(next) = next else {
            let cycle = enabled
                .iter()
                .filter(|name| remaining.contains_key(name.as_str()))
                .cloned()
                .collect();
            return Err(StackError::DependencyCycle(cycle));
        };

        remaining.remove(next);
        for deps in remaining.values_mut() {
            deps.remove(next);
        }
        order.push(next.to_string());
    }

    Ok(order)
}
