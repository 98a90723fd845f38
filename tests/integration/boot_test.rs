//! Integration tests for plugin registration, ordering and initialization.

mod helpers;

use jackstack_core::config::plugin::OrderingStrategy;
use jackstack_core::error::ErrorKind;
use jackstack_plugin::{BootState, Plugin, Stack, StackError, Stage};
use serde_json::json;

use helpers::Recorder;

#[test]
fn test_dependency_initializes_first() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    stack.register(recorder.plugin("B", &["A"])).unwrap();
    stack.register(recorder.plugin("A", &[])).unwrap();

    stack.init().unwrap();

    assert_eq!(recorder.entries(), ["A", "B"]);
}

#[test]
fn test_unregistered_dependency_fails_init() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    stack.register(recorder.plugin("C", &["Z"])).unwrap();
    stack.subscribe("before".parse().unwrap(), recorder.subscriber());

    let err = stack.init().unwrap_err();

    assert_eq!(err.kind, ErrorKind::Resolution);
    let source = err
        .source
        .as_ref()
        .and_then(|s| s.downcast_ref::<StackError>());
    assert_eq!(
        source,
        Some(&StackError::UnfulfilledDependency("Z".to_string()))
    );
    assert!(recorder.entries().is_empty(), "no plugin or stage may run");
    assert_eq!(stack.stage_counter(), 0);
}

#[test]
fn test_duplicate_names_always_rejected() {
    let mut stack = helpers::test_stack();
    stack
        .register(Plugin::new("cookie", |_, _| Ok(())).disabled())
        .unwrap();

    for candidate in [
        Plugin::new("cookie", |_, _| Ok(())),
        Plugin::new("cookie", |_, _| Ok(())).disabled(),
    ] {
        assert_eq!(
            stack.register(candidate),
            Err(StackError::DuplicateName("cookie".to_string()))
        );
    }
}

#[test]
fn test_reserved_name_rejected() {
    let mut stack = helpers::test_stack();
    assert_eq!(
        stack.register(Plugin::new("all", |_, _| Ok(()))),
        Err(StackError::ReservedName("all".to_string()))
    );
}

#[test]
fn test_toggle_round_trip_restores_enabled_set() {
    let mut stack = helpers::test_stack();
    stack.register(Plugin::new("cookie", |_, _| Ok(()))).unwrap();
    stack
        .register(Plugin::new("static", |_, _| Ok(())).disabled())
        .unwrap();
    let before = stack.registry().enabled().to_vec();

    stack.enable("static");
    stack.enable("static");
    stack.disable("static");

    assert_eq!(stack.registry().enabled(), before.as_slice());
}

#[test]
fn test_config_toggles_applied() {
    let mut config = helpers::local_config();
    config.plugins.toggles = vec!["!cookie".to_string()];
    let recorder = Recorder::new();
    let mut stack = Stack::new(config);
    stack.register(recorder.plugin("cookie", &[])).unwrap();
    stack.register(recorder.plugin("logging", &[])).unwrap();

    stack.apply_toggles();
    stack.init().unwrap();

    assert_eq!(recorder.entries(), ["logging"]);
}

#[test]
fn test_disabling_a_dependency_fails_dependents() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    stack.register(recorder.plugin("cookie", &[])).unwrap();
    stack.register(recorder.plugin("session", &["cookie"])).unwrap();
    stack.disable("cookie");

    let err = stack.init().unwrap_err();
    assert_eq!(err.message, "Unfulfilled dependency: cookie");
}

#[test]
fn test_topological_orders_chains_through_unrelated_plugins() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    stack.register(recorder.plugin("B", &["A"])).unwrap();
    stack.register(recorder.plugin("E", &[])).unwrap();
    stack.register(recorder.plugin("A", &[])).unwrap();
    stack.register(recorder.plugin("D", &["B"])).unwrap();
    stack.register(recorder.plugin("F", &["E"])).unwrap();
    stack.disable("D");
    stack.disable("F");

    assert_eq!(
        stack.registry().resolve(OrderingStrategy::Pairwise).unwrap(),
        ["B", "E", "A"]
    );

    stack.init().unwrap();
    let order = recorder.entries();
    let position = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert!(position("A") < position("B"));
}

#[test]
fn test_pairwise_strategy_from_config() {
    let mut config = helpers::local_config();
    config.plugins.ordering = OrderingStrategy::Pairwise;
    let recorder = Recorder::new();
    let mut stack = Stack::new(config);
    stack.register(recorder.plugin("session", &["cookie"])).unwrap();
    stack.register(recorder.plugin("cookie", &[])).unwrap();

    stack.init().unwrap();

    assert_eq!(recorder.entries(), ["cookie", "session"]);
}

#[test]
fn test_dependency_cycle_fails_init() {
    let mut stack = helpers::test_stack();
    stack
        .register(Plugin::new("A", |_, _| Ok(())).depends_on(["B"]))
        .unwrap();
    stack
        .register(Plugin::new("B", |_, _| Ok(())).depends_on(["A"]))
        .unwrap();

    let err = stack.init().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Resolution);
    assert!(matches!(stack.state(), BootState::Failed(_)));
}

#[test]
fn test_plugin_configuration_merged_before_init() {
    let seen = Recorder::new();
    let mut stack = helpers::test_stack();
    let record = seen.clone();
    stack
        .register(
            Plugin::new("session", move |_, config| {
                record.push(config["name"].as_str().unwrap_or_default());
                record.push(config["secret"].as_str().unwrap_or_default());
                Ok(())
            })
            .with_config(json!({ "name": "sessionID", "secret": "default" })),
        )
        .unwrap();

    stack
        .plugin_mut("session")
        .unwrap()
        .configure(json!({ "secret": "override" }));
    stack.init().unwrap();

    assert_eq!(seen.entries(), ["sessionID", "override"]);
}

#[test]
fn test_initializers_run_once() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    stack.register(recorder.plugin("cookie", &[])).unwrap();

    stack.init().unwrap();
    stack.init().unwrap();

    assert_eq!(recorder.count("cookie"), 1);
    assert!(stack.plugin("cookie").unwrap().is_initialized());
}

#[test]
fn test_plugin_failure_is_terminal() {
    let mut stack = helpers::test_stack();
    stack
        .register(Plugin::new("broken", |_, _| {
            Err(jackstack_core::error::AppError::internal("broken plugin"))
        }))
        .unwrap();

    let first = stack.init().unwrap_err();
    let second = stack.init().unwrap_err();

    assert_eq!(first.message, "broken plugin");
    assert_eq!(second.message, "broken plugin");
    assert!(stack.history().is_empty());
}

#[test]
fn test_plugin_contributes_stage_handler() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    let record = recorder.clone();
    stack
        .register(Plugin::new("router", move |stack, _| {
            let record = record.clone();
            stack.set_stage_handler(Stage::Routing, move |_| {
                record.push("routing handler");
                Ok(None)
            })
        }))
        .unwrap();

    stack.init().unwrap();

    assert_eq!(recorder.entries(), ["routing handler"]);
}
