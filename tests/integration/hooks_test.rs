//! Integration tests for lifecycle events, stage wrapping and hooks.

mod helpers;

use jackstack_core::error::AppError;
use jackstack_plugin::{EventModule, HookPoint, Stack, StackError, Stage};

use helpers::Recorder;

#[test]
fn test_wrap_brackets_handler_with_events() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    for point in ["before", "before.X", "after.X", "after"] {
        stack.subscribe(point.parse().unwrap(), recorder.subscriber());
    }

    let record = recorder.clone();
    stack
        .wrap("X", move |_| {
            record.push("handler");
            Ok(None)
        })
        .unwrap();

    assert_eq!(
        recorder.entries(),
        ["before", "before.X", "handler", "after.X", "after"]
    );
}

#[test]
fn test_throwing_handler_suppresses_after_events() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    for point in ["before.X", "after.X", "after"] {
        stack.subscribe(point.parse().unwrap(), recorder.subscriber());
    }

    let result = stack.wrap("X", |_| Err(AppError::stage("handler threw")));

    assert!(result.is_err());
    assert_eq!(recorder.entries(), ["before.X"]);
}

#[test]
fn test_subscribers_run_in_registration_order_every_run() {
    for _ in 0..3 {
        let recorder = Recorder::new();
        let mut stack = helpers::test_stack();
        for name in ["h1", "h2"] {
            let record = recorder.clone();
            stack.subscribe(HookPoint::Before(Stage::Session), move |_, _| {
                record.push(name);
                Ok(())
            });
        }

        stack.init().unwrap();

        assert_eq!(recorder.entries(), ["h1", "h2"]);
    }
}

#[test]
fn test_every_builtin_stage_fires_in_sequence() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    let record = recorder.clone();
    stack.subscribe(HookPoint::BeforeAll, move |_, event| {
        record.push(format!("{}:{}", event.ordinal, event.stage));
        Ok(())
    });

    stack.init().unwrap();

    let expected: Vec<String> = Stage::SEQUENCE
        .iter()
        .enumerate()
        .map(|(i, stage)| format!("{}:{}", i + 1, stage))
        .collect();
    assert_eq!(recorder.entries(), expected);
}

#[test]
fn test_hook_runs_as_its_own_stage() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    for point in ["before.session", "after.session", "before.xprmntl", "after.xprmntl"] {
        stack.subscribe(point.parse().unwrap(), recorder.subscriber());
    }

    let record = recorder.clone();
    stack
        .use_after(Stage::Session, "xprmntl", move |_| {
            record.push("xprmntl");
            Ok(Some(helpers::ready()))
        })
        .unwrap();

    stack.init().unwrap();

    assert_eq!(
        recorder.entries(),
        [
            "before.session",
            "after.session",
            "before.xprmntl",
            "xprmntl",
            "after.xprmntl",
        ]
    );
    assert_eq!(stack.pending_deferred(), 1);
    assert_eq!(stack.stage_counter() as usize, Stage::SEQUENCE.len() + 1);
}

#[test]
fn test_before_hook_runs_ahead_of_stage_handler() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();

    let record = recorder.clone();
    stack
        .set_stage_handler(Stage::Routing, move |_| {
            record.push("routing");
            Ok(None)
        })
        .unwrap();
    let record = recorder.clone();
    stack
        .use_before(Stage::Routing, "auth", move |_| {
            record.push("auth");
            Ok(None)
        })
        .unwrap();

    stack.init().unwrap();

    assert_eq!(recorder.entries(), ["auth", "routing"]);
}

#[test]
fn test_hook_without_label_rejected_at_registration() {
    let mut stack = helpers::test_stack();

    let err = stack
        .use_before(Stage::Session, "", |_| Ok(None))
        .unwrap_err();

    assert_eq!(err, StackError::MissingLabel("before.session".to_string()));
    assert_eq!(stack.hooks().handler_count(&HookPoint::Before(Stage::Session)), 0);
}

#[test]
fn test_failing_subscriber_aborts_boot() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    stack.subscribe(HookPoint::After(Stage::Cookie), |_, _| {
        Err(AppError::stage("cookie hook failed"))
    });
    stack.subscribe(HookPoint::BeforeAll, recorder.subscriber());

    let err = stack.init().unwrap_err();

    assert_eq!(err.message, "cookie hook failed");
    assert_eq!(recorder.entries(), ["before", "before"]);
}

#[test]
fn test_use_modules_registers_in_order() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    let modules = ["before.static", "after.static"].map(|event| {
        let record = recorder.clone();
        EventModule::parse(event, move |_, e| {
            record.push(format!("module {}", e.point));
            Ok(())
        })
        .unwrap()
    });

    stack.use_modules(modules);
    stack.wrap_bare(Stage::Static).unwrap();

    assert_eq!(
        recorder.entries(),
        ["module before.static", "module after.static"]
    );
}

#[test]
fn test_subscriber_added_during_dispatch_sees_later_events() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    let record = recorder.clone();
    stack.subscribe(HookPoint::BeforeAll, move |stack: &mut Stack, event| {
        if event.stage == Stage::Config {
            let record = record.clone();
            stack.subscribe(HookPoint::BeforeAll, move |_, event| {
                record.push(event.stage.to_string());
                Ok(())
            });
        }
        Ok(())
    });

    stack.wrap_bare(Stage::Config).unwrap();
    stack.wrap_bare(Stage::Cookie).unwrap();

    assert_eq!(recorder.entries(), ["cookie"]);
}

#[test]
fn test_hooks_can_override_configuration() {
    let mut stack = helpers::test_stack();
    stack.subscribe(HookPoint::Before(Stage::Config), |stack, _| {
        stack.assign(serde_json::json!({ "compression": { "enabled": false } }))
    });

    stack.init().unwrap();

    assert!(!stack.config().compression.enabled);
}
