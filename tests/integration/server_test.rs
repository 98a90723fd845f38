//! Integration tests for starting, serving and stopping a stack.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use jackstack_core::error::{AppError, ErrorKind};
use jackstack_middleware::{RouteModule, RouteTable, Session};
use jackstack_plugin::{BootState, Deferred, Stage};
use reqwest::StatusCode;

use helpers::Recorder;

fn routes() -> RouteTable {
    RouteTable::new()
        .with(RouteModule::mount(
            "index",
            Router::new().route("/", get(|| async { "home" })),
        ))
        .with(RouteModule::mount(
            "users/index",
            Router::new().route("/", get(|| async { "users" })),
        ))
}

#[tokio::test]
async fn test_start_serves_framework_stack() {
    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(static_dir.path().join("robots.txt"), "User-agent: *").unwrap();

    let mut config = helpers::local_config();
    config.dirnames.static_dirs = vec![static_dir.path().to_string_lossy().into_owned()];
    let mut stack = jackstack_plugin::Stack::new(config);
    jackstack_middleware::install(&mut stack, routes()).unwrap();
    stack.register(jackstack_middleware::health::plugin()).unwrap();

    let addr = stack.start().await.unwrap();
    assert!(matches!(stack.state(), BootState::Ready(a) if *a == addr));

    assert_eq!(helpers::get(addr, "/").await, (StatusCode::OK, "home".to_string()));
    assert_eq!(
        helpers::get(addr, "/users").await,
        (StatusCode::OK, "users".to_string())
    );
    assert_eq!(
        helpers::get(addr, "/robots.txt").await,
        (StatusCode::OK, "User-agent: *".to_string())
    );

    let (status, body) = helpers::get(addr, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["boot_id"], stack.boot_id().to_string());

    let (status, _) = helpers::get(addr, "/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    stack.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_start_twice_does_not_rerun_stages() {
    let recorder = Recorder::new();
    let mut stack = helpers::test_stack();
    for stage in Stage::SEQUENCE {
        let record = recorder.clone();
        let name = stage.to_string();
        stack
            .set_stage_handler(stage, move |_| {
                record.push(name.clone());
                Ok(None)
            })
            .unwrap();
    }

    let first = stack.start().await.unwrap();
    let second = stack.start().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(recorder.entries().len(), Stage::SEQUENCE.len());
    stack.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rejected_deferred_rejects_start_and_calls_back_once() {
    let mut stack = helpers::test_stack();
    stack
        .set_stage_handler(Stage::Session, |_| {
            Ok(Some(Deferred::new(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err(AppError::deferred("session store unavailable"))
            })))
        })
        .unwrap();

    let calls = Recorder::new();
    let record = calls.clone();
    let err = stack
        .start_with(move |err| {
            record.push(err.map(|e| e.message.clone()).unwrap_or_default());
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Deferred);
    assert_eq!(err.message, "session store unavailable");
    assert_eq!(calls.entries(), ["session store unavailable"]);
    assert!(stack.local_addr().is_none());

    let again = stack.start().await.unwrap_err();
    assert_eq!(again.message, "session store unavailable");
}

#[tokio::test]
async fn test_success_callback_called_once_without_error() {
    let mut stack = helpers::test_stack();
    let calls = Recorder::new();
    let record = calls.clone();

    stack
        .start_with(move |err| record.push(format!("error: {}", err.is_some())))
        .await
        .unwrap();

    assert_eq!(calls.entries(), ["error: false"]);
    stack.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_tolerated_failure_does_not_block_start() {
    let mut stack = helpers::test_stack();
    stack
        .use_after(Stage::Session, "xprmntl", |_| {
            Ok(Some(Deferred::tolerant("xprmntl", async {
                Err(AppError::external_service("dashboard unreachable"))
            })))
        })
        .unwrap();

    assert!(stack.start().await.is_ok());
    stack.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_listener_waits_for_deferred_work() {
    let done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&done);
    let mut stack = helpers::test_stack();
    stack
        .set_stage_handler(Stage::End, move |_| {
            let flag = Arc::clone(&flag);
            Ok(Some(Deferred::spawn("warmup", async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })))
        })
        .unwrap();

    stack.start().await.unwrap();

    assert!(done.load(Ordering::SeqCst));
    stack.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_supplied_listener_is_used() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let expected = listener.local_addr().unwrap();

    let mut config = helpers::local_config();
    config.server.port = 1;
    let mut stack = jackstack_plugin::Stack::new(config);
    stack.set_listener(listener);
    jackstack_middleware::install(&mut stack, routes()).unwrap();

    let addr = stack.start().await.unwrap();

    assert_eq!(addr, expected);
    assert_eq!(helpers::get(addr, "/").await.1, "home");
    stack.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bind_failure_reported_as_listener_error() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = helpers::local_config();
    config.server.port = taken.local_addr().unwrap().port();
    let mut stack = jackstack_plugin::Stack::new(config);

    let err = stack.start().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Listener);
    assert!(matches!(stack.state(), BootState::Failed(_)));
}

#[tokio::test]
async fn test_shutdown_stops_serving() {
    let mut stack = helpers::test_stack();
    jackstack_middleware::install(&mut stack, routes()).unwrap();
    let addr = stack.start().await.unwrap();

    stack.shutdown().await.unwrap();

    assert!(stack.local_addr().is_none());
    assert!(reqwest::get(format!("http://{addr}/")).await.is_err());
}

#[tokio::test]
async fn test_start_after_shutdown_does_not_report_stale_address() {
    let mut stack = helpers::test_stack();
    jackstack_middleware::install(&mut stack, routes()).unwrap();
    let addr = stack.start().await.unwrap();
    stack.shutdown().await.unwrap();

    let calls = Recorder::new();
    let record = calls.clone();
    let err = stack
        .start_with(move |err| record.push(format!("error: {}", err.is_some())))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Listener);
    assert_eq!(calls.entries(), ["error: true"]);
    assert!(matches!(stack.state(), BootState::Stopped(a) if *a == addr));
    assert!(reqwest::get(format!("http://{addr}/")).await.is_err());
}

#[tokio::test]
async fn test_session_survives_between_requests() {
    let mut stack = helpers::test_stack();
    let table = RouteTable::new().with(RouteModule::mount(
        "index",
        Router::new().route(
            "/count",
            get(|session: Session| async move {
                let count = session
                    .get("count")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0)
                    + 1;
                session.insert("count", count.into());
                count.to_string()
            }),
        ),
    ));
    jackstack_middleware::install(&mut stack, table).unwrap();
    let addr = stack.start().await.unwrap();

    let url = format!("http://{addr}/count");
    let client = reqwest::Client::new();
    let first = client.get(&url).send().await.unwrap();
    let cookie = first.headers()[reqwest::header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert_eq!(first.text().await.unwrap(), "1");

    let second = client
        .get(&url)
        .header(reqwest::header::COOKIE, cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(second.text().await.unwrap(), "2");
    stack.shutdown().await.unwrap();
}
