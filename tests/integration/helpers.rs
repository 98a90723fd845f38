//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use jackstack_core::config::StackConfig;
use jackstack_plugin::{Deferred, Plugin, Stack, StageEvent};

/// Ordered record of what ran, shared between closures.
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    /// A subscriber that records `<point>` for every event it sees.
    pub fn subscriber(
        &self,
    ) -> impl Fn(&mut Stack, &StageEvent) -> jackstack_core::result::AppResult<()>
    + Send
    + Sync
    + 'static {
        let recorder = self.clone();
        move |_: &mut Stack, event: &StageEvent| {
            recorder.push(event.point.to_string());
            Ok(())
        }
    }

    /// A plugin that records its own name when initialized.
    pub fn plugin(&self, name: &'static str, deps: &[&str]) -> Plugin {
        let recorder = self.clone();
        Plugin::new(name, move |_, _| {
            recorder.push(name);
            Ok(())
        })
        .depends_on(deps.iter().copied())
    }
}

/// Configuration bound to an ephemeral port on loopback.
pub fn local_config() -> StackConfig {
    let mut config = StackConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.shutdown_grace_seconds = 5;
    config.dirnames.static_dirs.clear();
    config
}

/// A stack with loopback configuration and nothing installed.
pub fn test_stack() -> Stack {
    Stack::new(local_config())
}

/// A deferred result that succeeds right away.
pub fn ready() -> Deferred {
    Deferred::new(async { Ok(()) })
}

/// GETs `path` from a running stack, returning status and body.
pub async fn get(addr: SocketAddr, path: &str) -> (reqwest::StatusCode, String) {
    let response = reqwest::get(format!("http://{addr}{path}"))
        .await
        .expect("request failed");
    let status = response.status();
    let body = response.text().await.expect("body unreadable");
    (status, body)
}
