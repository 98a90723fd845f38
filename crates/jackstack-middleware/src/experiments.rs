//! Feature experiments.
//!
//! When experiments are configured, request handlers can read the enabled
//! list through an [`Extension<Experiments>`](axum::Extension). The stage also
//! announces the list to the experiments dashboard before the listener opens.
//! The announcement is best effort: if the dashboard cannot be reached the
//! stack starts anyway with the local list.

use std::sync::Arc;
use std::time::Duration;

use axum::Extension;
use serde::Serialize;
use tracing::{debug, info};

use jackstack_core::config::middleware::ExperimentsConfig;
use jackstack_plugin::prelude::*;

/// Experiments enabled for this process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Experiments(Arc<[String]>);

impl Experiments {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Returns whether the named experiment is enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.iter().any(|enabled| enabled == name)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Serialize)]
struct Announcement<'a> {
    app: &'a str,
    experiments: &'a [String],
}

/// `experiments` stage handler.
pub fn stage(stack: &mut Stack) -> AppResult<Option<Deferred>> {
    let Some(config) = stack.config().experiments.clone() else {
        debug!("No experiments configured");
        return Ok(None);
    };
    if config.experiments.is_empty() {
        debug!("Experiment list empty");
        return Ok(None);
    }

    let experiments = Experiments::new(config.experiments.iter().cloned());
    info!(experiments = ?experiments.names(), "Experiments enabled");

    let extension = experiments.clone();
    stack
        .app_mut()
        .use_layer(move |router| router.layer(Extension(extension)));

    Ok(Some(Deferred::tolerant(
        "experiments",
        announce(config, experiments),
    )))
}

/// Posts the experiment list to `{endpoint}/announce`.
pub async fn announce(config: ExperimentsConfig, experiments: Experiments) -> AppResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "Failed to build HTTP client", e)
        })?;

    let url = format!("{}/announce", config.endpoint.trim_end_matches('/'));
    let body = Announcement {
        app: env!("CARGO_PKG_NAME"),
        experiments: experiments.names(),
    };

    let response = client.post(&url).json(&body).send().await.map_err(|e| {
        AppError::with_source(
            ErrorKind::ExternalService,
            format!("Experiments announce to {url} failed"),
            e,
        )
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::external_service(format!(
            "Experiments dashboard answered {status}"
        )));
    }

    info!(%url, "Experiments announced");
    Ok(())
}
