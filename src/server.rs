//! HTTP surface: `/resize`, `/do` and `/health`.

mod flow;
pub mod handlers;

use std::sync::Arc;

use anyhow::Context;
use axum::{Router, routing::any};
use tokio::net::TcpListener;

use crate::{
    config::ServiceConfig,
    descriptor::{HostTemplate, Variant},
    error::RedirectorResult,
    storage::{ObjectStore, S3Store},
    transform::PixelTransform,
};

pub use flow::{Outcome, redirect_for};

/// Shared, immutable request state.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ObjectStore>,
    transform: Arc<dyn PixelTransform>,
    suffix_hosts: Arc<HostTemplate>,
    params_hosts: Option<Arc<HostTemplate>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        transform: Arc<dyn PixelTransform>,
        suffix_hosts: HostTemplate,
        params_hosts: Option<HostTemplate>,
    ) -> Self {
        Self {
            store,
            transform,
            suffix_hosts: Arc::new(suffix_hosts),
            params_hosts: params_hosts.map(Arc::new),
        }
    }

    /// Redirect targets for `variant`; `None` when that grammar is not served.
    pub fn hosts(&self, variant: Variant) -> Option<&HostTemplate> {
        match variant {
            Variant::Suffix => Some(&self.suffix_hosts),
            Variant::Params => self.params_hosts.as_deref(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", any(handlers::health))
        .route("/resize", any(handlers::resize));
    if state.params_hosts.is_some() {
        router = router.route("/do", any(handlers::manipulate));
    }
    router.with_state(state)
}

/// Validate `config`, connect to S3 and serve until Ctrl-C or SIGTERM.
pub async fn serve(config: ServiceConfig) -> RedirectorResult<()> {
    config.validate()?;

    let store = S3Store::connect(&config).await;
    let state = AppState::new(
        Arc::new(store),
        Arc::new(config.transform()),
        config.suffix_hosts(),
        config.params_hosts(),
    );

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    let local = listener.local_addr().context("read bound address")?;
    tracing::info!(
        %local,
        params_route = config.redirect_host.is_some(),
        "image redirector listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    tracing::info!("image redirector stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "sigterm handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown requested");
}
