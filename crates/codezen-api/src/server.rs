//! HTTP server lifecycle.

use std::sync::Arc;

use codezen_core::{CodezenConfig, CodezenError};

use crate::routes::router;
use crate::state::AppState;

/// Open storage, bind the configured address, and serve until Ctrl-C or
/// SIGTERM.
///
/// # Errors
///
/// Returns [`CodezenError::Database`] if the store cannot be opened,
/// [`CodezenError::Config`] for an unusable bind address, or
/// [`CodezenError::Io`] if serving fails.
pub async fn run_server(config: &CodezenConfig) -> Result<(), CodezenError> {
    let state = Arc::new(AppState::from_config(config)?);
    tracing::info!(
        database = %config.database.path.display(),
        model = state.service.llm().model(),
        ollama = state.service.llm().base_url(),
        "state ready"
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .map_err(|e| CodezenError::Config(format!("cannot bind {}: {e}", config.server.bind)))?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, version = env!("CARGO_PKG_VERSION"), "codezen listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("codezen stopped");
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => tracing::warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
