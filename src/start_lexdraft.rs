//! Startup helpers for the lexdraft server.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use crate::config::AppConfig;
use crate::llm::GeminiClient;
use crate::server::{self, AppState};
use crate::store::SqliteConversationStore;

/// Run the server (used by the `lexdraft-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    // Missing .env is fine; variables may come from the process environment.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting lexdraft v{}", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e:#}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(config)) {
        tracing::error!("Server error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Read and validate configuration from the environment.
///
/// # Errors
/// Returns an error if a variable is malformed or a value is out of range.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let config = AppConfig::from_env().context("failed to read environment")?;
    config.validate().context("configuration rejected")?;
    if config.gemini.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; chat requests will fail");
    }
    Ok(config)
}

/// Build application state from configuration.
///
/// # Errors
/// Returns an error if the store cannot be opened or the HTTP client cannot be built.
pub async fn initialize(config: AppConfig) -> anyhow::Result<Arc<AppState>> {
    let store = SqliteConversationStore::open(&config.storage.sqlite_path)
        .await
        .with_context(|| {
            format!(
                "failed to open conversation store at {}",
                config.storage.sqlite_path.display()
            )
        })?;
    let chat = GeminiClient::new(config.gemini.clone()).context("failed to build Gemini client")?;
    tracing::info!("Gemini model: {}", config.gemini.model);

    Ok(AppState::new(Arc::new(store), Arc::new(chat), config))
}

/// Initialize state and serve until Ctrl-C.
///
/// # Errors
/// Returns an error if initialization fails or the server stops abnormally.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let state = initialize(config).await?;
    server::run_server_with_shutdown(state, shutdown_signal())
        .await
        .context("HTTP server failed")?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
