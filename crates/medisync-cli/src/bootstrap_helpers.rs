use std::sync::Arc;

use anyhow::{Context, Result};
use medisync_client::{BackendClient, BackendConfig};
use medisync_core::{FileKeyValueStore, KeyValueStore, AUTH_TOKEN_KEY};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use crate::cli_args::Cli;

pub(crate) fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

pub(crate) struct Runtime {
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) backend: BackendClient,
}

pub(crate) fn build_runtime(cli: &Cli) -> Result<Runtime> {
    let store = FileKeyValueStore::open(&cli.state_file).with_context(|| {
        format!("failed to open state file {}", cli.state_file.display())
    })?;
    if let Some(token) = cli.auth_token.as_deref().map(str::trim) {
        if !token.is_empty() {
            store
                .set(AUTH_TOKEN_KEY, token)
                .context("failed to persist auth token")?;
        }
    }
    let store: Arc<dyn KeyValueStore> = Arc::new(store);
    let backend = BackendClient::new(
        BackendConfig {
            api_base: cli.api_base.trim().to_string(),
            request_timeout_ms: cli.request_timeout_ms,
            connect_timeout_ms: cli.connect_timeout_ms,
        },
        store.clone(),
    )
    .context("failed to build HTTP client")?;
    Ok(Runtime { store, backend })
}
