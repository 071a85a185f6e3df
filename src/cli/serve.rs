use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::commands::ServeArgs;
use crate::api::{self, AppState};
use crate::config::{self, ExporterConfig, ServerConfig};
use crate::errors::ExporterError;
use crate::fleet::HttpFleetClient;
use crate::pipeline::FleetCollector;

pub async fn handle_serve(args: ServeArgs) -> Result<(), ExporterError> {
    let path = PathBuf::from(&args.config);
    let config = config::load_config(&path).await?;

    let state = build_app_state(&config)?;
    let endpoint = config.exporter.endpoint_path();
    let app = api::build_router(state, &endpoint);

    let addr = format!("0.0.0.0:{}", config.exporter.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(endpoint = %endpoint, addr = %addr, "Serving metrics");

    axum::serve(listener, app)
        .await
        .map_err(|e| ExporterError::Internal(format!("Server error: {e}")))?;

    Ok(())
}

/// Build one collector per configured server.
pub fn build_app_state(config: &ExporterConfig) -> Result<AppState, ExporterError> {
    let mut collectors = Vec::with_capacity(config.servers.len());

    for (name, server) in &config.servers {
        let http = build_http_client(config, server)?;
        let fleet = HttpFleetClient::new(
            http,
            name.clone(),
            server.address.clone(),
            server.collection.clone(),
            server.access_token.clone().unwrap_or_default(),
        );
        let collector = FleetCollector::new(Arc::new(fleet), name.clone())
            .with_exclude_hosted(server.exclude_hosted)
            .with_max_concurrent_fetches(server.max_concurrent_fetches)
            .with_cycle_timeout(server.cycle_timeout_secs.map(Duration::from_secs));

        info!(server = %name, address = %server.address, "Metrics collector created");
        collectors.push(collector);
    }

    Ok(AppState {
        collectors: Arc::new(collectors),
    })
}

fn build_http_client(
    config: &ExporterConfig,
    server: &ServerConfig,
) -> Result<reqwest::Client, ExporterError> {
    let mut builder = reqwest::Client::builder().pool_idle_timeout(Duration::from_secs(20));

    if server.use_proxy {
        // Validation guarantees a proxy URL exists when use_proxy is set.
        let url = config
            .proxy
            .as_ref()
            .map(|p| p.url.as_str())
            .unwrap_or_default();
        let proxy = reqwest::Proxy::all(url)
            .map_err(|e| ExporterError::Config(format!("Invalid proxy url {url}: {e}")))?;
        info!(proxy = %url, "Proxy will be used");
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ExporterError::Internal(format!("Failed to build HTTP client: {e}")))
}
