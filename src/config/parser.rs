use std::path::Path;

use super::types::ExporterConfig;
use crate::errors::ExporterError;
use tracing::{debug, info, warn};

pub async fn load_config(path: &Path) -> Result<ExporterConfig, ExporterError> {
    if !path.exists() {
        return Err(ExporterError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let mut config: ExporterConfig = serde_yaml::from_str(&content)?;

    apply_env_overrides(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Environment variable that overrides a server's access token.
pub fn access_token_env_var(server: &str) -> String {
    format!(
        "FLEETWATCH_{}_ACCESS_TOKEN",
        server.to_uppercase().replace('-', "_")
    )
}

fn apply_env_overrides(config: &mut ExporterConfig) {
    for (name, server) in config.servers.iter_mut() {
        let var = access_token_env_var(name);
        match std::env::var(&var) {
            Ok(token) if !token.is_empty() => {
                if server.access_token.is_some() {
                    warn!(
                        server = %name,
                        var = %var,
                        "Access token in config file overridden by environment variable"
                    );
                } else {
                    info!(server = %name, var = %var, "Using access token from environment variable");
                }
                server.access_token = Some(token);
            }
            _ => {
                debug!(server = %name, var = %var, "Environment variable for access token not set");
            }
        }
    }
}

/// Collect every configuration problem into one error instead of failing
/// on the first, so an operator can fix the file in one pass.
fn validate(config: &ExporterConfig) -> Result<(), ExporterError> {
    let mut problems = Vec::new();

    if config.servers.is_empty() {
        problems.push("no servers configured".to_string());
    }

    for (name, server) in &config.servers {
        if server.address.is_empty() {
            problems.push(format!("servers.{name}: address is empty"));
        }
        if server.access_token.as_deref().map_or(true, str::is_empty) {
            problems.push(format!(
                "servers.{name}: access token not found in config file or {} environment variable",
                access_token_env_var(name)
            ));
        }
        if server.use_proxy && config.proxy.as_ref().map_or(true, |p| p.url.is_empty()) {
            problems.push(format!(
                "servers.{name}: use_proxy is set but proxy.url has not been set"
            ));
        }
    }

    if let Some(proxy) = &config.proxy {
        if !proxy.url.is_empty() && reqwest::Url::parse(&proxy.url).is_err() {
            problems.push(format!("proxy.url cannot be parsed as a URL: {}", proxy.url));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ExporterError::Config(problems.join("; ")))
    }
}
