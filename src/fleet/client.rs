use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::trace;

use super::types::{Agent, Envelope, Job, Pool};
use crate::errors::{with_backoff, BackoffPolicy, ExporterError};

/// Read operations against the fleet-management service.
#[async_trait]
pub trait FleetClient: Send + Sync {
    async fn pools(&self, exclude_hosted: bool) -> Result<Vec<Pool>, ExporterError>;
    async fn agents(&self, pool_id: i64) -> Result<Vec<Agent>, ExporterError>;
    async fn current_jobs(&self, pool_id: i64) -> Result<Vec<Job>, ExporterError>;
}

/// Drop hosted pools when the operator asked for them to be excluded. The
/// remote API cannot filter these server-side.
pub fn retain_operator_pools(pools: Vec<Pool>, exclude_hosted: bool) -> Vec<Pool> {
    if exclude_hosted {
        pools.into_iter().filter(|p| !p.is_hosted).collect()
    } else {
        pools
    }
}

pub struct HttpFleetClient {
    client: Client,
    server: String,
    address: String,
    collection: Option<String>,
    access_token: String,
    backoff: BackoffPolicy,
}

impl HttpFleetClient {
    pub fn new(
        client: Client,
        server: impl Into<String>,
        address: impl Into<String>,
        collection: Option<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            server: server.into(),
            address: address.into(),
            collection,
            access_token: access_token.into(),
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    fn build_url(&self, path: &str) -> String {
        let address = self.address.trim_end_matches('/');
        let base = match &self.collection {
            Some(collection) => format!("{address}/{collection}"),
            None => address.to_string(),
        };

        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Fetch one list endpoint, retrying transport-level failures, and
    /// unwrap the count-plus-value envelope. Decode errors are not
    /// retried; a malformed body will not improve on a second request.
    async fn get_envelope<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ExporterError> {
        let url = self.build_url(path);

        let body = with_backoff(path, &self.backoff, || async {
            let resp = self
                .client
                .get(&url)
                .basic_auth("", Some(&self.access_token))
                .send()
                .await
                .map_err(|e| ExporterError::Transport(format!("Call to {url} failed: {e}")))?;

            let status = resp.status();
            trace!(server = %self.server, url = %url, status = status.as_u16(), "Made HTTP request");

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(ExporterError::Authentication(format!(
                    "Access token rejected by {url} ({status})"
                )));
            }
            if !status.is_success() {
                return Err(ExporterError::UpstreamStatus {
                    status: status.as_u16(),
                    url: url.clone(),
                });
            }

            resp.bytes()
                .await
                .map_err(|e| ExporterError::Transport(format!("Failed to read body from {url}: {e}")))
        })
        .await?;

        let envelope: Envelope<T> = serde_json::from_slice(&body)
            .map_err(|e| ExporterError::Decode(format!("Invalid response from {url}: {e}")))?;
        Ok(envelope.value)
    }
}

#[async_trait]
impl FleetClient for HttpFleetClient {
    async fn pools(&self, exclude_hosted: bool) -> Result<Vec<Pool>, ExporterError> {
        let pools = self.get_envelope("/_apis/distributedtask/pools").await?;
        Ok(retain_operator_pools(pools, exclude_hosted))
    }

    async fn agents(&self, pool_id: i64) -> Result<Vec<Agent>, ExporterError> {
        self.get_envelope(&format!(
            "/_apis/distributedtask/pools/{pool_id}/agents?includeCapabilities=false&includeAssignedRequest=true"
        ))
        .await
    }

    async fn current_jobs(&self, pool_id: i64) -> Result<Vec<Job>, ExporterError> {
        self.get_envelope(&format!(
            "/_apis/distributedtask/pools/{pool_id}/jobrequests/?completedRequestCount=0"
        ))
        .await
    }
}
