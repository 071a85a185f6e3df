use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::future::join_all;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::errors::ExporterError;
use crate::metrics::ScrapeFamilies;
use crate::pipeline::FleetCollector;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

#[derive(Clone)]
pub struct AppState {
    pub collectors: Arc<Vec<FleetCollector>>,
}

pub fn build_router(state: AppState, endpoint: &str) -> Router {
    Router::new()
        .route(endpoint, get(scrape))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn scrape(State(state): State<AppState>) -> Response {
    match run_scrape(&state).await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Scrape failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Run one collection cycle per configured server, concurrently, and
/// encode whatever the gates released. A server whose pool list could not
/// be fetched contributes nothing, not even its cycle duration.
async fn run_scrape(state: &AppState) -> Result<String, ExporterError> {
    let families = ScrapeFamilies::new()?;

    let cycles = join_all(state.collectors.iter().map(|c| c.collect())).await;
    for (collector, outcome) in state.collectors.iter().zip(cycles) {
        match outcome {
            Ok(report) => {
                for record in &report.records {
                    families.record(collector.server_name(), record);
                }
                families
                    .record_cycle_duration(collector.server_name(), report.duration.as_secs_f64());
                info!(
                    server = collector.server_name(),
                    records = report.records.len(),
                    suppressed = report.suppressed,
                    duration_secs = report.duration.as_secs_f64(),
                    "Cycle complete"
                );
            }
            Err(e) => {
                error!(server = collector.server_name(), error = %e, "Cycle aborted");
            }
        }
    }

    families.encode()
}
