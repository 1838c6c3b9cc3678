//! HTTP Server and Scrape Handling
//!
//! Axum-based exporter surface with `/metrics`, `/health` and a landing
//! page. Every `/metrics` request drives one full collection cycle: the
//! blocking pseudo-filesystem walk runs on the blocking pool and hands
//! samples over an unbounded channel, the handler drains the channel
//! concurrently and renders the batch once the walk finishes.
//!
//! There is no cached state between scrapes; the topology is re-read every
//! time, so Prometheus always sees a fresh correlation pass.

use crate::collectors::LioCollector;
use crate::config::Config;
use crate::fs::SysFs;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    collector: Arc<LioCollector>,
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let collector = Arc::new(LioCollector::new(Arc::new(SysFs), &config.lio));
    let state = AppState { collector };

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}/metrics", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// One collection cycle: walk on the blocking pool, drain concurrently,
/// render once the sender side is dropped.
async fn scrape(collector: &Arc<LioCollector>) -> anyhow::Result<String> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let walker = Arc::clone(collector);
    let cycle = tokio::task::spawn_blocking(move || walker.collect(&tx));

    let mut samples = Vec::new();
    while let Some(sample) = rx.recv().await {
        samples.push(sample);
    }
    cycle.await??;

    collector.descs().render(&samples)
}

async fn root_handler() -> impl IntoResponse {
    r#"<html>
<head><title>LIO Exporter</title></head>
<body>
<h1>iSCSI LIO Prometheus Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match scrape(&state.collector).await {
        Ok(body) => body.into_response(),
        Err(e) => {
            error!("Failed to collect metrics: {}", e);
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error collecting metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    // The exporter is healthy even when the target subsystem is absent;
    // that state renders as an empty scrape, not an outage.
    (axum::http::StatusCode::OK, "OK")
}
