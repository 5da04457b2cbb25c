//! Collecting node runtime.
//!
//! Owns the [`CollectorPipeline`] and a small HTTP surface:
//!
//! | route | behavior |
//! |---|---|
//! | `GET /metrics` | collector counters (`total`, `byCategory`, `bySeverity`, relay and drop counts) |
//! | `GET /healthz` | 200, empty body |

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;

use logrelay_collector::{CollectorCounters, CollectorPipeline, CollectorSnapshot, Relay};
use logrelay_core::pipeline::Pipeline;

/// Build the collector HTTP router.
pub fn router(counters: Arc<CollectorCounters>) -> Router {
    Router::new()
        .route("/metrics", get(collector_metrics))
        .route("/healthz", get(healthz))
        .with_state(counters)
}

async fn collector_metrics(State(counters): State<Arc<CollectorCounters>>) -> Json<CollectorSnapshot> {
    Json(counters.snapshot().await)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Run the collector until `shutdown` resolves.
///
/// Starts the pipeline first so that a bind failure on the TCP intake
/// aborts before the HTTP listener comes up. On shutdown the HTTP server
/// stops first, then the pipeline drains its queue.
pub async fn run<R, F>(
    mut pipeline: CollectorPipeline<R>,
    http_listener: TcpListener,
    shutdown: F,
) -> Result<()>
where
    R: Relay,
    F: Future<Output = ()> + Send + 'static,
{
    pipeline
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start collector pipeline: {}", e))?;

    let http_addr = http_listener.local_addr()?;
    tracing::info!(http_addr = %http_addr, "collector http surface listening");

    let served = axum::serve(http_listener, router(pipeline.counters()))
        .with_graceful_shutdown(shutdown)
        .await;

    let health = pipeline.health_check().await;
    tracing::info!(health = %health, "shutting down collector");
    if let Err(e) = pipeline.stop().await {
        tracing::error!(error = %e, "failed to stop collector pipeline");
    }

    let snapshot = pipeline.snapshot().await;
    tracing::info!(
        total = snapshot.total,
        relayed = snapshot.relayed,
        relay_failures = snapshot.relay_failures,
        decode_errors = snapshot.decode_errors,
        dropped = snapshot.dropped,
        "collector stopped"
    );

    served.map_err(|e| anyhow::anyhow!("collector http server failed: {}", e))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn healthz_returns_ok() {
        let response = router(Arc::new(CollectorCounters::new()))
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
