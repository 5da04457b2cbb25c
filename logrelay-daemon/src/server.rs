//! Central node HTTP surface.
//!
//! | route | behavior |
//! |---|---|
//! | `POST /ingest` | Record JSON body; 400 invalid JSON, 500 store failure, 202 accepted |
//! | `GET /logs` | filtered, optionally sorted and limited JSON array of Records |
//! | `GET /metrics` | `{"total","by_category","by_severity"}` |
//! | `GET /healthz` | 200, empty body |

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;

use logrelay_core::config::ServerSection;
use logrelay_core::metrics as m;
use logrelay_core::types::{CounterSnapshot, Record};
use logrelay_store::{DynLogStore, FileBackedStore, InMemoryStore, QueryFilter};

/// Store handle shared by all handlers.
pub type SharedStore = Arc<dyn DynLogStore>;

/// Open the store backend selected by `[server].store`.
///
/// The file backend replays its backing log before returning; a replay
/// failure is fatal.
pub async fn open_store(section: &ServerSection) -> Result<SharedStore> {
    match section.store.as_str() {
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        "file" => {
            let store = FileBackedStore::open(&section.store_path)
                .await
                .map_err(|e| {
                    anyhow::anyhow!("failed to open file store {}: {}", section.store_path, e)
                })?;
            Ok(Arc::new(store))
        }
        other => Err(anyhow::anyhow!(
            "unknown store backend '{}', expected 'memory' or 'file'",
            other
        )),
    }
}

/// Build the central node router.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/ingest", post(ingest))
        .route("/logs", get(logs))
        .route("/metrics", get(store_metrics))
        .route("/healthz", get(healthz))
        .with_state(store)
}

/// Serve the central node until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, store: SharedStore, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(listen_addr = %addr, backend = store.backend(), "log server listening");
    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("log server failed: {}", e))?;
    tracing::info!("log server stopped");
    Ok(())
}

async fn ingest(State(store): State<SharedStore>, body: Bytes) -> StatusCode {
    let record: Record = match serde_json::from_slice(&body) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(error = %e, "rejected invalid ingest body");
            metrics::counter!(m::SERVER_INGEST_FAILURES_TOTAL, m::LABEL_RESULT => "invalid").increment(1);
            return StatusCode::BAD_REQUEST;
        }
    };

    match store.ingest(record).await {
        Ok(()) => {
            metrics::counter!(m::SERVER_RECORDS_INGESTED_TOTAL, m::LABEL_BACKEND => store.backend())
                .increment(1);
            metrics::gauge!(m::SERVER_STORED_RECORDS).set(store.len().await as f64);
            StatusCode::ACCEPTED
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to ingest record");
            metrics::counter!(m::SERVER_INGEST_FAILURES_TOTAL, m::LABEL_RESULT => "store").increment(1);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Raw `/logs` query parameters.
///
/// Everything is taken as text so malformed values are ignored instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct LogsParams {
    pub service: Option<String>,
    pub level: Option<String>,
    pub username: Option<String>,
    #[serde(rename = "is.blacklisted")]
    pub is_blacklisted: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
}

impl LogsParams {
    /// Convert to a store filter.
    ///
    /// `is.blacklisted` is true for "true" (any case) or "1" and false for any
    /// other non-empty value. A non-numeric or non-positive `limit` is ignored.
    pub fn into_filter(self) -> QueryFilter {
        QueryFilter {
            service: self.service,
            level: self.level,
            username: self.username,
            is_blacklisted: self
                .is_blacklisted
                .filter(|v| !v.is_empty())
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1"),
            limit: self
                .limit
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|n| *n > 0)
                .and_then(|n| usize::try_from(n).ok()),
            sort: self.sort,
        }
    }
}

async fn logs(
    State(store): State<SharedStore>,
    Query(params): Query<LogsParams>,
) -> Json<Vec<Record>> {
    let filter = params.into_filter();
    metrics::counter!(m::SERVER_QUERIES_TOTAL).increment(1);
    Json(store.query(&filter).await)
}

async fn store_metrics(State(store): State<SharedStore>) -> Json<CounterSnapshot> {
    Json(store.metrics().await)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
