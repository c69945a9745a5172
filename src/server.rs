//! HTTP entry point.
//!
//! `GET /` and `GET /reading-list` call the orchestrator and answer with the
//! reading list as `application/json`. A failed pipeline answers 502 with the
//! failure kind only; details stay in the logs.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::auth::Credentials;
use crate::service::ReadingListService;

/// Shared state for request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Orchestrator; each request runs its own pipeline on a miss.
    pub service: Arc<ReadingListService>,
    /// Account the list belongs to.
    pub credentials: Arc<Credentials>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(reading_list_handler))
        .route("/reading-list", get(reading_list_handler))
        .with_state(state)
}

/// Serves the router on `listener` until the task is cancelled.
///
/// # Errors
///
/// Returns the IO error that stopped the server.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "serving reading list");
    }
    axum::serve(listener, router(state)).await
}

async fn reading_list_handler(State(state): State<AppState>) -> Response {
    match state.service.get_reading_list_json(&state.credentials).await {
        Ok(json) => {
            info!(source = ?json.source, "reading list response");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                json.body,
            )
                .into_response()
        }
        Err(err) => {
            error!(kind = %err.kind(), error = %err, "reading list request failed");
            (
                StatusCode::BAD_GATEWAY,
                axum::Json(ErrorBody {
                    error: err.kind().as_str(),
                }),
            )
                .into_response()
        }
    }
}
