//! HTTP handlers

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State as AxumState},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing,
};
use std::collections::HashMap;
use tracing::{debug, error, info};

use crate::SharedState;
use crate::pipeline::run_deploy;
use crate::webhook::WebhookPayload;

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::any(root))
        .route("/webhook", routing::any(handle_webhook))
        .fallback(root)
        .with_state(state)
}

pub async fn root() -> &'static str {
    "Hello!"
}

/// Handles a push webhook, whatever the method. The whole deploy runs before
/// the response is sent; deploy failures go to the chat, so anything that
/// decodes gets a 200.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let dry_run = params.get("dry_run").map(|v| v == "true").unwrap_or(false)
        || headers.get("X-Dry-Run").is_some();

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            error!("Error decoding JSON: {}", e);
            return (StatusCode::BAD_REQUEST, "Error decoding JSON").into_response();
        }
    };
    debug!("{:#?}", &payload);

    let Some(commit) = payload.head_commit() else {
        info!("Push payload has no commits, nothing to deploy");
        return (StatusCode::BAD_REQUEST, "Payload contains no commits").into_response();
    };

    info!(
        "Push to {} by {} ({})",
        payload.repository.html_url, commit.author.name, commit.url
    );
    let report = run_deploy(&state, commit, &payload.sender.html_url, dry_run).await;
    debug!("Responding 200 for deploy {}", report.deploy_id);

    StatusCode::OK.into_response()
}
