//! Webhook handler for GitHub push events

use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
};
use tracing::{error, info, warn};

use crate::SharedState;
use crate::deploy::Deployer as _;
use crate::signature::verify_github_signature;

/// Fallback for every path other than the webhook endpoint.
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Handles the GitHub webhook POST request.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    // The HMAC is computed over the exact bytes received, never a reparse
    let signature = headers
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok());
    if !verify_github_signature(&state.webhook_secret, &body, signature) {
        warn!("Signature verification failed");
        return (StatusCode::UNAUTHORIZED, "Invalid signature".to_string());
    }

    // Parse body as JSON and extract "ref"
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            info!("Could not parse JSON body: {:?}", e);
            return (StatusCode::BAD_REQUEST, "Invalid payload".to_string());
        }
    };
    let Some(git_ref) = payload.get("ref").and_then(|r| r.as_str()) else {
        info!("No ref field in push event payload");
        return (StatusCode::BAD_REQUEST, "Invalid payload".to_string());
    };

    // Find the target tracking the pushed ref
    let Some(target) = state.config.find_target(git_ref) else {
        info!("No matching target for ref '{}', skipping.", git_ref);
        return (StatusCode::OK, "No action taken.".to_string());
    };

    // Deployments for the same target are serialized; concurrent pushes to
    // the same ref must not race in one working directory. Other targets
    // proceed in parallel.
    let Some(lock) = state.lock_for(&target.name) else {
        error!("No deploy lock for target '{}'", target.name);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error building.".to_string(),
        );
    };
    let _guard = lock.lock().await;

    info!(
        "Push event for target '{}' ({}). Starting deployment.",
        target.name, git_ref
    );

    match state.deployer.deploy(target).await {
        Ok(()) => {
            info!("Deployment for target '{}' completed.", target.name);
            (StatusCode::OK, "Completed build.".to_string())
        }
        Err(e) => {
            error!("Deployment for target '{}' failed: {}", target.name, e);
            let message = match e.command() {
                Some(command) => format!("Error building. (command: {})", command),
                None => "Error building.".to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}
