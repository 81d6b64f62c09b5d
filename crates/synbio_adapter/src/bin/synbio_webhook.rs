#![forbid(unsafe_code)]

use std::{env, net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use synbio_adapter::{AdapterRuntime, WebhookHealthResponse, WebhookTurnRequest};
use synbio_engines::fetch::HttpFetcher;
use synbio_os::router::startup_intent_map_check;

type SharedRuntime = Arc<AdapterRuntime<HttpFetcher>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A broken intent map is a deployment fault; refuse to serve at all.
    startup_intent_map_check()?;

    let bind = env::var("SYNBIO_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;
    let runtime: SharedRuntime = Arc::new(AdapterRuntime::default_from_env()?);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/webhook", post(run_webhook_turn))
        .with_state(runtime);

    println!("synbio_webhook listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz(State(runtime): State<SharedRuntime>) -> (StatusCode, Json<WebhookHealthResponse>) {
    let report = runtime.health_report();
    let status = if report.status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(report))
}

async fn run_webhook_turn(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<WebhookTurnRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    match runtime.run_webhook_turn(request) {
        Ok(response) => match serde_json::to_value(&response) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_body(format!("response serialization failed: {err}"))),
            ),
        },
        Err(reason) => (StatusCode::BAD_REQUEST, Json(error_body(reason))),
    }
}

fn error_body(reason: String) -> serde_json::Value {
    serde_json::json!({ "status": "error", "reason": reason })
}
