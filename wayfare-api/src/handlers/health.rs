use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    storage: &'static str,
    database: &'static str,
    redis: &'static str,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database = match &state.db {
        None => "n/a",
        Some(db) => match db.ping().await {
            Ok(()) => "up",
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                "down"
            }
        },
    };
    // Redis only backs caching and rate limiting, so it never fails the check.
    let redis = match &state.redis {
        None => "n/a",
        Some(redis) => match redis.ping().await {
            Ok(()) => "up",
            Err(e) => {
                warn!(error = %e, "Redis health check failed");
                "down"
            }
        },
    };

    let healthy = database != "down";
    let report = HealthReport {
        status: if healthy { "ok" } else { "degraded" },
        storage: if state.db.is_some() { "postgres" } else { "memory" },
        database,
        redis,
    };
    let code = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(report))
}
