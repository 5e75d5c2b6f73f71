use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::GasCostAggregator,
    error::GasSummaryError,
    models::AggregateResult,
    summary_stats::{SummarySnapshot, SUMMARY_STATS},
};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: GasCostAggregator,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct SummaryQuery {
    address: Option<String>,
}

struct ApiError(GasSummaryError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            GasSummaryError::Validation(_) => StatusCode::BAD_REQUEST,
            GasSummaryError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn gas_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<AggregateResult>, ApiError> {
    SUMMARY_STATS.inc_requests();
    let address = query.address.unwrap_or_default();

    match state.aggregator.compute_gas_summary(&address).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => {
            SUMMARY_STATS.inc_failed_requests();
            if let GasSummaryError::Upstream(ref upstream) = err {
                tracing::error!(address = %address, error = %upstream, "gas summary failed");
            }
            Err(ApiError(err))
        }
    }
}

async fn summary_stats() -> Json<SummarySnapshot> {
    Json(SUMMARY_STATS.snapshot())
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/gas-summary", get(gas_summary))
        .route("/stats/summary", get(summary_stats))
        .with_state(state)
}

pub async fn run_http_server(addr: &str, state: AppState) -> Result<()> {
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
