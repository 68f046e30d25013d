//! REST API route handlers.
//!
//! `GET /api/flights?lat=..&lon=..&radius=..` validates the query, runs the
//! pipeline and maps failures onto status codes. Only OpenSky failures reach
//! the client; enrichment problems just leave `N/A` in the records.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::header::RETRY_AFTER;
use http::HeaderValue;
use serde::Deserialize;
use serde_json::json;

use crate::opensky::UpstreamError;
use crate::pipeline::{now_epoch, PipelineError, QueryError};
use crate::web::AppState;

// ---------------------------------------------------------------------------
// Query param types
// ---------------------------------------------------------------------------

/// Raw values; numeric validation happens in the pipeline so bad input
/// gets our error body instead of axum's rejection text.
#[derive(Deserialize)]
pub struct FlightParams {
    lat: Option<String>,
    lon: Option<String>,
    radius: Option<String>,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn bad_request(err: &QueryError) -> Response {
    tracing::debug!(error = %err, "Rejected flights query");
    (StatusCode::BAD_REQUEST, Json(json!({"error": err.to_string()}))).into_response()
}

fn upstream_error_response(err: UpstreamError, retry_after_secs: u64) -> Response {
    match err {
        UpstreamError::Unavailable { attempts, message } => {
            tracing::warn!(attempts, error = %message, "OpenSky unavailable");
            let mut response = (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Flight data service temporarily unavailable",
                    "details": format!(
                        "OpenSky API did not respond after {attempts} attempts. Please try again later."
                    ),
                    "code": "OPENSKY_TIMEOUT",
                    "retryAfter": retry_after_secs,
                    "timestamp": now_epoch(),
                })),
            )
                .into_response();
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
            response
        }
        UpstreamError::Status { status, body } => {
            let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            let details = if code == StatusCode::UNAUTHORIZED {
                "Authentication failed".to_string()
            } else {
                body
            };
            (
                code,
                Json(json!({
                    "error": "Failed to fetch flight data",
                    "details": details,
                })),
            )
                .into_response()
        }
        err @ (UpstreamError::Decode(_) | UpstreamError::Request(_)) => {
            tracing::error!(error = %err, "Flights query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn api_flights(
    State(state): State<Arc<AppState>>,
    params: Result<Query<FlightParams>, QueryRejection>,
) -> Response {
    // Repeated keys are the only way the string-typed params can fail.
    let Ok(Query(params)) = params else {
        return bad_request(&QueryError::Invalid);
    };

    let result = state
        .pipeline
        .query(
            params.lat.as_deref(),
            params.lon.as_deref(),
            params.radius.as_deref(),
        )
        .await;

    match result {
        Ok(flights) => Json(flights).into_response(),
        Err(PipelineError::InvalidQuery(e)) => bad_request(&e),
        Err(PipelineError::Upstream(e)) => {
            upstream_error_response(e, state.pipeline.settings().retry_after_secs)
        }
    }
}

pub async fn api_preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({"error": "Method not allowed"})),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
