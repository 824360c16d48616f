//! cognita-api
//!
//! The REST service: patients and their records, clinical questions
//! answered by the reasoning flow (blocking or streamed as server-sent
//! events) and pre-flight cost estimates.

use axum::Router;
use axum::http::HeaderValue;
use axum::middleware as axum_mw;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub mod audit;
pub mod config;
pub mod error;
pub mod middleware;
pub mod records;
pub mod routes;
pub mod state;

use state::AppState;

/// CORS for the web client. No origins configured means any origin.
pub fn cors_layer(allowed_origins: &[String]) -> eyre::Result<CorsLayer> {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = allowed_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o).map_err(|e| eyre::eyre!("invalid CORS origin {o:?}: {e}"))
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

pub fn app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/patients",
            get(routes::patients::list_patients).post(routes::patients::create_patient),
        )
        .route(
            "/patients/{id}",
            get(routes::patients::get_patient)
                .put(routes::patients::update_patient)
                .delete(routes::patients::delete_patient),
        )
        .route(
            "/patients/{id}/history",
            get(routes::history::get_history).put(routes::history::put_history),
        )
        .route(
            "/patients/{id}/tests",
            get(routes::tests::list_tests).post(routes::tests::create_test),
        )
        .route(
            "/patients/{id}/tests/{test_id}",
            get(routes::tests::get_test).delete(routes::tests::delete_test),
        )
        .route(
            "/patients/{id}/queries",
            get(routes::queries::list_queries).post(routes::queries::create_query),
        )
        .route(
            "/patients/{id}/queries/stream",
            post(routes::stream::stream_query),
        )
        .route(
            "/patients/{id}/queries/{query_id}",
            get(routes::queries::get_query).delete(routes::queries::delete_query),
        )
        .route(
            "/patients/{id}/queries/{query_id}/html",
            get(routes::queries::query_html),
        )
        .route(
            "/patients/{id}/queries/{query_id}/text",
            get(routes::queries::query_text),
        )
        .route("/cost/estimate", post(routes::cost::estimate_cost))
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(axum_mw::from_fn(middleware::audit::audit_log)),
        )
        .with_state(state)
}
