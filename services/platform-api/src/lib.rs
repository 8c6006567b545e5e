//! Fanvault Platform API
//!
//! HTTP surface over content access and billing.
//!
//! ## REST Endpoints
//!
//! - `GET /api/v1/feed` - Newest content across creators, gated per item
//! - `GET /api/v1/creators/{id}/feed` - Newest content of one creator
//! - `GET /api/v1/content/{id}` - One content item
//! - `POST /api/v1/content/{id}/view` - Count a view of a granted item
//! - `GET /api/v1/me/subscriptions` - Caller's active subscriptions
//! - `POST /webhooks/stripe` - Stripe webhook handler
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check
//! - `GET /metrics` - Prometheus metrics

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use crate::handlers::{health, ready};

/// Build the HTTP router
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    let api_v1 = Router::new()
        // Feed routes
        .route("/feed", get(handlers::list_feed))
        .route("/creators/{id}/feed", get(handlers::list_creator_feed))
        // Content routes
        .route("/content/{id}", get(handlers::get_content))
        .route("/content/{id}/view", post(handlers::record_view))
        // Caller routes
        .route("/me/subscriptions", get(handlers::list_my_subscriptions));

    // Webhook route (separate - uses raw body, no JSON parsing)
    let webhook_routes = Router::new().route("/webhooks/stripe", post(handlers::stripe_webhook));

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Outermost first
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(webhook_routes)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}
