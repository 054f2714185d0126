//! HTTP API server for the grocery order engine.
//!
//! Provides REST endpoints for the shopper's cart and the order lifecycle,
//! with structured logging (tracing) and Prometheus metrics. Caller
//! identity arrives in gateway headers, see [`auth::Caller`].

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use doc_store::DocumentStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/cart", get(routes::cart::get::<S>))
        .route("/api/cart/count", get(routes::cart::count::<S>))
        .route("/api/cart/add", post(routes::cart::add::<S>))
        .route("/api/cart/update", put(routes::cart::update::<S>))
        .route("/api/cart/remove/{product_id}", delete(routes::cart::remove::<S>))
        .route("/api/cart/clear", delete(routes::cart::clear::<S>))
        .route("/api/cart/apply-coupon", post(routes::cart::apply_coupon::<S>))
        .route("/api/cart/remove-coupon", delete(routes::cart::remove_coupon::<S>))
        .route("/api/orders", post(routes::orders::create::<S>))
        .route("/api/orders/my", get(routes::orders::list_mine::<S>))
        .route("/api/orders/all", get(routes::orders::list_all::<S>))
        .route("/api/orders/{id}", get(routes::orders::get::<S>))
        .route("/api/orders/{id}/status", put(routes::orders::update_status::<S>))
        .route("/api/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/api/orders/{id}/reorder", post(routes::orders::reorder::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
