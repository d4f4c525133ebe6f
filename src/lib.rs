//! Rate-limiting gateway for the exam analysis app.
//!
//! Every request except `/health` and `/metrics` is counted against a
//! fixed-window budget for its client before being forwarded upstream.

pub mod client_key;
pub mod config;
pub mod error;
pub mod handlers;
pub mod load_balancer;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod state;

use axum::{Router, middleware::from_fn_with_state, routing::get};
use std::sync::Arc;

use crate::handlers::{health_handler, metrics_handler, proxy_handler};
use crate::middleware::rate_limit_middleware;
use crate::state::AppState;

pub use crate::rate_limit::{RateLimitDecision, RateLimitEntry, RateLimitPolicy, RateLimiter};

/// Builds the gateway router. Serve it with connect info so clients can be
/// told apart by address.
pub fn router(state: Arc<AppState>) -> Router {
    let proxied = Router::new()
        .fallback(proxy_handler)
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(proxied)
        .with_state(state)
}
