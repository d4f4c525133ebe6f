//! Rate limiting in front of every proxied route.

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::client_key::client_key;
use crate::error::ApiError;
use crate::metrics::{RATE_LIMITED_TOTAL, REQUEST_TOTAL, TRACKED_CLIENTS};
use crate::rate_limit::{RateLimitDecision, RateLimitPolicy};
use crate::state::AppState;

/// Budget a request is counted against. Each scope keeps separate windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Default,
    Auth,
}

impl Scope {
    pub fn for_path(path: &str, auth_prefix: &str) -> Self {
        let prefix = auth_prefix.trim_end_matches('/');
        let is_auth = path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
        if is_auth { Scope::Auth } else { Scope::Default }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Default => "default",
            Scope::Auth => "auth",
        }
    }

    fn policy<'a>(&self, state: &'a AppState) -> &'a RateLimitPolicy {
        match self {
            Scope::Default => &state.default_policy,
            Scope::Auth => &state.auth_policy,
        }
    }
}

/// Returns 429 with `Retry-After` once a client is over its budget.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    REQUEST_TOTAL.inc();

    let scope = Scope::for_path(req.uri().path(), &state.auth_prefix);
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let client = client_key(req.headers(), peer, state.trust_proxy);
    let key = format!("{}:{}", scope.as_str(), client);

    let decision = state.rate_limiter.check(&key, scope.policy(&state));
    TRACKED_CLIENTS.set(state.rate_limiter.len() as i64);

    if let RateLimitDecision::Rejected { retry_after_secs } = decision {
        RATE_LIMITED_TOTAL.inc();
        tracing::debug!(scope = scope.as_str(), %client, retry_after_secs, "rate limit exceeded");
        return Err(ApiError::RateLimitExceeded { retry_after_secs });
    }

    Ok(next.run(req).await)
}
