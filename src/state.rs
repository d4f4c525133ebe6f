use std::sync::Arc;
use std::time::Duration;

use crate::config::Args;
use crate::error::ConfigError;
use crate::load_balancer::UpstreamPool;
use crate::rate_limit::{RateLimitPolicy, RateLimiter};

// app's shared state, built once by main and handed to the router
pub struct AppState {
    pub client: reqwest::Client,
    pub pool: Arc<UpstreamPool>,
    pub rate_limiter: RateLimiter,
    pub default_policy: RateLimitPolicy,
    pub auth_policy: RateLimitPolicy,
    pub auth_prefix: String,
    pub trust_proxy: bool,
    pub max_body_bytes: usize,
    pub health_interval: Duration,
}

impl AppState {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        Ok(Self {
            client: reqwest::Client::new(),
            pool: Arc::new(UpstreamPool::new(&args.upstreams)?),
            rate_limiter: RateLimiter::new(),
            default_policy: args.default_policy()?,
            auth_policy: args.auth_policy()?,
            auth_prefix: args.auth_prefix.clone(),
            trust_proxy: args.trust_proxy,
            max_body_bytes: args.max_body_bytes,
            health_interval: args.health_interval()?,
        })
    }
}
