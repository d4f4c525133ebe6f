use clap::Parser;
use std::time::Duration;

use crate::error::ConfigError;
use crate::rate_limit::RateLimitPolicy;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "exam-gateway", version)]
#[command(about = "Rate-limiting gateway in front of the exam analysis app")]
pub struct Args {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "EXAM_GATEWAY_HOST")]
    pub host: String,

    /// Port to run the server on
    #[arg(short, long, default_value_t = 8080, env = "EXAM_GATEWAY_PORT")]
    pub port: u16,

    /// Upstream app instances (comma-separated), e.g. "localhost:3000,localhost:3001"
    #[arg(short, long, default_value = "localhost:3000", env = "EXAM_GATEWAY_UPSTREAMS")]
    pub upstreams: String,

    /// Max requests per client per window
    #[arg(long, default_value_t = 100, env = "EXAM_GATEWAY_RATE_LIMIT")]
    pub rate_limit: u32,

    /// Rate limit window in milliseconds
    #[arg(long, default_value_t = 60_000, env = "EXAM_GATEWAY_RATE_WINDOW_MS")]
    pub rate_window_ms: u64,

    /// Max requests per client per window on auth routes
    #[arg(long, default_value_t = 10, env = "EXAM_GATEWAY_AUTH_RATE_LIMIT")]
    pub auth_rate_limit: u32,

    /// Auth rate limit window in milliseconds
    #[arg(long, default_value_t = 60_000, env = "EXAM_GATEWAY_AUTH_RATE_WINDOW_MS")]
    pub auth_rate_window_ms: u64,

    /// Path prefix of login, registration and two-factor routes
    #[arg(long, default_value = "/api/auth", env = "EXAM_GATEWAY_AUTH_PREFIX")]
    pub auth_prefix: String,

    /// Take the client address from X-Forwarded-For / X-Real-IP
    #[arg(long, env = "EXAM_GATEWAY_TRUST_PROXY")]
    pub trust_proxy: bool,

    /// Upstream path polled by the health checker
    #[arg(long, default_value = "/api/health", env = "EXAM_GATEWAY_HEALTH_PATH")]
    pub health_path: String,

    /// Health check interval in seconds
    #[arg(long, default_value_t = 30, env = "EXAM_GATEWAY_HEALTH_INTERVAL")]
    pub health_interval: u64,

    /// Largest request body forwarded upstream, in bytes
    #[arg(long, default_value_t = 10 * 1024 * 1024, env = "EXAM_GATEWAY_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info", env = "EXAM_GATEWAY_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: "text" or "json"
    #[arg(long, default_value = "text", env = "EXAM_GATEWAY_LOG_FORMAT")]
    pub log_format: String,
}

impl Args {
    pub fn default_policy(&self) -> Result<RateLimitPolicy, ConfigError> {
        RateLimitPolicy::new(self.rate_limit, Duration::from_millis(self.rate_window_ms))
    }

    pub fn auth_policy(&self) -> Result<RateLimitPolicy, ConfigError> {
        RateLimitPolicy::new(
            self.auth_rate_limit,
            Duration::from_millis(self.auth_rate_window_ms),
        )
    }

    pub fn json_logs(&self) -> Result<bool, ConfigError> {
        match self.log_format.as_str() {
            "text" => Ok(false),
            "json" => Ok(true),
            other => Err(ConfigError::UnknownLogFormat(other.to_string())),
        }
    }

    // tokio intervals cannot tick with a zero period
    pub fn health_interval(&self) -> Result<Duration, ConfigError> {
        if self.health_interval == 0 {
            return Err(ConfigError::ZeroHealthInterval);
        }
        Ok(Duration::from_secs(self.health_interval))
    }
}
