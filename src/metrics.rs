use lazy_static::lazy_static;
use prometheus::{
    Counter, Histogram, IntGauge, register_counter, register_histogram, register_int_gauge,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gateway_requests_total", "Total number of requests evaluated").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter = register_counter!(
        "gateway_rate_limited_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();
    pub static ref UPSTREAM_ERRORS: Counter = register_counter!(
        "gateway_upstream_errors_total",
        "Proxied requests that failed to reach an upstream"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "gateway_request_latency_seconds",
        "Latency of proxied requests in seconds"
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: IntGauge = register_int_gauge!(
        "gateway_tracked_clients",
        "Live rate limit windows"
    )
    .unwrap();
    pub static ref HEALTHY_UPSTREAMS: IntGauge =
        register_int_gauge!("gateway_healthy_upstreams", "Upstreams passing health checks")
            .unwrap();
}
