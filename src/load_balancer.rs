use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::time::{Duration, interval};

use crate::error::ConfigError;
use crate::metrics::HEALTHY_UPSTREAMS;

// Single upstream instance of the exam app
#[derive(Debug)]
pub struct Upstream {
    pub url: String,
    healthy: AtomicBool,
}

impl Upstream {
    pub fn new(url: String) -> Self {
        Self {
            url,
            healthy: AtomicBool::new(true),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    // Returns the previous state
    pub fn set_healthy(&self, healthy: bool) -> bool {
        self.healthy.swap(healthy, Ordering::Relaxed)
    }
}

/// Round-robin pool over the configured upstreams.
#[derive(Debug)]
pub struct UpstreamPool {
    upstreams: Vec<Arc<Upstream>>,
    current: AtomicUsize,
}

impl UpstreamPool {
    // Build from comma-separated urls "localhost:3000, localhost:3001"
    pub fn new(upstreams_str: &str) -> Result<Self, ConfigError> {
        let upstreams: Vec<Arc<Upstream>> = upstreams_str
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|url| {
                let full_url = if url.starts_with("http://") || url.starts_with("https://") {
                    url.trim_end_matches('/').to_string()
                } else {
                    format!("http://{}", url.trim_end_matches('/'))
                };
                Arc::new(Upstream::new(full_url))
            })
            .collect();

        if upstreams.is_empty() {
            return Err(ConfigError::NoUpstreams);
        }

        for (i, u) in upstreams.iter().enumerate() {
            tracing::info!(index = i + 1, url = %u.url, "upstream registered");
        }
        HEALTHY_UPSTREAMS.set(upstreams.len() as i64);

        Ok(Self {
            upstreams,
            current: AtomicUsize::new(0),
        })
    }

    // Next healthy upstream (round-robin), None if all are down
    pub fn next_upstream(&self) -> Option<Arc<Upstream>> {
        let len = self.upstreams.len();
        let start = self.current.fetch_add(1, Ordering::Relaxed) % len;

        (0..len)
            .map(|i| &self.upstreams[(start + i) % len])
            .find(|u| u.is_healthy())
            .map(Arc::clone)
    }

    pub fn all(&self) -> &[Arc<Upstream>] {
        &self.upstreams
    }

    pub fn healthy_count(&self) -> usize {
        self.upstreams.iter().filter(|u| u.is_healthy()).count()
    }

    // Marks an upstream down after a failed proxy call
    pub fn mark_unhealthy(&self, upstream: &Upstream) {
        if upstream.set_healthy(false) {
            tracing::warn!(url = %upstream.url, "upstream marked unhealthy");
        }
        HEALTHY_UPSTREAMS.set(self.healthy_count() as i64);
    }
}

/// Polls every upstream's health endpoint forever, flipping health flags.
pub async fn health_checker(
    pool: Arc<UpstreamPool>,
    client: reqwest::Client,
    health_path: String,
    check_interval: Duration,
) {
    let mut interval = interval(check_interval);

    tracing::info!(interval = ?check_interval, path = %health_path, "health checker started");

    loop {
        interval.tick().await;

        for upstream in pool.all() {
            let url = format!("{}{}", upstream.url, health_path);

            let is_healthy = match client.get(&url).timeout(Duration::from_secs(5)).send().await {
                Ok(res) => res.status().is_success(),
                Err(_) => false,
            };
            let was_healthy = upstream.set_healthy(is_healthy);

            if was_healthy != is_healthy {
                if is_healthy {
                    tracing::info!(url = %upstream.url, "upstream is healthy again");
                } else {
                    tracing::warn!(url = %upstream.url, "upstream failed health check");
                }
            }
        }

        HEALTHY_UPSTREAMS.set(pool.healthy_count() as i64);
    }
}
