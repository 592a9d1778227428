//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Identity linking
    pub static ref IDENTITY_LINKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("crossposter_identity_links_total", "Total number of OAuth callbacks processed"),
        &["provider", "outcome"]
    ).expect("metric can be created");
    pub static ref BOOTSTRAPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("crossposter_bootstraps_total", "Total number of last-post-id bootstraps"),
        &["provider", "result"]
    ).expect("metric can be created");

    // Upstream API Metrics
    pub static ref UPSTREAM_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("crossposter_upstream_requests_total", "Total number of requests to Twitter/Mastodon"),
        &["provider", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref UPSTREAM_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "crossposter_upstream_request_duration_seconds",
            "Upstream request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["provider", "endpoint"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("crossposter_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(IDENTITY_LINKS_TOTAL.clone()))
        .expect("IDENTITY_LINKS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(BOOTSTRAPS_TOTAL.clone()))
        .expect("BOOTSTRAPS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(UPSTREAM_REQUESTS_TOTAL.clone()))
        .expect("UPSTREAM_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(UPSTREAM_REQUEST_DURATION_SECONDS.clone()))
        .expect("UPSTREAM_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Record one upstream call.
pub fn observe_upstream(provider: &str, endpoint: &str, status: &str, elapsed: Duration) {
    UPSTREAM_REQUESTS_TOTAL
        .with_label_values(&[provider, endpoint, status])
        .inc();
    UPSTREAM_REQUEST_DURATION_SECONDS
        .with_label_values(&[provider, endpoint])
        .observe(elapsed.as_secs_f64());
}
