//! Prometheus metrics for the menuboard server.
//!
//! The `/metrics` endpoint is unauthenticated. It only exposes aggregate
//! counters, but it should still be network-restricted to the scraper.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Gallery metrics
pub static IMAGES_RESOLVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "menuboard_images_resolved_total",
        "Total image records returned by gallery resolution",
    )
    .expect("metric creation failed")
});

pub static BACKEND_LISTING_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "menuboard_backend_listing_failures_total",
            "Backend listings that failed and were treated as empty",
        ),
        &["backend"],
    )
    .expect("metric creation failed")
});

// Admin image metrics
pub static ADMIN_UPLOADS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "menuboard_admin_uploads_total",
        "Total admin images stored",
    )
    .expect("metric creation failed")
});

pub static ADMIN_DELETES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "menuboard_admin_deletes_total",
        "Total admin image deletions",
    )
    .expect("metric creation failed")
});

// Session metrics
pub static LOGIN_ATTEMPTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "menuboard_login_attempts_total",
            "Login attempts by outcome",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(IMAGES_RESOLVED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BACKEND_LISTING_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ADMIN_UPLOADS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ADMIN_DELETES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(LOGIN_ATTEMPTS.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record a login attempt.
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    LOGIN_ATTEMPTS.with_label_values(&[outcome]).inc();
}
