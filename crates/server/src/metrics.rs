//! Prometheus metrics for the Folio server.
//!
//! # Security Note
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! It MUST be network-restricted to authorized scraper IPs at the
//! infrastructure level.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use folio_gc::SweepReport;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};
use std::time::Duration;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static GC_SWEEPS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("folio_gc_sweeps_total", "Total number of orphan sweeps run")
        .expect("metric creation failed")
});

pub static GC_SWEEPS_ABORTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "folio_gc_sweeps_aborted_total",
        "Total number of sweeps aborted because a reference scan failed",
    )
    .expect("metric creation failed")
});

pub static GC_CANDIDATES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "folio_gc_candidates_total",
        "Total number of candidate files examined by sweeps",
    )
    .expect("metric creation failed")
});

pub static GC_FILES_DELETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "folio_gc_files_deleted_total",
        "Total number of orphaned files deleted",
    )
    .expect("metric creation failed")
});

pub static GC_DELETE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "folio_gc_delete_failures_total",
        "Total number of orphaned files whose deletion failed",
    )
    .expect("metric creation failed")
});

pub static GC_SWEEP_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "folio_gc_sweep_duration_seconds",
            "Time taken by one orphan sweep",
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .expect("metric creation failed")
});

pub static ACCOUNT_DELETIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "folio_account_deletions_total",
            "Total account deletion attempts by result",
        ),
        &["result"],
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so tests and embedded routers may call it freely.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(GC_SWEEPS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(GC_SWEEPS_ABORTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(GC_CANDIDATES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(GC_FILES_DELETED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(GC_DELETE_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(GC_SWEEP_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ACCOUNT_DELETIONS.clone()))
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

/// Record the outcome of one sweep. `elapsed` is `None` when the sweep ran
/// inside a larger operation and was not timed on its own.
pub fn record_sweep(report: &SweepReport, elapsed: Option<Duration>) {
    if report.candidates == 0 {
        return;
    }
    GC_SWEEPS.inc();
    GC_CANDIDATES.inc_by(report.candidates as u64);
    GC_FILES_DELETED.inc_by(report.deleted.len() as u64);
    GC_DELETE_FAILURES.inc_by(report.failed.len() as u64);
    if report.aborted {
        GC_SWEEPS_ABORTED.inc();
    }
    if let Some(elapsed) = elapsed {
        GC_SWEEP_DURATION.observe(elapsed.as_secs_f64());
    }
}

/// Helper to record account deletions by result.
pub fn record_account_deletion(result: &str) {
    ACCOUNT_DELETIONS.with_label_values(&[result]).inc();
}
