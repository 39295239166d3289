//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with pipeline-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Metrics prefix for all docket metrics
pub const METRICS_PREFIX: &str = "docket";

/// Histogram buckets for answer latency (in seconds).
/// Every question re-fetches, re-chunks and re-embeds the document,
/// so the tail is long by construction.
pub const ANSWER_BUCKETS: &[f64] = &[
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 60s
];

/// Buckets for embedding request latency
pub const EMBEDDING_BUCKETS: &[f64] = &[
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
];

/// Install the Prometheus recorder and return the render handle
pub fn setup_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_answer_duration_seconds", METRICS_PREFIX)),
            ANSWER_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_reindex_duration_seconds", METRICS_PREFIX)),
            ANSWER_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_embedding_duration_seconds", METRICS_PREFIX)),
            EMBEDDING_BUCKETS,
        )?
        .install_recorder()
}

/// Register all metric descriptions
pub fn register_metrics() {
    // Question metrics
    describe_counter!(
        format!("{}_questions_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of questions answered"
    );

    describe_histogram!(
        format!("{}_answer_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end answer latency in seconds"
    );

    // Reindex metrics
    describe_counter!(
        format!("{}_reindex_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Total clear-and-rebuild index runs"
    );

    describe_histogram!(
        format!("{}_reindex_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Clear-and-rebuild index latency in seconds"
    );

    describe_counter!(
        format!("{}_chunks_indexed_total", METRICS_PREFIX),
        Unit::Count,
        "Total chunks written to the vector table"
    );

    // Document metrics
    describe_counter!(
        format!("{}_document_downloads_total", METRICS_PREFIX),
        Unit::Count,
        "Times the source document was downloaded"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API errors"
    );

    // Model metrics
    describe_counter!(
        format!("{}_model_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total chat completion requests"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record question metrics
pub fn record_question(duration_secs: f64, outcome: &str) {
    counter!(
        format!("{}_questions_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_answer_duration_seconds", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .record(duration_secs);
}

/// Helper to record a clear-and-rebuild run
pub fn record_reindex(duration_secs: f64, chunks_indexed: usize) {
    counter!(format!("{}_reindex_runs_total", METRICS_PREFIX)).increment(1);

    counter!(format!("{}_chunks_indexed_total", METRICS_PREFIX))
        .increment(chunks_indexed as u64);

    histogram!(format!("{}_reindex_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Helper to record a document download
pub fn record_download() {
    counter!(format!("{}_document_downloads_total", METRICS_PREFIX)).increment(1);
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_embedding_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }
}

/// Helper to record a chat completion request
pub fn record_model_request(model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_model_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
