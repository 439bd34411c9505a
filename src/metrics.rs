//! Prometheus metrics.
//!
//! Metrics are collected in a process-wide registry and, for a batch job, written once at the end
//! of the run in the text exposition format (e.g. for the node exporter's textfile collector).

use crate::error::PipelineError;

use lazy_static::lazy_static;
use prometheus::{self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    // Registry for holding metric state
    pub static ref REGISTRY: Registry = Registry::new();
    // Documents read from the record source
    pub static ref RECORDS_READ: IntCounter = IntCounter::new(
        "records_read", "The number of documents read from the record source"
    ).unwrap();
    // Records dropped from a measurement run
    pub static ref RECORDS_DROPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("records_dropped", "The number of records excluded from a measurement run"),
        &["measurement", "reason"]
    ).unwrap();
    // Aggregate rows written per measurement
    pub static ref AGGREGATE_ROWS: IntCounterVec = IntCounterVec::new(
        Opts::new("aggregate_rows", "The number of aggregate rows written to the sink"),
        &["measurement"]
    ).unwrap();
    // Sink write histogram by table
    pub static ref SINK_WRITE_TIME: HistogramVec = HistogramVec::new(
        HistogramOpts{
            common_opts: Opts::new("sink_write_time", "The time taken to replace each table"),
            buckets: prometheus::DEFAULT_BUCKETS.to_vec(), // Change buckets here if desired
        },
        &["table"],
    ).unwrap();
}

/// Register the metrics with [REGISTRY].
///
/// Must be called at most once.
pub fn register_metrics() -> Result<(), PipelineError> {
    REGISTRY.register(Box::new(RECORDS_READ.clone()))?;
    REGISTRY.register(Box::new(RECORDS_DROPPED.clone()))?;
    REGISTRY.register(Box::new(AGGREGATE_ROWS.clone()))?;
    REGISTRY.register(Box::new(SINK_WRITE_TIME.clone()))?;
    Ok(())
}

/// Render the registered metrics in the text exposition format.
pub fn gather() -> Result<String, PipelineError> {
    encode(&REGISTRY)
}

fn encode(registry: &Registry) -> Result<String, PipelineError> {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|err| PipelineError::Metrics(prometheus::Error::Msg(err.to_string())))
}

/// Write the registered metrics to a file, replacing its contents.
pub async fn write_metrics_file(path: &str) -> Result<(), PipelineError> {
    let output = gather()?;
    tokio::fs::write(path, output)
        .await
        .map_err(|source| PipelineError::MetricsWrite {
            path: path.to_string(),
            source,
        })
}
