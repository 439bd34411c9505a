//! Error handling.

use crate::models::Measurement;

use std::error::Error;
use strum_macros::Display;
use thiserror::Error;
use tracing::{event, Level};

/// Pipeline error type
///
/// This type encapsulates the various errors that may occur.
/// Record level errors cause the record to be dropped from a run, while source, sink and setup
/// errors are fatal to the run or job they occur in. See [PipelineError::drop_reason].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Attempt to summarise an empty series
    #[error("cannot summarise empty {} series", .measurement.series_field())]
    EmptySeries { measurement: Measurement },

    /// Command line arguments failed validation
    #[error("configuration is not valid")]
    InvalidConfig(#[source] validator::ValidationErrors),

    /// Error expanding a configured path
    #[error("invalid path {path}")]
    InvalidPath {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Record failed validation
    #[error("record is not valid")]
    InvalidRecord(#[from] validator::ValidationErrors),

    /// Error deserialising a document into a record
    #[error("record is malformed")]
    MalformedRecord(#[from] serde_json::Error),

    /// Error registering or encoding metrics
    #[error("metrics error")]
    Metrics(#[from] prometheus::Error),

    /// Error writing the metrics file
    #[error("failed to write metrics to {path}")]
    MetricsWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Record series for a measurement is not an array of finite numbers
    #[error("record {} series is malformed", .measurement.series_field())]
    MalformedSeries { measurement: Measurement },

    /// Record does not contain a series for a measurement
    #[error("record has no {} series", .measurement.series_field())]
    MissingSeries { measurement: Measurement },

    /// Error encoding an aggregate row for the sink
    #[error("failed to encode row for table {table}")]
    SinkEncode {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    /// Error opening the aggregate store
    #[error("failed to open aggregate store at {path}")]
    SinkOpen {
        path: String,
        #[source]
        source: sled::Error,
    },

    /// Error reading the contents of a table
    #[error("failed to read table {table}")]
    SinkRead {
        table: String,
        #[source]
        source: sled::Error,
    },

    /// Error replacing the contents of a table
    #[error("failed to write table {table}")]
    SinkWrite {
        table: String,
        #[source]
        source: sled::Error,
    },

    /// Source documents are not valid JSON
    #[error("failed to parse records from {path}")]
    SourceParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Error reading from the record source
    #[error("failed to read records from {path}")]
    SourceRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error configuring the rayon thread pool
    #[error("failed to configure thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Error initialising trace export
    #[error("failed to initialise tracing")]
    Tracing(#[from] opentelemetry::trace::TraceError),

    /// Summary value cannot be mapped to a bucket
    #[error("{measurement} value {value} cannot be bucketed")]
    ValueOutOfRange {
        measurement: Measurement,
        value: f64,
    },
}

/// Reason for dropping a record from a run
///
/// Used as a metric label, so the rendered names are stable.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
    /// The series of the measurement was empty
    EmptySeries,
    /// The record or its series could not be interpreted
    Malformed,
    /// The summary value could not be bucketed
    OutOfRange,
}

impl PipelineError {
    /// Returns the reason to drop a record for record level errors, or `None` if the error is not
    /// recoverable by dropping a record.
    pub fn drop_reason(&self) -> Option<DropReason> {
        match self {
            // Dropped
            PipelineError::EmptySeries { measurement: _ } => Some(DropReason::EmptySeries),
            PipelineError::InvalidRecord(_)
            | PipelineError::MalformedRecord(_)
            | PipelineError::MalformedSeries { measurement: _ }
            | PipelineError::MissingSeries { measurement: _ } => Some(DropReason::Malformed),
            PipelineError::ValueOutOfRange {
                measurement: _,
                value: _,
            } => Some(DropReason::OutOfRange),

            // Fatal
            PipelineError::InvalidConfig(_)
            | PipelineError::InvalidPath { .. }
            | PipelineError::Metrics(_)
            | PipelineError::MetricsWrite { .. }
            | PipelineError::SinkEncode { .. }
            | PipelineError::SinkOpen { .. }
            | PipelineError::SinkRead { .. }
            | PipelineError::SinkWrite { .. }
            | PipelineError::SourceParse { .. }
            | PipelineError::SourceRead { .. }
            | PipelineError::ThreadPool(_)
            | PipelineError::Tracing(_) => None,
        }
    }
}

/// Returns the message of an error and the messages of its causes.
///
/// Consecutive duplicate causes are removed.
///
/// # Arguments
///
/// * `error`: The error that occurred
pub fn error_chain<E>(error: &E) -> (String, Vec<String>)
where
    E: Error,
{
    let message = error.to_string();
    let mut caused_by = Vec::new();
    let mut current = error.source();
    while let Some(source) = current {
        caused_by.push(source.to_string());
        current = source.source();
    }
    // Remove duplicate entries.
    caused_by.dedup();
    (message, caused_by)
}

/// Log an error and its causes at error level.
pub fn log_error<E>(error: &E)
where
    E: Error,
{
    let (message, caused_by) = error_chain(error);
    event!(Level::ERROR, "{}", message);
    for cause in caused_by {
        event!(Level::ERROR, "Caused by: {}", cause);
    }
}
