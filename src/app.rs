//! Batch job orchestration.
//!
//! A job reads the record source once, then runs the pipeline for each [Measurement] and replaces
//! the measurement's table in the sink. A failure to read the source aborts the job before anything
//! is written. A failure to write one table is reported but does not stop the other measurement.

use crate::cli::CommandLineArgs;
use crate::error::{log_error, DropReason, PipelineError};
use crate::metrics::{self, AGGREGATE_ROWS, RECORDS_DROPPED, RECORDS_READ};
use crate::models::{Document, Measurement, RawRecord};
use crate::operations::Mean;
use crate::pipeline::{self, MeasurementOutput};
use crate::sink::{AggregateSink, SledSink};
use crate::source::{JsonFileSource, RecordSource};

use expanduser::expanduser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{event, Level};
use uuid::Uuid;
use validator::Validate;

/// Options for a job run.
#[derive(Clone, Debug)]
pub struct JobOptions {
    /// Table for heart rate aggregates
    pub heart_rate_table: String,
    /// Table for speed aggregates
    pub speed_table: String,
    /// Whether to run the pipeline on the rayon thread pool
    pub use_rayon: bool,
}

impl JobOptions {
    /// Returns the table a measurement is written to.
    pub fn table(&self, measurement: Measurement) -> &str {
        match measurement {
            Measurement::HeartRate => &self.heart_rate_table,
            Measurement::Speed => &self.speed_table,
        }
    }
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            heart_rate_table: Measurement::HeartRate.default_table().to_string(),
            speed_table: Measurement::Speed.default_table().to_string(),
            use_rayon: false,
        }
    }
}

impl From<&CommandLineArgs> for JobOptions {
    fn from(args: &CommandLineArgs) -> Self {
        Self {
            heart_rate_table: args.heart_rate_table.clone(),
            speed_table: args.speed_table.clone(),
            use_rayon: args.use_rayon,
        }
    }
}

/// Outcome of one measurement run.
#[derive(Debug)]
pub struct MeasurementReport {
    pub measurement: Measurement,
    /// Table the aggregates were written to
    pub table: String,
    pub output: MeasurementOutput,
    /// Result of writing to the sink
    pub result: Result<(), PipelineError>,
}

/// Outcome of a job.
#[derive(Debug)]
pub struct JobReport {
    /// Number of documents read from the source
    pub records_read: usize,
    /// Number of documents that were not valid records
    pub rejected: u64,
    /// One report per measurement, in [Measurement::ALL] order
    pub measurements: Vec<MeasurementReport>,
}

impl JobReport {
    /// Whether every measurement was written.
    pub fn is_success(&self) -> bool {
        self.measurements.iter().all(|report| report.result.is_ok())
    }
}

/// Convert documents into records, dropping and counting documents that are not valid records.
pub fn ingest(documents: Vec<Document>) -> (Vec<RawRecord>, u64) {
    let mut rejected = 0;
    let records = documents
        .into_iter()
        .filter_map(|document| match RawRecord::from_document(document) {
            Ok(record) => Some(record),
            Err(error) => {
                event!(Level::DEBUG, "rejecting document: {}", error);
                rejected += 1;
                None
            }
        })
        .collect();
    (records, rejected)
}

/// Run the pipeline for one measurement, on the rayon pool if requested.
async fn aggregate(
    records: Arc<Vec<RawRecord>>,
    measurement: Measurement,
    use_rayon: bool,
) -> MeasurementOutput {
    if use_rayon {
        tokio_rayon::spawn(move || pipeline::run_parallel::<Mean>(&records, measurement)).await
    } else {
        pipeline::run::<Mean>(&records, measurement)
    }
}

/// Run a job against a source and a sink.
///
/// Returns an error only if the source cannot be read. Per-measurement sink errors are returned in
/// the [JobReport].
///
/// # Arguments
///
/// * `source`: Source of the fitness records
/// * `sink`: Sink for the aggregate tables
/// * `options`: Job options
#[tracing::instrument(skip_all, fields(run_id = %Uuid::new_v4()))]
pub async fn run_job(
    source: &dyn RecordSource,
    sink: &dyn AggregateSink,
    options: &JobOptions,
) -> Result<JobReport, PipelineError> {
    let documents = source.read().await?;
    let records_read = documents.len();
    RECORDS_READ.inc_by(records_read as u64);
    let (records, rejected) = ingest(documents);
    if rejected > 0 {
        event!(Level::WARN, "rejected {} malformed documents", rejected);
    }
    event!(Level::INFO, "read {} records", records.len());

    let records = Arc::new(records);
    let mut measurements = Vec::with_capacity(Measurement::ALL.len());
    for measurement in Measurement::ALL {
        let mut output = aggregate(records.clone(), measurement, options.use_rayon).await;
        // Rejected documents are malformed for every measurement.
        output.dropped.malformed += rejected;
        for reason in [
            DropReason::EmptySeries,
            DropReason::Malformed,
            DropReason::OutOfRange,
        ] {
            RECORDS_DROPPED
                .with_label_values(&[&measurement.to_string(), &reason.to_string()])
                .inc_by(output.dropped.get(reason));
        }
        if output.dropped.total() > 0 {
            event!(
                Level::WARN,
                %measurement,
                empty_series = output.dropped.empty_series,
                malformed = output.dropped.malformed,
                out_of_range = output.dropped.out_of_range,
                "dropped {} records",
                output.dropped.total()
            );
        }

        let table = options.table(measurement);
        let result = sink.write(table, &output.table).await;
        match &result {
            Ok(()) => {
                AGGREGATE_ROWS
                    .with_label_values(&[&measurement.to_string()])
                    .inc_by(output.table.rows.len() as u64);
                event!(
                    Level::INFO,
                    %measurement,
                    table,
                    rows = output.table.rows.len(),
                    records = output.table.total_count(),
                    "wrote aggregate table"
                );
            }
            Err(error) => log_error(error),
        }
        measurements.push(MeasurementReport {
            measurement,
            table: table.to_string(),
            output,
            result,
        });
    }

    Ok(JobReport {
        records_read,
        rejected,
        measurements,
    })
}

/// Expand `~` in a configured path.
fn expand_path(path: &str) -> Result<PathBuf, PipelineError> {
    expanduser(path).map_err(|source| PipelineError::InvalidPath {
        path: path.to_string(),
        source,
    })
}

/// Run the job described by the command line arguments.
///
/// Prints each written table if requested and writes the metrics file if configured.
///
/// # Arguments
///
/// * `args`: Command line arguments
pub async fn run(args: &CommandLineArgs) -> Result<JobReport, PipelineError> {
    args.validate().map_err(PipelineError::InvalidConfig)?;
    if args.use_rayon {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.rayon_threads())
            .build_global()?;
    }
    let source = JsonFileSource::new(expand_path(&args.source)?);
    let sink = SledSink::open(&expand_path(&args.store)?)?;

    let report = run_job(&source, &sink, &JobOptions::from(args)).await?;

    if args.show {
        for measurement in &report.measurements {
            if measurement.result.is_ok() {
                println!("{}", measurement.output.table);
            }
        }
    }
    if let Some(path) = &args.metrics_file {
        metrics::write_metrics_file(path).await?;
    }
    Ok(report)
}
