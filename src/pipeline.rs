//! Summarise, bucket and aggregate the records for one measurement.
//!
//! Each record is processed independently (summarised, then bucketed) and the results are folded
//! into an [Aggregator]. Records that cannot be processed are dropped from the run and counted by
//! [DropReason]. The fold may run sequentially or in parallel on the rayon thread pool; both give
//! the same table.

use crate::aggregate::Aggregator;
use crate::bucket::Bucket;
use crate::error::{DropReason, PipelineError};
use crate::models::{AggregateTable, BucketedRecord, Measurement, RawRecord, SummarizedRecord};
use crate::operation::Summary;

use rayon::prelude::*;
use tracing::{event, Level};

/// Number of records dropped from a run, by reason.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DropCounts {
    pub empty_series: u64,
    pub malformed: u64,
    pub out_of_range: u64,
}

impl DropCounts {
    /// Count one dropped record.
    pub fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::EmptySeries => self.empty_series += 1,
            DropReason::Malformed => self.malformed += 1,
            DropReason::OutOfRange => self.out_of_range += 1,
        }
    }

    /// Returns the count for one reason.
    pub fn get(&self, reason: DropReason) -> u64 {
        match reason {
            DropReason::EmptySeries => self.empty_series,
            DropReason::Malformed => self.malformed,
            DropReason::OutOfRange => self.out_of_range,
        }
    }

    /// Total number of dropped records.
    pub fn total(&self) -> u64 {
        self.empty_series + self.malformed + self.out_of_range
    }

    fn merge(self, other: DropCounts) -> Self {
        DropCounts {
            empty_series: self.empty_series + other.empty_series,
            malformed: self.malformed + other.malformed,
            out_of_range: self.out_of_range + other.out_of_range,
        }
    }
}

/// Result of running the pipeline for one measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementOutput {
    pub table: AggregateTable,
    pub dropped: DropCounts,
}

/// Reduce the series of a record for a measurement to a single value.
pub fn summarize<'a, S: Summary>(
    record: &'a RawRecord,
    measurement: Measurement,
) -> Result<SummarizedRecord<'a>, PipelineError> {
    let samples = record.series(measurement)?;
    let mean_value = S::summarize(measurement, samples)?;
    Ok(SummarizedRecord {
        gender: &record.gender,
        sport: &record.sport,
        mean_value,
    })
}

/// Map a summarised record to its bucket, dropping the summary value.
pub fn bucketize(
    record: SummarizedRecord,
    measurement: Measurement,
) -> Result<BucketedRecord, PipelineError> {
    let bucket =
        Bucket::containing(record.mean_value).ok_or(PipelineError::ValueOutOfRange {
            measurement,
            value: record.mean_value,
        })?;
    Ok(BucketedRecord {
        gender: record.gender,
        bucket,
        sport: record.sport,
    })
}

/// Partial result of a run.
#[derive(Default)]
struct Tally<'a> {
    aggregator: Aggregator<'a>,
    dropped: DropCounts,
}

impl<'a> Tally<'a> {
    fn observe<S: Summary>(mut self, record: &'a RawRecord, measurement: Measurement) -> Self {
        match summarize::<S>(record, measurement).and_then(|s| bucketize(s, measurement)) {
            Ok(bucketed) => self.aggregator.insert(bucketed),
            Err(error) => {
                event!(
                    Level::DEBUG,
                    gender = %record.gender,
                    sport = %record.sport,
                    "dropping record: {}",
                    error
                );
                // Only record level errors can occur here.
                if let Some(reason) = error.drop_reason() {
                    self.dropped.record(reason);
                }
            }
        }
        self
    }

    fn merge(self, other: Tally<'a>) -> Self {
        Tally {
            aggregator: self.aggregator.merge(other.aggregator),
            dropped: self.dropped.merge(other.dropped),
        }
    }

    fn finish(self, measurement: Measurement) -> MeasurementOutput {
        MeasurementOutput {
            table: self.aggregator.into_table(measurement),
            dropped: self.dropped,
        }
    }
}

/// Run the pipeline for a measurement on the current thread.
///
/// # Arguments
///
/// * `records`: Records to aggregate
/// * `measurement`: Measurement whose series are summarised
#[tracing::instrument(level = "DEBUG", skip(records), fields(records = records.len(), summary = S::NAME))]
pub fn run<S: Summary>(records: &[RawRecord], measurement: Measurement) -> MeasurementOutput {
    records
        .iter()
        .fold(Tally::default(), |tally, record| {
            tally.observe::<S>(record, measurement)
        })
        .finish(measurement)
}

/// Run the pipeline for a measurement on the rayon thread pool.
///
/// Gives the same output as [run].
///
/// # Arguments
///
/// * `records`: Records to aggregate
/// * `measurement`: Measurement whose series are summarised
#[tracing::instrument(level = "DEBUG", skip(records), fields(records = records.len(), summary = S::NAME))]
pub fn run_parallel<S: Summary>(
    records: &[RawRecord],
    measurement: Measurement,
) -> MeasurementOutput {
    records
        .par_iter()
        .fold(Tally::default, |tally, record| {
            tally.observe::<S>(record, measurement)
        })
        .reduce(Tally::default, Tally::merge)
        .finish(measurement)
}
