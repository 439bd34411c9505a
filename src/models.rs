//! Data types and associated functions and methods

use crate::bucket::Bucket;
use crate::error::PipelineError;

use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::fmt;
use strum_macros::Display;
use validator::Validate;

/// A structured record as yielded by a record source, before validation.
pub type Document = serde_json::Value;

/// Name of the count column in persisted aggregate documents.
pub const COUNT_COLUMN: &str = "sportCount";

/// Maximum number of rows rendered when displaying an [AggregateTable].
pub const SHOW_ROWS: usize = 20;

/// Measurements that are summarised and bucketed
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum Measurement {
    /// Heart rate series, in beats per minute
    HeartRate,
    /// Speed series
    Speed,
}

impl Measurement {
    /// All measurements, in the order the job processes them.
    pub const ALL: [Measurement; 2] = [Measurement::HeartRate, Measurement::Speed];

    /// Name of the time series field in a raw record.
    pub fn series_field(self) -> &'static str {
        match self {
            Self::HeartRate => "heart_rate",
            Self::Speed => "speed",
        }
    }

    /// Name of the bucket lower bound column in persisted documents.
    pub fn min_column(self) -> &'static str {
        match self {
            Self::HeartRate => "heart_rate_min",
            Self::Speed => "min_speed_range",
        }
    }

    /// Name of the bucket upper bound column in persisted documents.
    pub fn max_column(self) -> &'static str {
        match self {
            Self::HeartRate => "heart_rate_max",
            Self::Speed => "max_speed_range",
        }
    }

    /// Table the aggregates are written to unless configured otherwise.
    pub fn default_table(self) -> &'static str {
        match self {
            Self::HeartRate => "Heart_Rate",
            Self::Speed => "Speed",
        }
    }
}

/// Samples of a series as read from a document.
#[derive(Clone, Debug, PartialEq)]
pub enum Series {
    /// Every sample is a finite number
    Samples(Vec<f64>),
    /// The series is not an array of finite numbers
    Malformed,
}

impl From<Document> for Series {
    fn from(value: Document) -> Self {
        let samples: Option<Vec<f64>> = match value {
            Document::Array(items) => items.iter().map(Document::as_f64).collect(),
            _ => None,
        };
        samples.map_or(Series::Malformed, Series::Samples)
    }
}

/// Deserialise a series leniently, so that a bad series only affects its own measurement.
fn deserialize_series<'de, D>(deserializer: D) -> Result<Option<Series>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Document>::deserialize(deserializer)?.map(Series::from))
}

/// A fitness record read from the source
///
/// Unknown fields in the source document are ignored. A series that is absent, `null` or not an
/// array of finite numbers only affects the run for that measurement.
#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
pub struct RawRecord {
    /// Gender of the athlete
    #[validate(length(min = 1, message = "gender must not be empty"))]
    pub gender: String,
    /// Sport of the workout
    #[validate(length(min = 1, message = "sport must not be empty"))]
    pub sport: String,
    /// Heart rate samples
    #[serde(default, deserialize_with = "deserialize_series")]
    pub heart_rate: Option<Series>,
    /// Speed samples
    #[serde(default, deserialize_with = "deserialize_series")]
    pub speed: Option<Series>,
}

impl RawRecord {
    /// Deserialise and validate a record from a source document.
    pub fn from_document(document: Document) -> Result<Self, PipelineError> {
        let record: RawRecord = serde_json::from_value(document)?;
        record.validate()?;
        Ok(record)
    }

    /// Returns the samples of the series for a measurement.
    pub fn series(&self, measurement: Measurement) -> Result<&[f64], PipelineError> {
        let series = match measurement {
            Measurement::HeartRate => &self.heart_rate,
            Measurement::Speed => &self.speed,
        };
        match series {
            Some(Series::Samples(samples)) => Ok(samples),
            Some(Series::Malformed) => Err(PipelineError::MalformedSeries { measurement }),
            None => Err(PipelineError::MissingSeries { measurement }),
        }
    }
}

/// A record whose series has been reduced to a single value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SummarizedRecord<'a> {
    pub gender: &'a str,
    pub sport: &'a str,
    pub mean_value: f64,
}

/// A record projected to its grouping fields.
///
/// This is the key the aggregator groups on. Ordering follows the field order, which is the column
/// order of an [AggregateRow].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BucketedRecord<'a> {
    pub gender: &'a str,
    pub bucket: Bucket,
    pub sport: &'a str,
}

/// Number of records sharing a gender, bucket and sport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AggregateRow {
    pub gender: String,
    pub bucket_min: i64,
    pub bucket_max: i64,
    pub sport: String,
    pub count: u64,
}

impl AggregateRow {
    /// Return a new AggregateRow for a group key and its count.
    pub fn new(key: &BucketedRecord, count: u64) -> Self {
        AggregateRow {
            gender: key.gender.to_string(),
            bucket_min: key.bucket.min,
            bucket_max: key.bucket.max,
            sport: key.sport.to_string(),
            count,
        }
    }

    /// Key identifying the row within its table.
    ///
    /// Two rows share a key exactly when they share gender, bucket and sport.
    pub fn document_key(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&(&self.gender, self.bucket_min, self.bucket_max, &self.sport))
    }

    /// Render the row as a document using the column names of a measurement.
    pub fn to_document(&self, measurement: Measurement) -> Document {
        let mut document = json!({
            "gender": self.gender,
            "sport": self.sport,
            COUNT_COLUMN: self.count,
        });
        document[measurement.min_column()] = self.bucket_min.into();
        document[measurement.max_column()] = self.bucket_max.into();
        document
    }
}

/// The complete aggregate output for one measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateTable {
    pub measurement: Measurement,
    /// Rows sorted by key
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    /// Sum of the counts of all rows.
    pub fn total_count(&self) -> u64 {
        self.rows.iter().map(|row| row.count).sum()
    }

    fn header(&self) -> [String; 5] {
        [
            "gender".to_string(),
            self.measurement.min_column().to_string(),
            self.measurement.max_column().to_string(),
            "sport".to_string(),
            COUNT_COLUMN.to_string(),
        ]
    }
}

impl fmt::Display for AggregateTable {
    /// Render up to [SHOW_ROWS] rows as a text grid with right-aligned cells.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header();
        let cells: Vec<[String; 5]> = self
            .rows
            .iter()
            .take(SHOW_ROWS)
            .map(|row| {
                [
                    row.gender.clone(),
                    row.bucket_min.to_string(),
                    row.bucket_max.to_string(),
                    row.sport.clone(),
                    row.count.to_string(),
                ]
            })
            .collect();

        let mut widths = header.clone().map(|name| name.chars().count());
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let separator: String = widths
            .iter()
            .map(|width| format!("+{}", "-".repeat(*width)))
            .collect::<String>()
            + "+";
        let write_row = |f: &mut fmt::Formatter<'_>, row: &[String; 5]| -> fmt::Result {
            for (cell, width) in row.iter().zip(&widths) {
                write!(f, "|{:>width$}", cell, width = *width)?;
            }
            writeln!(f, "|")
        };

        writeln!(f, "{}", separator)?;
        write_row(f, &header)?;
        writeln!(f, "{}", separator)?;
        for row in &cells {
            write_row(f, row)?;
        }
        writeln!(f, "{}", separator)?;
        if self.rows.len() > SHOW_ROWS {
            writeln!(f, "only showing top {} rows", SHOW_ROWS)?;
        }
        Ok(())
    }
}
