use crate::error::PipelineError;
use crate::models::*;
use crate::sink::AggregateSink;
use crate::source::RecordSource;

use async_trait::async_trait;
use hashbrown::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, Once};

/// Create a RawRecord with both series present.
pub(crate) fn record(gender: &str, sport: &str, heart_rate: &[f64], speed: &[f64]) -> RawRecord {
    RawRecord {
        gender: gender.to_string(),
        sport: sport.to_string(),
        heart_rate: Some(Series::Samples(heart_rate.to_vec())),
        speed: Some(Series::Samples(speed.to_vec())),
    }
}

/// Create an AggregateRow for the bucket starting at `bucket_min`.
pub(crate) fn row(gender: &str, bucket_min: i64, sport: &str, count: u64) -> AggregateRow {
    AggregateRow {
        gender: gender.to_string(),
        bucket_min,
        bucket_max: bucket_min + 10,
        sport: sport.to_string(),
        count,
    }
}

/// Write a file with a unique name to the temporary directory and return its path.
pub(crate) fn write_temp_file(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("fitbucket-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
}

/// Register the global metrics, once per test process.
pub(crate) fn register_metrics() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| crate::metrics::register_metrics().unwrap());
}

/// Record source returning fixed documents, or failing.
pub(crate) struct VecSource {
    pub documents: Option<Vec<Document>>,
}

#[async_trait]
impl RecordSource for VecSource {
    async fn read(&self) -> Result<Vec<Document>, PipelineError> {
        match &self.documents {
            Some(documents) => Ok(documents.clone()),
            None => Err(PipelineError::SourceRead {
                path: "memory".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

/// In-memory aggregate sink. Writes to tables in `failing` are rejected.
#[derive(Default)]
pub(crate) struct MemorySink {
    pub tables: Mutex<HashMap<String, Vec<Document>>>,
    pub failing: HashSet<String>,
}

impl MemorySink {
    pub fn table(&self, table: &str) -> Option<Vec<Document>> {
        self.tables.lock().unwrap().get(table).cloned()
    }
}

#[async_trait]
impl AggregateSink for MemorySink {
    async fn write(&self, table: &str, table_data: &AggregateTable) -> Result<(), PipelineError> {
        if self.failing.contains(table) {
            return Err(PipelineError::SinkWrite {
                table: table.to_string(),
                source: sled::Error::Unsupported("read only".to_string()),
            });
        }
        let documents = table_data
            .rows
            .iter()
            .map(|row| row.to_document(table_data.measurement))
            .collect();
        self.tables
            .lock()
            .unwrap()
            .insert(table.to_string(), documents);
        Ok(())
    }
}
