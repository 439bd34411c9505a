//! Aggregate sinks.

use crate::error::PipelineError;
use crate::metrics::SINK_WRITE_TIME;
use crate::models::{AggregateTable, Document};

use async_trait::async_trait;
use std::path::Path;
use tracing::{event, Level};

/// Aggregate sink trait.
///
/// Defines the interface for stores of aggregate tables.
#[async_trait]
pub trait AggregateSink: Send + Sync {
    /// Replace the contents of a table.
    ///
    /// On success the table holds exactly the rows of `table_data`, whatever it held before.
    /// Writing the same rows twice leaves the same contents.
    ///
    /// # Arguments
    ///
    /// * `table`: Name of the table
    /// * `table_data`: Aggregate rows to store
    async fn write(&self, table: &str, table_data: &AggregateTable) -> Result<(), PipelineError>;
}

/// Document store backed by an embedded sled database.
///
/// Each table is a sled tree. Each row is stored as a JSON document keyed by its
/// [document key](crate::models::AggregateRow::document_key).
#[derive(Clone, Debug)]
pub struct SledSink {
    db: sled::Db,
}

impl SledSink {
    /// Open or create the store at a path.
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        let db = sled::open(path).map_err(|source| PipelineError::SinkOpen {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_db(db))
    }

    /// Use an already open database.
    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }

    /// Returns the documents of a table, ordered by key.
    ///
    /// A table that was never written is empty.
    pub fn read_table(&self, table: &str) -> Result<Vec<Document>, PipelineError> {
        let tree = self
            .db
            .open_tree(table)
            .map_err(|source| read_error(table, source))?;
        tree.iter()
            .values()
            .map(|value| {
                let value = value.map_err(|source| read_error(table, source))?;
                serde_json::from_slice(&value).map_err(|source| PipelineError::SinkEncode {
                    table: table.to_string(),
                    source,
                })
            })
            .collect()
    }


    /// Build a batch that removes stale rows and inserts the new ones.
    fn replace_batch(
        &self,
        tree: &sled::Tree,
        table: &str,
        table_data: &AggregateTable,
    ) -> Result<sled::Batch, PipelineError> {
        let encode_error = |source| PipelineError::SinkEncode {
            table: table.to_string(),
            source,
        };
        let mut batch = sled::Batch::default();
        let mut keys = hashbrown::HashSet::with_capacity(table_data.rows.len());
        for row in &table_data.rows {
            let key = row.document_key().map_err(encode_error)?;
            let document = serde_json::to_vec(&row.to_document(table_data.measurement))
                .map_err(encode_error)?;
            batch.insert(key.as_slice(), document);
            keys.insert(key);
        }
        for key in tree.iter().keys() {
            let key = key.map_err(|source| write_error(table, source))?;
            if !keys.contains(&*key) {
                batch.remove(key);
            }
        }
        Ok(batch)
    }
}

fn read_error(table: &str, source: sled::Error) -> PipelineError {
    PipelineError::SinkRead {
        table: table.to_string(),
        source,
    }
}

fn write_error(table: &str, source: sled::Error) -> PipelineError {
    PipelineError::SinkWrite {
        table: table.to_string(),
        source,
    }
}

#[async_trait]
impl AggregateSink for SledSink {
    #[tracing::instrument(level = "DEBUG", skip(self, table_data), fields(rows = table_data.rows.len()))]
    async fn write(&self, table: &str, table_data: &AggregateTable) -> Result<(), PipelineError> {
        let timer = SINK_WRITE_TIME.with_label_values(&[table]).start_timer();
        let tree = self
            .db
            .open_tree(table)
            .map_err(|source| write_error(table, source))?;
        let batch = self.replace_batch(&tree, table, table_data)?;
        // The batch is applied atomically, so readers never see a partial table.
        tree.apply_batch(batch)
            .map_err(|source| write_error(table, source))?;
        tree.flush_async()
            .await
            .map_err(|source| write_error(table, source))?;
        timer.observe_duration();
        event!(
            Level::DEBUG,
            "replaced table {} with {} rows",
            table,
            table_data.rows.len()
        );
        Ok(())
    }
}
