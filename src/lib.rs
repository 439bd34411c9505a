//! This crate provides a batch job that summarises fitness telemetry into aggregate tables.
//!
//! Each record of the source holds a gender, a sport and heart rate and speed series. For each of
//! the two measurements the job reduces every record's series to its mean, assigns the mean to a
//! bucket of width 10, and counts records per gender, bucket and sport. The resulting tables
//! replace any previous contents of the `Heart_Rate` and `Speed` tables in the store.
//!
//! The job is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Serde](serde) performs deserialisation of the JSON records and encoding of stored rows.
//! * [ndarray] provides [NumPy](https://numpy.org)-like arrays used to compute series means.
//! * [Rayon](rayon) optionally spreads the aggregation across a thread pool.
//! * [sled] is the embedded store the aggregate tables are written to.

pub mod aggregate;
pub mod app;
pub mod bucket;
pub mod cli;
pub mod error;
pub mod metrics;
pub mod models;
pub mod operation;
pub mod operations;
pub mod pipeline;
pub mod sink;
pub mod source;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
