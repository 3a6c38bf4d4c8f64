//! Output module
//!
//! Turns accumulated rows into an Arrow RecordBatch, encodes it as
//! Parquet and stores it through a [`Sink`].
//!
//! # Overview
//!
//! - Inferring Arrow schemas from JSON rows (first-appearance column order)
//! - Encoding Parquet in memory
//! - Object storage output (S3, R2, GCS, Azure, memory, local)

mod cloud;
mod schema;
mod writer;

pub use cloud::{CloudDestination, S3Options, Sink};
pub use schema::{arrow_to_json, infer_schema, json_to_arrow};
pub use writer::{batch_to_parquet_bytes, ParquetWriterConfig};

#[cfg(test)]
mod tests;
