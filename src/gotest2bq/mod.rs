//! Loads `go test -json` logs into a BigQuery table.

mod bigquery;
mod event;
mod ingest;

pub use bigquery::{DEFAULT_API_URL, TableRef};
pub use ingest::{IngestArgs, IngestError, ingest_with_retry};
