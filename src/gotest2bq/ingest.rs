use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use snafu::prelude::*;
use tracing::{info, warn};

use super::bigquery::{BigQueryClient, BigQueryError, TableRef};
use super::event::{RunLabels, TestLogError, load_test_log};

pub const ATTEMPTS: usize = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct IngestArgs {
    pub filename: PathBuf,
    pub table: TableRef,
    pub branch: String,
    pub env: String,
    pub commit: String,
    pub api_url: String,
    pub access_token: String,
}

/// Loads the log, makes sure the table matches the schema, and inserts the events.
/// Each run gets a fresh group id.
pub fn ingest(args: &IngestArgs) -> Result<(), IngestError> {
    let labels = RunLabels {
        branch: args.branch.clone(),
        env: args.env.clone(),
        commit: args.commit.clone(),
        group_id: uuid::Uuid::new_v4().to_string(),
    };
    info!("Ingesting {} as group {}", args.filename.display(), labels.group_id);

    let rows = load_test_log(&args.filename, &labels).context(LoadSnafu)?;
    let client = BigQueryClient::new(&args.api_url, args.access_token.as_str())
        .context(WarehouseSnafu)?;
    client.ensure_table(&args.table).context(WarehouseSnafu)?;
    client
        .insert_rows(&args.table, &rows)
        .context(WarehouseSnafu)?;
    Ok(())
}

/// Runs `op` up to `attempts` times, sleeping `delay` between failures.
pub fn retry<T, E: Display>(
    attempts: usize,
    delay: Duration,
    mut op: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!("Got error, will retry ({}/{}): {}", attempt, attempts, e);
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// The warehouse API is eventually consistent: a freshly created or patched
/// table often answers 404 for a few seconds.
pub fn ingest_with_retry(args: &IngestArgs) -> Result<(), IngestError> {
    retry(ATTEMPTS, RETRY_DELAY, || ingest(args))
}

#[derive(Debug, Snafu)]
pub enum IngestError {
    #[snafu(display("Failed to load the test log"))]
    LoadError { source: TestLogError },
    #[snafu(display("Warehouse request failed"))]
    WarehouseError { source: BigQueryError },
}
