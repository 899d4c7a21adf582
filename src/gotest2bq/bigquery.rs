use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::IF_MATCH;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::ext::{HttpError, SendExt};

use super::event::TestEventRow;

pub const DEFAULT_API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
const PARTITION_FIELD: &str = "time";

/// Column layout of the test event table. Every column is NULLABLE so the
/// table only ever relaxes or widens.
pub const SCHEMA: &[(&str, &str)] = &[
    ("branch", "STRING"),
    ("env", "STRING"),
    ("commit", "STRING"),
    ("group_id", "STRING"),
    ("time", "TIMESTAMP"),
    ("action", "STRING"),
    ("package", "STRING"),
    ("test", "STRING"),
    ("elapsed", "FLOAT"),
];

pub fn schema_json() -> Value {
    let fields: Vec<Value> = SCHEMA
        .iter()
        .map(|(name, kind)| json!({ "name": name, "type": kind, "mode": "NULLABLE" }))
        .collect();
    json!({ "fields": fields })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    fn datasets_path(&self) -> String {
        format!("projects/{}/datasets/{}/tables", self.project, self.dataset)
    }

    fn table_path(&self) -> String {
        format!("{}/{}", self.datasets_path(), self.table)
    }
}

#[derive(Debug, Deserialize)]
struct TableMetadata {
    #[serde(default)]
    etag: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertRow<'a> {
    insert_id: String,
    json: &'a TestEventRow,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct BigQueryClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl BigQueryClient {
    pub fn new(base_url: &str, access_token: impl Into<String>) -> Result<Self, BigQueryError> {
        let access_token = access_token.into();
        ensure!(!access_token.trim().is_empty(), MissingTokenSnafu);
        let http = Client::builder().build().context(ClientSnafu)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.access_token)
    }

    /// Creates the table partitioned on `time`, or patches its schema when it exists.
    pub fn ensure_table(&self, table: &TableRef) -> Result<(), BigQueryError> {
        let existing = self
            .request(reqwest::Method::GET, &table.table_path())
            .send_json::<TableMetadata>();

        match existing {
            Ok(metadata) => {
                let mut request = self
                    .request(reqwest::Method::PATCH, &table.table_path())
                    .json(&json!({ "schema": schema_json() }));
                if let Some(etag) = metadata.etag {
                    request = request.header(IF_MATCH, etag);
                }
                request
                    .send_checked()
                    .context(UpdateTableSnafu { table: table.table.clone() })?;
                debug!("Patched schema of {}", table.table);
            }
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                let body = json!({
                    "tableReference": {
                        "projectId": table.project,
                        "datasetId": table.dataset,
                        "tableId": table.table,
                    },
                    "schema": schema_json(),
                    "timePartitioning": { "type": "DAY", "field": PARTITION_FIELD },
                });
                self.request(reqwest::Method::POST, &table.datasets_path())
                    .json(&body)
                    .send_checked()
                    .context(CreateTableSnafu { table: table.table.clone() })?;
                info!("Created table {}", table.table);
            }
            Err(e) => {
                return Err(e).context(GetTableSnafu { table: table.table.clone() });
            }
        }
        Ok(())
    }

    /// Streams the rows into the table; `group_id` plus the row index makes each insert id.
    pub fn insert_rows(&self, table: &TableRef, rows: &[TestEventRow]) -> Result<(), BigQueryError> {
        if rows.is_empty() {
            info!("No test events to insert");
            return Ok(());
        }

        let rows_json: Vec<InsertRow> = rows
            .iter()
            .enumerate()
            .map(|(index, row)| InsertRow {
                insert_id: format!("{}-{}", row.group_id, index),
                json: row,
            })
            .collect();

        let response: InsertAllResponse = self
            .request(
                reqwest::Method::POST,
                &format!("{}/insertAll", table.table_path()),
            )
            .json(&json!({ "rows": rows_json }))
            .send_json()
            .context(InsertSnafu { table: table.table.clone() })?;

        ensure!(
            response.insert_errors.is_empty(),
            RejectedRowsSnafu {
                table: table.table.clone(),
                count: response.insert_errors.len(),
            }
        );
        info!("Inserted {} rows into {}", rows.len(), table.table);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum BigQueryError {
    #[snafu(display("An access token is required"))]
    MissingToken,
    #[snafu(display("Failed to build the HTTP client"))]
    ClientError { source: reqwest::Error },
    #[snafu(display("Failed to get table {}", table))]
    GetTableError { table: String, source: HttpError },
    #[snafu(display("Failed to create table {}", table))]
    CreateTableError { table: String, source: HttpError },
    #[snafu(display("Failed to update table {}", table))]
    UpdateTableError { table: String, source: HttpError },
    #[snafu(display("Failed to insert rows into {}", table))]
    InsertError { table: String, source: HttpError },
    #[snafu(display("{} rows were rejected by {}", count, table))]
    RejectedRows { table: String, count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    fn table() -> TableRef {
        TableRef {
            project: "acme-ci".to_string(),
            dataset: "tests".to_string(),
            table: "events".to_string(),
        }
    }

    fn row(group_id: &str) -> TestEventRow {
        TestEventRow {
            branch: "main".to_string(),
            env: "ci".to_string(),
            commit: "abc".to_string(),
            group_id: group_id.to_string(),
            time: None,
            action: "pass".to_string(),
            package: "example.com/app".to_string(),
            test: "TestA".to_string(),
            elapsed: Some(0.5),
        }
    }

    #[test]
    fn schema_is_fully_nullable() {
        let schema = schema_json();
        let fields = schema["fields"].as_array().unwrap();
        assert_eq!(fields.len(), SCHEMA.len());
        assert!(fields.iter().all(|f| f["mode"] == "NULLABLE"));
        assert!(fields.iter().any(|f| f["name"] == "time" && f["type"] == "TIMESTAMP"));
        assert!(fields.iter().all(|f| f["name"] != "output"));
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(
            BigQueryClient::new(DEFAULT_API_URL, ""),
            Err(BigQueryError::MissingToken)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn creates_a_missing_table_with_time_partitioning() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/projects/acme-ci/datasets/tests/tables/events"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/projects/acme-ci/datasets/tests/tables"))
            .and(header("authorization", "Bearer ya29.token"))
            .and(body_partial_json(serde_json::json!({
                "tableReference": {"tableId": "events"},
                "timePartitioning": {"field": "time"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        tokio::task::spawn_blocking(move || {
            BigQueryClient::new(&uri, "ya29.token")?.ensure_table(&table())
        })
        .await
        .unwrap()
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn patches_an_existing_table_with_its_etag() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/projects/acme-ci/datasets/tests/tables/events"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"etag": "e-1"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/projects/acme-ci/datasets/tests/tables/events"))
            .and(header("if-match", "e-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        tokio::task::spawn_blocking(move || {
            BigQueryClient::new(&uri, "ya29.token")?.ensure_table(&table())
        })
        .await
        .unwrap()
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_failures_other_than_not_found_are_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = tokio::task::spawn_blocking(move || {
            BigQueryClient::new(&uri, "ya29.token")?.ensure_table(&table())
        })
        .await
        .unwrap();
        assert!(matches!(result, Err(BigQueryError::GetTableError { .. })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_errors_are_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/projects/acme-ci/datasets/tests/tables/events/insertAll"))
            .and(body_partial_json(serde_json::json!({
                "rows": [{"insertId": "g-0", "json": {"group_id": "g", "test": "TestA"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "insertErrors": [{"index": 0, "errors": []}]
            })))
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = tokio::task::spawn_blocking(move || {
            BigQueryClient::new(&uri, "ya29.token")?.insert_rows(&table(), &[row("g")])
        })
        .await
        .unwrap();
        assert!(matches!(result, Err(BigQueryError::RejectedRows { count: 1, .. })));
    }
}
