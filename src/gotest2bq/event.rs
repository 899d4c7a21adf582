use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use tracing::debug;

use crate::ext::BestEffortPathExt;

/// One line of `go test -json` output. The `Output` text is not stored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestEvent {
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub test: String,
    pub elapsed: Option<f64>,
}

/// Labels stamped on every event of one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct RunLabels {
    pub branch: String,
    pub env: String,
    pub commit: String,
    pub group_id: String,
}

/// A warehouse row. `Output` stays out of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestEventRow {
    pub branch: String,
    pub env: String,
    pub commit: String,
    pub group_id: String,
    pub time: Option<DateTime<Utc>>,
    pub action: String,
    pub package: String,
    pub test: String,
    pub elapsed: Option<f64>,
}

impl TestEventRow {
    fn new(event: TestEvent, labels: &RunLabels) -> Self {
        Self {
            branch: labels.branch.clone(),
            env: labels.env.clone(),
            commit: labels.commit.clone(),
            group_id: labels.group_id.clone(),
            time: event.time,
            action: event.action,
            package: event.package,
            test: event.test,
            elapsed: event.elapsed,
        }
    }
}

pub fn load_test_log(path: &Path, labels: &RunLabels) -> Result<Vec<TestEventRow>, TestLogError> {
    let file = std::fs::File::open(path).context(OpenSnafu {
        path: path.to_path_buf(),
    })?;
    let rows = parse_test_log(file, labels)?;
    debug!(
        "Loaded {} test events from {}",
        rows.len(),
        path.best_effort_path_display()
    );
    Ok(rows)
}

pub fn parse_test_log(reader: impl Read, labels: &RunLabels) -> Result<Vec<TestEventRow>, TestLogError> {
    let mut rows = Vec::new();
    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line_number = index + 1;
        let line = line.context(ReadLineSnafu { line_number })?;
        if line.trim().is_empty() {
            continue;
        }
        let event: TestEvent =
            serde_json::from_str(&line).context(MalformedEventSnafu { line_number })?;
        rows.push(TestEventRow::new(event, labels));
    }
    Ok(rows)
}

#[derive(Debug, Snafu)]
pub enum TestLogError {
    #[snafu(display("Failed to open the test log {}", path.best_effort_path_display()))]
    OpenError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read line {} of the test log", line_number))]
    ReadLineError {
        line_number: usize,
        source: std::io::Error,
    },
    #[snafu(display("Line {} is not a test event", line_number))]
    MalformedEventError {
        line_number: usize,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LOG: &str = r#"{"Time":"2024-03-01T10:00:00.5Z","Action":"start","Package":"example.com/app"}
{"Time":"2024-03-01T10:00:01Z","Action":"output","Package":"example.com/app","Test":"TestA","Output":"=== RUN   TestA\n"}

{"Time":"2024-03-01T10:00:02Z","Action":"pass","Package":"example.com/app","Test":"TestA","Elapsed":0.01}
"#;

    fn labels() -> RunLabels {
        RunLabels {
            branch: "main".to_string(),
            env: "ci".to_string(),
            commit: "abc123".to_string(),
            group_id: "group".to_string(),
        }
    }

    #[test]
    fn parses_events_and_stamps_labels() {
        let rows = parse_test_log(LOG.as_bytes(), &labels()).unwrap();
        assert_eq!(rows.len(), 3);

        let pass = &rows[2];
        assert_eq!(pass.action, "pass");
        assert_eq!(pass.test, "TestA");
        assert_eq!(pass.elapsed, Some(0.01));
        assert_eq!(pass.branch, "main");
        assert_eq!(pass.group_id, "group");
        assert_eq!(
            pass.time,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 2).unwrap())
        );
        assert_eq!(rows[0].test, "");
        assert_eq!(rows[0].elapsed, None);
    }

    #[test]
    fn rows_do_not_serialize_output() {
        let rows = parse_test_log(LOG.as_bytes(), &labels()).unwrap();
        let json = serde_json::to_value(&rows[1]).unwrap();
        assert!(json.get("output").is_none());
        assert_eq!(json["time"], "2024-03-01T10:00:01Z");
        assert_eq!(json["commit"], "abc123");
    }

    #[test]
    fn malformed_lines_report_their_number() {
        let log = "{\"Action\":\"start\"}\nnot json\n";
        let result = parse_test_log(log.as_bytes(), &labels());
        assert!(matches!(
            result,
            Err(TestLogError::MalformedEventError { line_number: 2, .. })
        ));
    }

    #[test]
    fn loads_from_a_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "{LOG}").expect("Failed to write to temp file");
        assert_eq!(load_test_log(file.path(), &labels()).unwrap().len(), 3);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let result = load_test_log(Path::new("/this/path/does/not/exist.json"), &labels());
        assert!(matches!(result, Err(TestLogError::OpenError { .. })));
    }
}
