use std::path::{Path, PathBuf};

use colored::Colorize;
use snafu::prelude::*;
use tracing::debug;

use crate::ext::BestEffortPathExt;

use super::builder::{PrefixSource, ResourceChange, TreeBuilder};
use super::types::PlanOutput;

const SEVERITY_ERROR: &str = "error";
const SEVERITY_WARNING: &str = "warning";
const SUMMARY_SEPARATOR: &str = " || ";

/// A parsed plan document and the views derived from it.
#[derive(Debug, Clone)]
pub struct PlanReport {
    output: PlanOutput,
}

impl PlanReport {
    pub fn from_path(path: &Path) -> Result<Self, PlanReportError> {
        debug!("Reading plan output: {}", path.best_effort_path_display());
        let contents = std::fs::read_to_string(path).context(ReadSnafu {
            file_path: path.to_path_buf(),
        })?;
        contents.as_str().try_into()
    }

    pub fn output(&self) -> &PlanOutput {
        &self.output
    }

    /// One line summary of the changes, e.g. `created 2 || updated 1`.
    pub fn short_summary(&self) -> String {
        let mut warning_count = 0;
        for diagnostic in &self.output.diagnostics {
            match diagnostic.severity.as_str() {
                SEVERITY_ERROR => return "error".to_string(),
                SEVERITY_WARNING => warning_count += 1,
                _ => {}
            }
        }

        let summary = self.output.change_summary;
        if summary.create == 0 && summary.update == 0 && summary.delete == 0 && summary.replace == 0
        {
            return "unchanged".to_string();
        }

        [
            ("created", summary.create),
            ("updated", summary.update),
            ("deleted", summary.delete),
            ("replaced", summary.replace),
            ("warn", warning_count),
        ]
        .iter()
        .filter(|(_, count)| *count != 0)
        .map(|(label, count)| format!("{label} {count}"))
        .collect::<Vec<_>>()
        .join(SUMMARY_SEPARATOR)
    }

    /// Messages of every error diagnostic, one per line.
    pub fn error_message(&self) -> String {
        self.output
            .diagnostics
            .iter()
            .filter(|d| d.severity == SEVERITY_ERROR)
            .map(|d| d.message.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn resource_changes(&self) -> Vec<ResourceChange> {
        self.output.steps.iter().map(ResourceChange::from).collect()
    }

    /// Change tree that looks like the `pulumi preview` console output.
    pub fn tree_string(&self, prefix: PrefixSource) -> String {
        TreeBuilder::new(prefix)
            .build(&self.resource_changes())
            .print(true)
    }

    pub fn render(&self, prefix: PrefixSource) -> RenderedPlan {
        RenderedPlan {
            summary: self.short_summary(),
            error_message: self.error_message(),
            tree: self.tree_string(prefix),
        }
    }
}

/// The text pieces every destination is assembled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPlan {
    pub summary: String,
    pub error_message: String,
    pub tree: String,
}

impl RenderedPlan {
    pub fn terminal_text(&self, color: bool) -> String {
        let header = if color {
            "Summary:".bold().to_string()
        } else {
            "Summary:".to_string()
        };
        let mut text = format!("{header} {}\n\n", self.summary);
        if !self.error_message.is_empty() {
            text.push_str(&self.error_message);
            text.push('\n');
        }
        text.push_str(&self.tree);
        text
    }

    pub fn comment_body(&self) -> String {
        format!(
            "**pulumi output** ({})\n\n{}```\n{}```\n",
            self.summary,
            self.fenced_error(),
            self.tree
        )
    }

    pub fn trailer_summary(&self) -> String {
        format!("pulumi output ({})", self.summary)
    }

    pub fn trailer_details(&self) -> String {
        format!("{}```\n{}```", self.fenced_error(), self.tree)
    }

    fn fenced_error(&self) -> String {
        if self.error_message.is_empty() {
            String::new()
        } else {
            format!("```\n{}\n```\n\n", self.error_message)
        }
    }
}

impl TryFrom<&str> for PlanReport {
    type Error = PlanReportError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let output: PlanOutput = serde_json::from_str(contents).context(ParseSnafu)?;
        debug!(
            "Parsed plan output with {} steps and {} diagnostics",
            output.steps.len(),
            output.diagnostics.len()
        );
        Ok(Self { output })
    }
}

#[derive(Debug, Snafu)]
pub enum PlanReportError {
    #[snafu(display("Failed to read the plan output: {}", file_path.best_effort_path_display()))]
    ReadError {
        file_path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the plan output as JSON"))]
    ParseError { source: serde_json::Error },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PREVIEW: &str = r#"{
        "steps": [
            {"op": "same", "urn": "urn:pulumi:dev::proj::pulumi:pulumi:Stack::proj-dev"},
            {"op": "create", "urn": "urn:pulumi:dev::proj::pulumi:pulumi:Stack$aws:s3/bucket:Bucket::logs"},
            {"op": "update", "urn": "urn:pulumi:dev::proj::pulumi:pulumi:Stack$aws:s3/bucket:Bucket::assets",
             "diffReasons": ["tags", "acl"]}
        ],
        "diagnostics": [
            {"message": "deprecated field", "severity": "warning"}
        ],
        "duration": 1200,
        "changeSummary": {"create": 1, "update": 1, "same": 1}
    }"#;

    fn report(json: &str) -> PlanReport {
        json.try_into().expect("valid plan output")
    }

    #[test]
    fn summarizes_changes_and_warnings() {
        assert_eq!(report(PREVIEW).short_summary(), "created 1 || updated 1 || warn 1");
    }

    #[rstest]
    #[case(r#"{"changeSummary": {"same": 4}}"#, "unchanged")]
    #[case(r#"{"changeSummary": {"delete": 2, "replace": 1}}"#, "deleted 2 || replaced 1")]
    #[case(
        r#"{"changeSummary": {"create": 3}, "diagnostics": [{"message": "boom", "severity": "error"}]}"#,
        "error"
    )]
    #[case(r#"{}"#, "unchanged")]
    fn short_summary_cases(#[case] json: &str, #[case] expected: &str) {
        assert_eq!(report(json).short_summary(), expected);
    }

    #[test]
    fn error_message_joins_error_diagnostics_only() {
        let json = r#"{"diagnostics": [
            {"message": "first\n", "severity": "error"},
            {"message": "ignored", "severity": "warning"},
            {"message": "second", "severity": "error"}
        ]}"#;
        assert_eq!(report(json).error_message(), "first\nsecond");
        assert_eq!(report(PREVIEW).error_message(), "");
    }

    #[test]
    fn tree_string_detects_the_stack_prefix() {
        let tree = report(PREVIEW).tree_string(PrefixSource::Detect);
        let lines: Vec<&str> = tree.lines().collect();
        assert_eq!(lines[0], "pulumi:dev::proj");
        assert!(lines[1].starts_with("└─ pulumi:pulumi:Stack"));
        assert!(lines[2].starts_with("   └─ aws:s3/bucket:Bucket"));
        assert!(lines[2].trim_end().ends_with("create"));
        assert!(lines[3].ends_with("update  [diff: tags, acl]"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn destinations_share_the_rendered_pieces() {
        let rendered = report(PREVIEW).render(PrefixSource::Detect);
        assert_eq!(rendered.trailer_summary(), "pulumi output (created 1 || updated 1 || warn 1)");
        assert!(rendered.trailer_details().starts_with("```\npulumi:dev::proj\n"));
        assert!(rendered.trailer_details().ends_with("```"));
        assert!(rendered.comment_body().starts_with("**pulumi output** (created 1"));

        let plain = rendered.terminal_text(false);
        assert!(plain.starts_with("Summary: created 1 || updated 1 || warn 1\n\npulumi:dev::proj\n"));
    }

    #[test]
    fn error_message_is_fenced_before_the_tree() {
        let json = r#"{"diagnostics": [{"message": "quota exceeded", "severity": "error"}]}"#;
        let rendered = report(json).render(PrefixSource::Explicit(String::new()));
        assert_eq!(rendered.summary, "error");
        assert!(rendered.trailer_details().starts_with("```\nquota exceeded\n```\n\n```\n"));
        assert!(rendered.terminal_text(false).starts_with("Summary: error\n\nquota exceeded\n"));
    }

    #[test]
    fn from_path_reads_a_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "{PREVIEW}").expect("Failed to write to temp file");
        let report = PlanReport::from_path(file.path()).expect("readable plan");
        assert_eq!(report.output().steps.len(), 3);
        assert_eq!(report.output().duration, 1200);
    }

    #[test]
    fn from_path_reports_missing_files() {
        let result = PlanReport::from_path(Path::new("/this/path/does/not/exist.json"));
        assert!(matches!(result, Err(PlanReportError::ReadError { .. })));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let result: Result<PlanReport, _> = "{not json".try_into();
        assert!(matches!(result, Err(PlanReportError::ParseError { .. })));
    }
}
