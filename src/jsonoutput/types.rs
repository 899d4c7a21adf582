use serde::Deserialize;

use super::builder::ResourceChange;

/// The document printed by `pulumi preview --json` and `pulumi up --json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanOutput {
    pub steps: Vec<PlanStep>,
    pub diagnostics: Vec<PlanDiagnostic>,
    pub duration: i64,
    pub change_summary: ChangeSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanStep {
    pub op: String,
    pub urn: String,
    pub provider: Option<String>,
    pub diff_reasons: Vec<String>,
}

impl From<&PlanStep> for ResourceChange {
    fn from(step: &PlanStep) -> Self {
        ResourceChange::new(step.urn.as_str(), step.op.as_str())
            .with_diff_reasons(step.diff_reasons.iter().cloned())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlanDiagnostic {
    pub urn: Option<String>,
    pub message: String,
    pub severity: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ChangeSummary {
    pub create: u64,
    pub delete: u64,
    pub replace: u64,
    pub same: u64,
    pub update: u64,
}
