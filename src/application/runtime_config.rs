use snafu::prelude::*;

use crate::cli::{CreateIssueArgs, GithubTargetArgs, Gotest2bqArgs, JiraConnectionArgs};
use crate::config::{BigQuerySettings, GithubSettings, JiraSettings};
use crate::github::{self, CommentTarget, GithubError, RepoSlug};
use crate::gotest2bq::{self, IngestArgs, TableRef};
use crate::jira::{AUTO_ISSUE_TYPE, CreateIssueRequest, JiraConnection, JiraError};

pub const DEFAULT_STICKY_KEY: &str = "default-key";

/// GitHub settings after flags, environment and the settings file are merged.
#[derive(Debug, Clone)]
pub struct GithubRuntimeConfig {
    pub repo: RepoSlug,
    pub key: String,
    pub api_url: String,
    pub token: String,
    pub pr: Option<u64>,
    pub sha: Option<String>,
}

impl GithubRuntimeConfig {
    pub fn resolve(
        args: &GithubTargetArgs,
        settings: &GithubSettings,
    ) -> Result<Self, RuntimeConfigError> {
        let repo = required(args.repo.as_ref().or(settings.repo.as_ref()), "repo")?;
        let repo = repo.parse().context(InvalidRepoSnafu)?;

        Ok(Self {
            repo,
            key: args
                .key
                .clone()
                .or_else(|| settings.key.clone())
                .unwrap_or_else(|| DEFAULT_STICKY_KEY.to_string()),
            api_url: args
                .api_url
                .clone()
                .or_else(|| settings.api_url.clone())
                .unwrap_or_else(|| github::DEFAULT_API_URL.to_string()),
            token: args.token.clone().unwrap_or_default(),
            pr: args.pr.filter(|&pr| pr != 0),
            sha: args.sha.clone().filter(|sha| !sha.is_empty()),
        })
    }

    /// A PR number wins over a commit SHA.
    pub fn comment_target(&self) -> Result<CommentTarget, RuntimeConfigError> {
        match (self.pr, &self.sha) {
            (Some(pr), _) => Ok(CommentTarget::Issue(pr)),
            (None, Some(sha)) => Ok(CommentTarget::Commit(sha.clone())),
            (None, None) => MissingCommentTargetSnafu.fail(),
        }
    }

    pub fn require_pr(&self) -> Result<u64, RuntimeConfigError> {
        self.pr.context(MissingValueSnafu { name: "pr" })
    }
}

pub fn resolve_jira(
    args: &JiraConnectionArgs,
    settings: &JiraSettings,
) -> Result<JiraConnection, RuntimeConfigError> {
    let board = args.board.as_deref().or(settings.board.as_deref());
    Ok(JiraConnection {
        instance_url: required(
            args.instance_url.as_ref().or(settings.instance_url.as_ref()),
            "instance url",
        )?,
        project: required(args.project.as_ref().or(settings.project.as_ref()), "project")?,
        user: required(args.user.as_ref().or(settings.user.as_ref()), "user")?,
        password: required(args.password.as_ref(), "password")?,
        board: JiraConnection::parse_board(board).context(InvalidBoardSnafu)?,
    })
}

pub fn resolve_issue_request(args: &CreateIssueArgs) -> Result<CreateIssueRequest, RuntimeConfigError> {
    let summary = required(args.summary.as_ref(), "summary")?;
    let issue_type = required(args.issue_type.as_ref(), "type")?;
    Ok(CreateIssueRequest {
        summary,
        description: args.description.clone(),
        assignee: args.assignee.clone(),
        issue_type: if issue_type.eq_ignore_ascii_case(AUTO_ISSUE_TYPE) {
            AUTO_ISSUE_TYPE.to_string()
        } else {
            issue_type
        },
        labels: args.labels.clone(),
        components: args.components.clone(),
        custom_fields: args.custom.iter().cloned().collect(),
    })
}

pub fn resolve_ingest(
    args: &Gotest2bqArgs,
    settings: &BigQuerySettings,
) -> Result<IngestArgs, RuntimeConfigError> {
    let table = TableRef {
        project: required(args.project.as_ref().or(settings.project.as_ref()), "project")?,
        dataset: required(args.dataset.as_ref().or(settings.dataset.as_ref()), "dataset")?,
        table: required(args.table.as_ref().or(settings.table.as_ref()), "table")?,
    };
    Ok(IngestArgs {
        filename: args.file.clone(),
        table,
        branch: args.branch.clone(),
        env: args.env.clone(),
        commit: args.commit.clone(),
        api_url: args
            .api_url
            .clone()
            .or_else(|| settings.api_url.clone())
            .unwrap_or_else(|| gotest2bq::DEFAULT_API_URL.to_string()),
        access_token: args.access_token.clone().unwrap_or_default(),
    })
}

fn required(value: Option<&String>, name: &'static str) -> Result<String, RuntimeConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .context(MissingValueSnafu { name })
}

#[derive(Debug, Snafu)]
pub enum RuntimeConfigError {
    #[snafu(display("{} must be set", name))]
    MissingValue { name: &'static str },
    #[snafu(display("either --pr or --sha must be set"))]
    MissingCommentTarget,
    #[snafu(display("Invalid repository"))]
    InvalidRepoError { source: GithubError },
    #[snafu(display("Invalid board"))]
    InvalidBoardError { source: JiraError },
}
