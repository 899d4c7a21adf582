use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::application::data::LogLevel;

#[derive(Parser, Debug, Clone)]
#[command(name = "multitool", version, about = "CI helpers for GitHub, Jira, Pulumi and BigQuery")]
pub struct Cli {
    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// Settings file, defaults to multitool.yaml in the working directory
    #[clap(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Tools to work with GitHub
    #[command(subcommand)]
    Github(GithubCommand),
    /// Tools to work with Pulumi
    #[command(subcommand)]
    Pulumi(PulumiCommand),
    /// Tools to work with Jira
    #[command(subcommand)]
    Jira(JiraCommand),
    /// Ingest go test -json output into BigQuery
    Gotest2bq(Gotest2bqArgs),
}

/// Where a comment or trailer goes.
#[derive(Args, Debug, Clone, Default)]
pub struct GithubTargetArgs {
    /// Name of the repo (owner/name)
    #[clap(long, env = "GITHUB_REPOSITORY")]
    pub repo: Option<String>,

    /// Number of the PR or issue
    #[clap(long)]
    pub pr: Option<u64>,

    /// SHA of the commit
    #[clap(long)]
    pub sha: Option<String>,

    /// Hidden text embedded in the comment to allow updating it later
    #[clap(long)]
    pub key: Option<String>,

    #[clap(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[clap(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum GithubCommand {
    /// Comment on GitHub from a file (can be - for stdin)
    Comment {
        file: PathBuf,
        #[command(flatten)]
        target: GithubTargetArgs,
    },
    /// Add text to the bottom of the PR description from a file (can be - for stdin)
    PrTrailer {
        file: PathBuf,
        #[command(flatten)]
        target: GithubTargetArgs,
        /// <summary> of the <details> block
        #[clap(long, default_value = "")]
        summary: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    GhComment,
    GhPrTrailer,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PulumiCommand {
    /// Process the JSON output of pulumi preview/up
    Jsonoutput(JsonOutputArgs),
}

#[derive(Args, Debug, Clone)]
pub struct JsonOutputArgs {
    pub file: PathBuf,

    /// Comma separated list of destinations
    #[clap(long, short, value_enum, value_delimiter = ',')]
    pub destinations: Vec<Destination>,

    /// Stack prefix stripped from every URN, detected from the stack resource when omitted
    #[clap(long)]
    pub prefix: Option<String>,

    #[command(flatten)]
    pub target: GithubTargetArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum JiraCommand {
    /// Create a Jira issue and print its key
    CreateIssue(CreateIssueArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct JiraConnectionArgs {
    #[clap(long, env = "JIRA_INSTANCE_URL")]
    pub instance_url: Option<String>,

    #[clap(long, env = "JIRA_PROJECT")]
    pub project: Option<String>,

    #[clap(long, env = "JIRA_USER")]
    pub user: Option<String>,

    /// Password or API token
    #[clap(long, env = "JIRA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Board id, moves the issue into the active sprint
    #[clap(long, env = "JIRA_BOARD")]
    pub board: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CreateIssueArgs {
    #[command(flatten)]
    pub connection: JiraConnectionArgs,

    /// Issue summary/title
    #[clap(long, short)]
    pub summary: Option<String>,

    #[clap(long, short, default_value = "")]
    pub description: String,

    #[clap(long, short, default_value = "")]
    pub assignee: String,

    /// Issue type, Auto picks Bug or Task from the summary
    #[clap(long = "type", short = 't')]
    pub issue_type: Option<String>,

    #[clap(long, short, value_delimiter = ',')]
    pub labels: Vec<String>,

    #[clap(long, short, value_delimiter = ',')]
    pub components: Vec<String>,

    /// Custom fields as key=value
    #[clap(long, value_parser = parse_key_value)]
    pub custom: Vec<(String, String)>,
}

#[derive(Args, Debug, Clone)]
pub struct Gotest2bqArgs {
    pub file: PathBuf,

    #[clap(long)]
    pub project: Option<String>,

    #[clap(long)]
    pub dataset: Option<String>,

    #[clap(long)]
    pub table: Option<String>,

    #[clap(long, default_value = "")]
    pub branch: String,

    #[clap(long, default_value = "")]
    pub env: String,

    #[clap(long, default_value = "")]
    pub commit: String,

    /// OAuth access token for the BigQuery API
    #[clap(long, env = "BIGQUERY_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[clap(long, env = "BIGQUERY_API_URL")]
    pub api_url: Option<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_jsonoutput_destinations() {
        let cli = Cli::try_parse_from([
            "multitool",
            "pulumi",
            "jsonoutput",
            "plan.json",
            "-d",
            "stdout,gh-pr-trailer",
            "--repo",
            "acme/infra",
            "--pr",
            "12",
        ])
        .unwrap();
        let Command::Pulumi(PulumiCommand::Jsonoutput(args)) = cli.command else {
            panic!("expected jsonoutput");
        };
        assert_eq!(
            args.destinations,
            vec![Destination::Stdout, Destination::GhPrTrailer]
        );
        assert_eq!(args.target.pr, Some(12));
    }

    #[test]
    fn rejects_unknown_destinations() {
        let result = Cli::try_parse_from([
            "multitool", "pulumi", "jsonoutput", "plan.json", "-d", "slack",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_custom_fields() {
        let cli = Cli::try_parse_from([
            "multitool",
            "jira",
            "create-issue",
            "-s",
            "Fix it",
            "-t",
            "Auto",
            "-l",
            "ci,infra",
            "--custom",
            "customfield_1=a=b",
        ])
        .unwrap();
        let Command::Jira(JiraCommand::CreateIssue(args)) = cli.command else {
            panic!("expected create-issue");
        };
        assert_eq!(args.labels, vec!["ci", "infra"]);
        assert_eq!(
            args.custom,
            vec![("customfield_1".to_string(), "a=b".to_string())]
        );
    }

    #[test]
    fn rejects_malformed_custom_fields() {
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=value").is_err());
    }
}
