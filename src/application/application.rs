use std::path::Path;

use snafu::Snafu;
use snafu::prelude::*;
use supports_color::Stream;
use tracing::{debug, info, warn};

use crate::application::runtime_config::{self, GithubRuntimeConfig, RuntimeConfigError};
use crate::cli::{
    Cli, Command, CreateIssueArgs, Destination, GithubCommand, Gotest2bqArgs, JiraCommand,
    JsonOutputArgs, PulumiCommand,
};
use crate::config::{Settings, SettingsError};
use crate::ext::{InputError, read_file_or_stdin};
use crate::github::{self, GithubClient, GithubError};
use crate::gotest2bq::{self, IngestError};
use crate::jira::{self, JiraError};
use crate::jsonoutput::{PlanReport, PlanReportError, PrefixSource, RenderedPlan};

pub struct Application;

impl Application {
    pub fn run(cli: Cli) -> Result<(), ApplicationError> {
        let settings =
            Settings::read(cli.config.as_deref(), Path::new(".")).context(SettingsSnafu)?;
        debug!("Loaded settings: {:?}", settings);

        match &cli.command {
            Command::Github(command) => Self::github(command, &settings),
            Command::Pulumi(PulumiCommand::Jsonoutput(args)) => Self::jsonoutput(args, &settings),
            Command::Jira(JiraCommand::CreateIssue(args)) => Self::create_issue(args, &settings),
            Command::Gotest2bq(args) => Self::gotest2bq(args, &settings),
        }
    }

    fn github(command: &GithubCommand, settings: &Settings) -> Result<(), ApplicationError> {
        match command {
            GithubCommand::Comment { file, target } => {
                let config =
                    GithubRuntimeConfig::resolve(target, &settings.github).context(RuntimeConfigSnafu)?;
                let comment_target = config.comment_target().context(RuntimeConfigSnafu)?;
                let text = read_file_or_stdin(file).context(InputSnafu)?;
                let client = github_client(&config)?;
                github::upsert_comment(&client, &config.repo, &comment_target, &text, &config.key)
                    .context(GithubSnafu)
            }
            GithubCommand::PrTrailer {
                file,
                target,
                summary,
            } => {
                let config =
                    GithubRuntimeConfig::resolve(target, &settings.github).context(RuntimeConfigSnafu)?;
                let pr = config.require_pr().context(RuntimeConfigSnafu)?;
                let details = read_file_or_stdin(file).context(InputSnafu)?;
                let client = github_client(&config)?;
                github::set_pr_trailer_details(&client, &config.repo, pr, summary, &details, &config.key)
                    .context(GithubSnafu)
            }
        }
    }

    fn jsonoutput(args: &JsonOutputArgs, settings: &Settings) -> Result<(), ApplicationError> {
        let report = PlanReport::from_path(&args.file).context(PlanReportSnafu)?;
        let prefix = match &args.prefix {
            Some(prefix) => PrefixSource::Explicit(prefix.clone()),
            None => PrefixSource::Detect,
        };
        let rendered = report.render(prefix);
        info!("Plan summary: {}", rendered.summary);

        if args.destinations.is_empty() {
            warn!("No destinations given, nothing to publish");
        }

        for destination in &args.destinations {
            debug!("Publishing plan output to {:?}", destination);
            match destination {
                Destination::Stdout => {
                    let color = supports_color::on(Stream::Stdout).is_some();
                    print!("{}", rendered.terminal_text(color));
                }
                Destination::GhComment => publish_comment(&rendered, args, settings)?,
                Destination::GhPrTrailer => publish_trailer(&rendered, args, settings)?,
            }
        }
        Ok(())
    }

    fn create_issue(args: &CreateIssueArgs, settings: &Settings) -> Result<(), ApplicationError> {
        let connection =
            runtime_config::resolve_jira(&args.connection, &settings.jira).context(RuntimeConfigSnafu)?;
        let request = runtime_config::resolve_issue_request(args).context(RuntimeConfigSnafu)?;
        let key = jira::create_issue(&connection, &request).context(JiraSnafu)?;
        println!("{key}");
        Ok(())
    }

    fn gotest2bq(args: &Gotest2bqArgs, settings: &Settings) -> Result<(), ApplicationError> {
        let ingest_args =
            runtime_config::resolve_ingest(args, &settings.bigquery).context(RuntimeConfigSnafu)?;
        gotest2bq::ingest_with_retry(&ingest_args).context(IngestSnafu)
    }
}

fn github_client(config: &GithubRuntimeConfig) -> Result<GithubClient, ApplicationError> {
    GithubClient::new(&config.api_url, &config.token).context(GithubSnafu)
}

fn publish_comment(
    rendered: &RenderedPlan,
    args: &JsonOutputArgs,
    settings: &Settings,
) -> Result<(), ApplicationError> {
    let config =
        GithubRuntimeConfig::resolve(&args.target, &settings.github).context(RuntimeConfigSnafu)?;
    let target = config.comment_target().context(RuntimeConfigSnafu)?;
    let client = github_client(&config)?;
    github::upsert_comment(
        &client,
        &config.repo,
        &target,
        &rendered.comment_body(),
        &config.key,
    )
    .context(GithubSnafu)
}

fn publish_trailer(
    rendered: &RenderedPlan,
    args: &JsonOutputArgs,
    settings: &Settings,
) -> Result<(), ApplicationError> {
    let config =
        GithubRuntimeConfig::resolve(&args.target, &settings.github).context(RuntimeConfigSnafu)?;
    let pr = config.require_pr().context(RuntimeConfigSnafu)?;
    let client = github_client(&config)?;
    github::set_pr_trailer_details(
        &client,
        &config.repo,
        pr,
        &rendered.trailer_summary(),
        &rendered.trailer_details(),
        &config.key,
    )
    .context(GithubSnafu)
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while loading settings"))]
    SettingsError { source: SettingsError },
    #[snafu(display("Invalid command configuration"))]
    RuntimeConfigError { source: RuntimeConfigError },
    #[snafu(display("Failed to read the command input"))]
    InputError { source: InputError },
    #[snafu(display("Failed to process the plan output"))]
    PlanReportError { source: PlanReportError },
    #[snafu(display("GitHub request failed"))]
    GithubError { source: GithubError },
    #[snafu(display("Jira request failed"))]
    JiraError { source: JiraError },
    #[snafu(display("Test log ingestion failed"))]
    IngestError { source: IngestError },
}
