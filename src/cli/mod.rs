mod cli;

pub use cli::{
    Cli, Command, CreateIssueArgs, Destination, GithubCommand, GithubTargetArgs, Gotest2bqArgs,
    JiraCommand, JiraConnectionArgs, JsonOutputArgs, PulumiCommand,
};
