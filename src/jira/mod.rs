//! Jira issue creation and sprint placement.

mod client;
mod issue;

pub use client::{JiraConnection, JiraError};
pub use issue::{AUTO_ISSUE_TYPE, CreateIssueRequest, create_issue};
