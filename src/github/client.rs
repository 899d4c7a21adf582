use std::fmt;
use std::str::FromStr;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::ACCEPT;
use snafu::prelude::*;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("multitool/", env!("CARGO_PKG_VERSION"));

/// An `owner/name` repository reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoSlug {
    type Err = GithubError;

    fn from_str(repo: &str) -> Result<Self, Self::Err> {
        match repo.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => InvalidRepoSnafu { repo }.fail(),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Minimal REST client for the endpoints the multitool touches.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    base_url: String,
    token: String,
}

impl GithubClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, GithubError> {
        let token = token.into();
        ensure!(!token.trim().is_empty(), MissingTokenSnafu);
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context(ClientSnafu)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn url(&self, repo: &RepoSlug, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.base_url, repo.owner, repo.name, path)
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.authorized(self.http.get(url))
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.authorized(self.http.post(url))
    }

    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.authorized(self.http.patch(url))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum GithubError {
    #[snafu(display("Repository '{}' should look like owner/name", repo))]
    InvalidRepo { repo: String },
    #[snafu(display("GITHUB_TOKEN is not set"))]
    MissingToken,
    #[snafu(display("Failed to build the HTTP client"))]
    ClientError { source: reqwest::Error },
    #[snafu(display("Failed to list comments on {}", target))]
    ListCommentsError {
        target: String,
        source: crate::ext::HttpError,
    },
    #[snafu(display("Failed to edit comment {}", comment_id))]
    EditCommentError {
        comment_id: u64,
        source: crate::ext::HttpError,
    },
    #[snafu(display("Failed to create a comment on {}", target))]
    CreateCommentError {
        target: String,
        source: crate::ext::HttpError,
    },
    #[snafu(display("Failed to get pull request #{} of {}", number, repo))]
    GetPullRequestError {
        repo: String,
        number: u64,
        source: crate::ext::HttpError,
    },
    #[snafu(display("Failed to edit pull request #{} of {}", number, repo))]
    EditPullRequestError {
        repo: String,
        number: u64,
        source: crate::ext::HttpError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[test]
    fn parses_owner_and_name() {
        let slug: RepoSlug = "acme/infra".parse().unwrap();
        assert_eq!(slug.owner, "acme");
        assert_eq!(slug.name, "infra");
        assert_eq!(slug.to_string(), "acme/infra");
    }

    #[rstest]
    #[case("")]
    #[case("acme")]
    #[case("/infra")]
    #[case("acme/")]
    #[case("acme/infra/extra")]
    fn rejects_malformed_repos(#[case] repo: &str) {
        assert!(matches!(
            repo.parse::<RepoSlug>(),
            Err(GithubError::InvalidRepo { .. })
        ));
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(
            GithubClient::new(DEFAULT_API_URL, "  "),
            Err(GithubError::MissingToken)
        ));
    }

    #[test]
    fn builds_repository_urls() {
        let client = GithubClient::new("https://github.example.com/api/v3/", "t").unwrap();
        let repo: RepoSlug = "acme/infra".parse().unwrap();
        assert_eq!(
            client.url(&repo, "issues/7/comments"),
            "https://github.example.com/api/v3/repos/acme/infra/issues/7/comments"
        );
    }
}
