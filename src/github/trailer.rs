use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use tracing::info;

use crate::ext::SendExt;

use super::client::{
    EditPullRequestSnafu, GetPullRequestSnafu, GithubClient, GithubError, RepoSlug,
};

#[derive(Debug, Deserialize)]
struct PullRequest {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Serialize)]
struct PullRequestEdit<'a> {
    body: &'a str,
}

fn details_opening_tag(sticky_key: &str) -> String {
    format!("<details key=\"{sticky_key}\">")
}

/// Replaces the keyed `<details>` block of `body`, or appends one.
pub fn splice_trailer(body: &str, summary: &str, details: &str, sticky_key: &str) -> String {
    let opening_tag = details_opening_tag(sticky_key);
    let block = format!("\n{opening_tag}<summary>{summary}</summary>\n\n{details}\n\n</details>");

    if body.contains(&opening_tag) {
        let pattern = format!("(?s)\n?{}.+?</details>", regex::escape(&opening_tag));
        // An escaped literal followed by fixed syntax always compiles.
        if let Ok(re) = Regex::new(&pattern) {
            return re.replace_all(body, NoExpand(&block)).into_owned();
        }
    }

    format!("{body}{block}")
}

/// Keeps a collapsible block at the bottom of a PR description. Editing the
/// description does not notify subscribers the way a new comment does.
pub fn set_pr_trailer_details(
    client: &GithubClient,
    repo: &RepoSlug,
    number: u64,
    summary: &str,
    details: &str,
    sticky_key: &str,
) -> Result<(), GithubError> {
    let url = client.url(repo, &format!("pulls/{number}"));
    let pull: PullRequest = client.get(&url).send_json().context(GetPullRequestSnafu {
        repo: repo.to_string(),
        number,
    })?;

    let body = splice_trailer(
        pull.body.as_deref().unwrap_or_default(),
        summary,
        details,
        sticky_key,
    );

    client
        .patch(&url)
        .json(&PullRequestEdit { body: &body })
        .send_checked()
        .context(EditPullRequestSnafu {
            repo: repo.to_string(),
            number,
        })?;
    info!("Updated trailer '{}' of {}#{}", sticky_key, repo, number);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, method, path},
    };

    #[test]
    fn appends_a_block_to_a_body_without_one() {
        let body = splice_trailer("Fixes the thing.", "pulumi output (unchanged)", "```\nx\n```", "k");
        assert_eq!(
            body,
            "Fixes the thing.\n<details key=\"k\"><summary>pulumi output (unchanged)</summary>\n\n```\nx\n```\n\n</details>"
        );
    }

    #[test]
    fn replaces_only_the_block_with_the_same_key() {
        let first = splice_trailer("Intro", "s1", "one", "a");
        let with_other = splice_trailer(&first, "other", "keep me", "b");
        let updated = splice_trailer(&with_other, "s2", "two", "a");

        assert!(!updated.contains("one"));
        assert!(updated.contains("<summary>s2</summary>\n\ntwo"));
        assert!(updated.contains("keep me"));
        assert_eq!(updated.matches("<details key=\"a\">").count(), 1);
        assert!(updated.starts_with("Intro\n<details"));
    }

    #[test]
    fn repeated_updates_are_stable() {
        let once = splice_trailer("Intro", "s", "d", "k");
        let twice = splice_trailer(&once, "s", "d", "k");
        assert_eq!(once, twice);
    }

    #[test]
    fn dollar_signs_in_details_are_kept_literally() {
        let first = splice_trailer("", "s", "old", "k");
        let updated = splice_trailer(&first, "s", "cost $1 and ${name}", "k");
        assert!(updated.contains("cost $1 and ${name}"));
    }

    #[test]
    fn keys_with_regex_metacharacters_are_escaped() {
        let first = splice_trailer("", "s", "old", "a.b+");
        let updated = splice_trailer(&first, "s", "new", "a.b+");
        assert!(updated.contains("new") && !updated.contains("old"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn patches_the_pull_request_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/infra/pulls/12"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"body": null})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/repos/acme/infra/pulls/12"))
            .and(body_string_contains("<details key=\\\"pulumi\\\">"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        tokio::task::spawn_blocking(move || {
            let client = GithubClient::new(&uri, "token")?;
            let repo: RepoSlug = "acme/infra".parse()?;
            set_pr_trailer_details(&client, &repo, 12, "summary", "details", "pulumi")
        })
        .await
        .unwrap()
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_pull_request_is_reported_with_its_number() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = tokio::task::spawn_blocking(move || {
            let client = GithubClient::new(&uri, "token")?;
            let repo: RepoSlug = "acme/infra".parse()?;
            set_pr_trailer_details(&client, &repo, 41, "summary", "details", "pulumi")
        })
        .await
        .unwrap();
        assert!(matches!(
            result,
            Err(GithubError::GetPullRequestError { number: 41, .. })
        ));
    }
}
