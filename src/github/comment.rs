use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::ext::SendExt;

use super::client::{
    CreateCommentSnafu, EditCommentSnafu, GithubClient, GithubError, ListCommentsSnafu, RepoSlug,
};

const COMMENTS_PER_PAGE: &str = "100";

#[derive(Debug, Deserialize)]
struct Comment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

/// Hidden marker appended to a comment so later runs can find it again.
pub fn sticky_marker(key: &str) -> String {
    format!("\n<!-- key {key} -->\n")
}

/// What a comment is attached to.
#[derive(Debug, Clone)]
pub enum CommentTarget {
    Issue(u64),
    Commit(String),
}

impl CommentTarget {
    fn list_path(&self) -> String {
        match self {
            CommentTarget::Issue(number) => format!("issues/{number}/comments"),
            CommentTarget::Commit(sha) => format!("commits/{sha}/comments"),
        }
    }

    fn edit_path(&self, comment_id: u64) -> String {
        match self {
            CommentTarget::Issue(_) => format!("issues/comments/{comment_id}"),
            CommentTarget::Commit(_) => format!("comments/{comment_id}"),
        }
    }

    fn describe(&self, repo: &RepoSlug) -> String {
        match self {
            CommentTarget::Issue(number) => format!("{repo}#{number}"),
            CommentTarget::Commit(sha) => format!("{repo}@{sha}"),
        }
    }
}

/// Creates the comment, or edits the one carrying the same sticky key.
pub fn upsert_comment(
    client: &GithubClient,
    repo: &RepoSlug,
    target: &CommentTarget,
    text: &str,
    sticky_key: &str,
) -> Result<(), GithubError> {
    let marker = sticky_marker(sticky_key);
    let body = format!("{text}{marker}");
    let request = CommentRequest { body: &body };
    let described = target.describe(repo);

    let existing: Vec<Comment> = client
        .get(&client.url(repo, &target.list_path()))
        .query(&[("per_page", COMMENTS_PER_PAGE)])
        .send_json()
        .context(ListCommentsSnafu {
            target: described.clone(),
        })?;
    debug!("Found {} existing comments on {}", existing.len(), described);

    let sticky = existing
        .iter()
        .find(|comment| comment.body.as_deref().is_some_and(|b| b.contains(&marker)));

    if let Some(comment) = sticky {
        client
            .patch(&client.url(repo, &target.edit_path(comment.id)))
            .json(&request)
            .send_checked()
            .context(EditCommentSnafu {
                comment_id: comment.id,
            })?;
        info!("Updated comment {} on {}", comment.id, described);
        return Ok(());
    }

    client
        .post(&client.url(repo, &target.list_path()))
        .json(&request)
        .send_checked()
        .context(CreateCommentSnafu {
            target: described.clone(),
        })?;
    info!("Created comment on {}", described);
    Ok(())
}
