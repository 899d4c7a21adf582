//! Sticky comments and PR trailers on GitHub.

mod client;
mod comment;
mod trailer;

pub use client::{DEFAULT_API_URL, GithubClient, GithubError, RepoSlug};
pub use comment::{CommentTarget, upsert_comment};
pub use trailer::set_pr_trailer_details;
