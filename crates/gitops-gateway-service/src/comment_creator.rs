//! Pull request comments through the GitHub REST API.

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use gitops_gateway_core::runner::CommentCreator;
use gitops_gateway_core::Repo;
use reqwest::header::{ACCEPT, USER_AGENT};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// GitHub rejects comment bodies longer than this many bytes.
const MAX_COMMENT_LENGTH: usize = 65536;

const SPLIT_END: &str = "\n```\n</details>\n<br>\n\n**Warning**: Output length greater than max comment size. Continued in next comment.";

/// Posts comments as the configured GitHub user.
///
/// Long comments are split into several, each carrying a header that links
/// it to the previous one. When a command label is given, the first comment
/// starts with a hidden `<!-- gitops-gateway:{label} -->` marker so later
/// runs can find the output of earlier ones.
pub struct GithubCommentCreator {
    client: reqwest::Client,
    api_url: String,
    token: Zeroizing<String>,
}

impl fmt::Debug for GithubCommentCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubCommentCreator")
            .field("api_url", &self.api_url)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl GithubCommentCreator {
    /// # Errors
    ///
    /// Fails if `api_url` is not an absolute URL or the HTTP client cannot be
    /// built.
    pub fn new(api_url: &str, token: &str) -> anyhow::Result<Self> {
        reqwest::Url::parse(api_url).with_context(|| format!("invalid GitHub API URL {api_url:?}"))?;
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: Zeroizing::new(token.to_string()),
        })
    }
}

#[async_trait]
impl CommentCreator for GithubCommentCreator {
    async fn create_comment(
        &self,
        repo: &Repo,
        pull_num: u64,
        text: &str,
        command_label: &str,
    ) -> anyhow::Result<()> {
        let path = format!(
            "/repos/{}/{}/issues/{}/comments",
            repo.owner, repo.name, pull_num
        );
        let url = format!("{}{}", self.api_url, path);

        let body = if command_label.is_empty() {
            text.to_string()
        } else {
            format!("<!-- gitops-gateway:{command_label} -->\n{text}")
        };

        for comment in split_comment(&body, MAX_COMMENT_LENGTH, command_label) {
            let response = self
                .client
                .post(&url)
                .bearer_auth(self.token.as_str())
                .header(ACCEPT, "application/vnd.github+json")
                .header(USER_AGENT, concat!("gitops-gateway/", env!("CARGO_PKG_VERSION")))
                .json(&serde_json::json!({ "body": comment }))
                .send()
                .await
                .with_context(|| format!("POST {path} failed"))?;

            let status = response.status();
            debug!(status = %status, pull_num, "POST {} returned", path);
            if !status.is_success() {
                bail!("POST {path} returned {status}");
            }
        }

        Ok(())
    }
}

/// Split `comment` into pieces no longer than `max_len` bytes, separators
/// included.
fn split_comment(comment: &str, max_len: usize, command_label: &str) -> Vec<String> {
    if comment.len() <= max_len {
        return vec![comment.to_string()];
    }

    let split_start = if command_label.is_empty() {
        "Continued from previous comment.\n<details><summary>Show Output</summary>\n\n```diff\n"
            .to_string()
    } else {
        format!(
            "Continued {command_label} output from previous comment.\n<details><summary>Show Output</summary>\n\n```diff\n"
        )
    };
    let chunk_len = max_len
        .saturating_sub(SPLIT_END.len() + split_start.len())
        .max(1);

    let mut pieces = Vec::new();
    let mut rest = comment;
    let mut first = true;
    while !rest.is_empty() {
        let mut end = chunk_len.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        // A chunk length shorter than the first character would never advance.
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (chunk, tail) = rest.split_at(end);

        let mut piece = String::with_capacity(max_len);
        if !first {
            piece.push_str(&split_start);
        }
        piece.push_str(chunk);
        if !tail.is_empty() {
            piece.push_str(SPLIT_END);
        }
        pieces.push(piece);

        rest = tail;
        first = false;
    }
    pieces
}

#[cfg(test)]
#[path = "comment_creator_tests.rs"]
mod tests;
