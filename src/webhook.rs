//! Push webhook payload and the commit summary sent to the chat

use serde::Deserialize;

/// Fields of a push event that the relay reads. Every field is optional on the
/// wire and falls back to its empty value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookPayload {
    pub repository: Repository,
    pub sender: Sender,
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub html_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Sender {
    pub html_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Commit {
    pub message: String,
    pub author: CommitAuthor,
    pub url: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommitAuthor {
    pub name: String,
    #[serde(rename = "Username", alias = "username")]
    pub username: String,
}

impl WebhookPayload {
    /// Only the first commit of a push is reported.
    pub fn head_commit(&self) -> Option<&Commit> {
        self.commits.first()
    }
}

/// Escape underscores for Telegram's legacy Markdown. Nothing else is touched.
pub fn escape_markdown(text: &str) -> String {
    text.replace('_', "\\_")
}

/// Markdown summary of a commit, linking the committer handle to the sender profile.
pub fn commit_summary(commit: &Commit, sender_url: &str) -> String {
    format!(
        "*Author:* `{}`\n*Committer:* [{}]({})\n*Message:* `{}`\n*Time Stamp:* `{}`",
        commit.author.name,
        commit.author.username,
        sender_url,
        escape_markdown(&commit.message),
        commit.timestamp
    )
}
