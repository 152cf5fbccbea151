use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures that stop a release announcement.
///
/// Malformed Markdown is never one of these; see [`crate::diagnostics`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unrecognized GitHub release URL: {0}")]
    InvalidReleaseUrl(String),

    #[error("GitHub API error {status}: {body}")]
    GitHub { status: u16, body: String },

    #[error("Slack webhook error {status}: {body}")]
    Slack { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
