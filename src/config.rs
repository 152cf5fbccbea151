use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::time::Duration;

/// Slack rejects section text longer than this.
pub const MAX_SECTION_TEXT: usize = 3000;
/// Slack rejects header text longer than this.
pub const MAX_HEADER_TEXT: usize = 150;
pub const MAX_BLOCKS_PER_MESSAGE: usize = 50;
/// A Header or Divider ends the current message once it holds more blocks than this.
pub const MIN_BLOCKS_BEFORE_BREAK: usize = 6;
/// Body characters per message. Slack clients fold longer messages behind "Show more".
pub const MAX_MESSAGE_TEXT: usize = 3000;
/// Deepest list or quote nesting kept; deeper levels are flattened into the last one.
pub const MAX_NESTING_DEPTH: usize = 6;

const MIN_SECTION_TEXT: usize = 16;
const MIN_HEADER_TEXT: usize = 8;
// title header + context + at least one body block
const MIN_BLOCKS_PER_MESSAGE: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub section_text: usize,
    pub header_text: usize,
    pub blocks_per_message: usize,
    pub min_blocks_before_break: usize,
    pub message_text: usize,
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            section_text: MAX_SECTION_TEXT,
            header_text: MAX_HEADER_TEXT,
            blocks_per_message: MAX_BLOCKS_PER_MESSAGE,
            min_blocks_before_break: MIN_BLOCKS_BEFORE_BREAK,
            message_text: MAX_MESSAGE_TEXT,
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

impl Limits {
    pub fn validate(&self) -> Result<()> {
        if self.section_text < MIN_SECTION_TEXT {
            return Err(Error::Config(format!(
                "section text limit must be at least {}, got {}",
                MIN_SECTION_TEXT, self.section_text
            )));
        }
        if self.header_text < MIN_HEADER_TEXT {
            return Err(Error::Config(format!(
                "header text limit must be at least {}, got {}",
                MIN_HEADER_TEXT, self.header_text
            )));
        }
        if self.blocks_per_message < MIN_BLOCKS_PER_MESSAGE {
            return Err(Error::Config(format!(
                "blocks per message must be at least {}, got {}",
                MIN_BLOCKS_PER_MESSAGE, self.blocks_per_message
            )));
        }
        if self.message_text < self.section_text {
            return Err(Error::Config(format!(
                "message text limit ({}) must not be below the section text limit ({})",
                self.message_text, self.section_text
            )));
        }
        if self.max_depth == 0 {
            return Err(Error::Config("nesting depth must be at least 1".into()));
        }
        Ok(())
    }
}

pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Client shared by the GitHub fetch and the webhook posts.
pub fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?)
}
