//! Posts announcement messages to a Slack incoming webhook.

use crate::block::MessagePayload;
use crate::config;
use crate::error::{Error, Result};
use log::info;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

pub struct Webhook {
    http: Client,
    url: Url,
}

impl Webhook {
    pub fn new(url: &str) -> Result<Self> {
        let url = parse_webhook_url(url)?;
        Ok(Webhook {
            http: config::http_client()?,
            url,
        })
    }

    pub fn post(&self, payload: &MessagePayload) -> Result<()> {
        let response = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_json()?)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Slack {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Posts in order and stops at the first failure.
    pub fn post_all(&self, payloads: &[MessagePayload]) -> Result<()> {
        for (idx, payload) in payloads.iter().enumerate() {
            info!(
                "posting message {} of {} ({} blocks)",
                idx + 1,
                payloads.len(),
                payload.blocks.len()
            );
            self.post(payload)?;
        }
        Ok(())
    }
}

fn parse_webhook_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| Error::Config(format!("invalid webhook URL: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "webhook URL must be http(s), got {}",
            parsed.scheme()
        )));
    }
    Ok(parsed)
}
