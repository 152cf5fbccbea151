//! Fetches the release a `.../releases/tag/<tag>` URL points at.

use crate::config;
use crate::error::{Error, Result};
use crate::release::Release;
use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use std::str::FromStr;
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseLocator {
    pub owner: String,
    pub repo: String,
    pub tag: String,
}

impl ReleaseLocator {
    pub fn api_url(&self, api: &str) -> String {
        format!(
            "{}/repos/{}/{}/releases/tags/{}",
            api.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.tag
        )
    }
}

impl FromStr for ReleaseLocator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidReleaseUrl(s.to_string());
        let url = Url::parse(s.trim()).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid());
        }
        let segments: Vec<&str> = url
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|segment| !segment.is_empty())
            .collect();
        match segments.as_slice() {
            [owner, repo, "releases", "tag", tag @ ..] if !tag.is_empty() => Ok(ReleaseLocator {
                owner: owner.to_string(),
                repo: repo.to_string(),
                tag: tag.join("/"),
            }),
            _ => Err(invalid()),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

/// The fields of the GitHub release object that end up in the announcement.
#[derive(Clone, Debug, Deserialize)]
pub struct GitHubRelease {
    pub name: Option<String>,
    pub tag_name: String,
    /// `null` for a release published without notes.
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
    pub author: Option<GitHubUser>,
}

impl GitHubRelease {
    pub fn into_release(self, title_prefix: &str) -> Release {
        Release {
            title: compose_title(title_prefix, self.name.as_deref(), &self.tag_name),
            body: self.body.unwrap_or_default(),
            url: self.html_url,
            tag: self.tag_name,
            author: self.author.map(|author| author.login).unwrap_or_default(),
        }
    }
}

/// `"{prefix} {name}"`, falling back to the tag for unnamed releases.
/// An empty prefix leaves the name alone.
pub fn compose_title(prefix: &str, name: Option<&str>, tag: &str) -> String {
    let name = name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| tag.trim());
    let prefix = prefix.trim();
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", prefix, name)
    }
}

pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self> {
        Url::parse(api_url)
            .map_err(|e| Error::Config(format!("invalid GitHub API URL {}: {}", api_url, e)))?;
        Ok(GitHubClient {
            http: config::http_client()?,
            api_url: api_url.to_string(),
            token: token.filter(|token| !token.is_empty()),
        })
    }

    pub fn fetch_release(&self, locator: &ReleaseLocator) -> Result<GitHubRelease> {
        let url = locator.api_url(&self.api_url);
        info!("fetching release {}", url);
        let mut request = self.http.get(&url).header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::GitHub {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        let text = response.text()?;
        debug!("release response: {} bytes", text.len());
        Ok(serde_json::from_str(&text)?)
    }
}
