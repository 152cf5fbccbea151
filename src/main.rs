pub mod block;
pub mod config;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod github;
pub mod guard;
pub mod packer;
pub mod parser;
pub mod release;
pub mod slack;
pub mod translator;

use config::Limits;
use error::{Error, Result};
use github::{GitHubClient, ReleaseLocator};
use log::{debug, info};
use release::{Formatter, Release};
use slack::Webhook;
use std::io::{self, Read};
use structopt::StructOpt;

fn read() -> Result<String> {
    let mut content = String::new();
    let stdin = io::stdin();
    let mut handle = stdin.lock();
    handle.read_to_string(&mut content)?;
    if !content.ends_with('\n') {
        content += "\n"
    }
    Ok(content)
}

#[derive(Debug, StructOpt)]
#[structopt(about = "Announce a GitHub release in Slack")]
struct Opt {
    #[structopt(long = "webhook-url", env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<String>,

    /// https://github.com/<owner>/<repo>/releases/tag/<tag>
    #[structopt(long = "release-url", env = "RELEASE_URL")]
    pub release_url: Option<String>,

    #[structopt(long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[structopt(long = "github-api-url", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// Put in front of the release name; defaults to the repository name
    #[structopt(long = "title-prefix")]
    pub title_prefix: Option<String>,

    /// mrkdwn text closing the announcement
    #[structopt(long = "footer")]
    pub footer: Option<String>,

    #[structopt(long = "release-button")]
    pub release_button: bool,

    /// Read the release notes from stdin instead of fetching them
    #[structopt(long = "stdin")]
    pub stdin: bool,

    #[structopt(long = "title", default_value = "")]
    pub title: String,

    #[structopt(long = "tag", default_value = "")]
    pub tag: String,

    #[structopt(long = "author", default_value = "")]
    pub author: String,

    /// Print the payloads instead of posting them
    #[structopt(long = "dry-run")]
    pub dry_run: bool,

    #[structopt(long = "max-section-text", default_value = "3000")]
    pub max_section_text: usize,

    #[structopt(long = "max-header-text", default_value = "150")]
    pub max_header_text: usize,

    #[structopt(long = "max-blocks", default_value = "50")]
    pub max_blocks: usize,

    #[structopt(long = "min-blocks-before-break", default_value = "6")]
    pub min_blocks_before_break: usize,

    #[structopt(long = "max-message-text", default_value = "3000")]
    pub max_message_text: usize,

    #[structopt(long = "max-depth", default_value = "6")]
    pub max_depth: usize,

    #[structopt(long = "debug")]
    pub debug: bool,
}

impl Opt {
    fn limits(&self) -> Limits {
        Limits {
            section_text: self.max_section_text,
            header_text: self.max_header_text,
            blocks_per_message: self.max_blocks,
            min_blocks_before_break: self.min_blocks_before_break,
            message_text: self.max_message_text,
            max_depth: self.max_depth,
        }
    }

    fn release(&self) -> Result<Release> {
        if self.stdin {
            return Ok(Release {
                title: self.title.clone(),
                body: read()?,
                url: self.release_url.clone().unwrap_or_default(),
                tag: self.tag.clone(),
                author: self.author.clone(),
            });
        }
        let release_url = self
            .release_url
            .as_deref()
            .ok_or_else(|| Error::Config("--release-url or RELEASE_URL is required".into()))?;
        let locator: ReleaseLocator = release_url.parse()?;
        let client = GitHubClient::new(&self.github_api_url, self.github_token.clone())?;
        let prefix = self.title_prefix.as_deref().unwrap_or(&locator.repo);
        Ok(client.fetch_release(&locator)?.into_release(prefix))
    }
}

fn run(opt: &Opt) -> Result<()> {
    let limits = opt.limits();
    limits.validate()?;
    let webhook = match (&opt.webhook_url, opt.dry_run) {
        (_, true) => None,
        (Some(url), false) => Some(Webhook::new(url)?),
        (None, false) => {
            return Err(Error::Config(
                "--webhook-url or SLACK_WEBHOOK_URL is required".into(),
            ))
        }
    };

    let release = opt.release()?;
    debug!(">>> release = {:?}", &release);
    let formatter = Formatter::new(limits)
        .footer(opt.footer.clone())
        .release_button(opt.release_button);
    let payloads = formatter.format(&release);

    match webhook {
        Some(webhook) => {
            webhook.post_all(&payloads)?;
            info!("announced {} in {} message(s)", release.display_title(), payloads.len());
        }
        None => {
            for payload in &payloads {
                println!("{}", serde_json::to_string_pretty(payload)?);
            }
        }
    }
    Ok(())
}

fn main() {
    let opt = Opt::from_args();
    let level = if opt.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    debug!(">>> opt = {:?}", &opt);
    if let Err(e) = run(&opt) {
        println!("::error::{}", e);
        std::process::exit(1);
    }
}
