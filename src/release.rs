//! Turns a release into the Slack messages that announce it.

use crate::block::{Accessory, MessagePayload, SlackBlock, TextObject};
use crate::config::Limits;
use crate::diagnostics::Diagnostics;
use crate::guard;
use crate::packer::{self, CONTINUATION_RESERVED, FIRST_MESSAGE_RESERVED};
use crate::parser::parse_markdown;
use crate::translator::{escape, translate, Rendered};
use log::{debug, info, warn};

const FALLBACK_TITLE: &str = "Release";
const BUTTON_LABEL: &str = "View release";
const BUTTON_ACTION: &str = "view_release";

/// Everything the announcement needs to know about one release.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Release {
    pub title: String,
    pub body: String,
    pub url: String,
    pub tag: String,
    pub author: String,
}

impl Release {
    pub fn display_title(&self) -> &str {
        [self.title.trim(), self.tag.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or(FALLBACK_TITLE)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Formatter {
    limits: Limits,
    footer: Option<String>,
    release_button: bool,
}

impl Formatter {
    pub fn new(limits: Limits) -> Self {
        Formatter {
            limits,
            ..Formatter::default()
        }
    }

    /// mrkdwn placed in a Context block at the very end of the announcement.
    pub fn footer(mut self, footer: Option<String>) -> Self {
        self.footer = footer.filter(|footer| !footer.trim().is_empty());
        self
    }

    pub fn release_button(mut self, enabled: bool) -> Self {
        self.release_button = enabled;
        self
    }

    /// Formats `release`, logging whatever had to be degraded on the way.
    pub fn format(&self, release: &Release) -> Vec<MessagePayload> {
        let (payloads, diagnostics) = self.format_with_diagnostics(release);
        if !diagnostics.is_empty() {
            warn!(
                "{} construct(s) degraded in {}",
                diagnostics.iter().count(),
                release.display_title()
            );
            for diagnostic in diagnostics.iter() {
                warn!("  {}", diagnostic);
            }
        }
        payloads
    }

    pub fn format_with_diagnostics(&self, release: &Release) -> (Vec<MessagePayload>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut nodes = parse_markdown(&release.body, self.limits.max_depth);
        let rendered: Vec<Rendered> = nodes
            .by_ref()
            .flat_map(|node| translate(&node, &self.limits, &mut diagnostics))
            .collect();
        diagnostics.extend(nodes.take_diagnostics());

        let mut bodies = packer::pack(rendered, &self.limits, &mut diagnostics);
        if let Some(footer) = &self.footer {
            self.place_footer(&mut bodies, footer);
        }
        if self.release_button && !release.url.is_empty() {
            attach_button(&mut bodies, &release.url);
        }

        let title = release.display_title();
        let total = bodies.len().max(1);
        let mut payloads = Vec::with_capacity(total);
        let mut bodies = bodies.into_iter();
        let mut first = self.intro(release, title);
        first.extend(bodies.next().unwrap_or_default());
        payloads.push(MessagePayload::new(first));
        for (idx, body) in bodies.enumerate() {
            let mut blocks = vec![self.continuation(title, idx + 2, total)];
            blocks.extend(body);
            payloads.push(MessagePayload::new(blocks));
        }
        info!(
            "formatted {} into {} message(s), {} diagnostic(s)",
            title,
            payloads.len(),
            diagnostics.iter().count()
        );
        (payloads, diagnostics)
    }

    fn intro(&self, release: &Release, title: &str) -> Vec<SlackBlock> {
        let header = guard::truncate(title, self.limits.header_text);
        let mut elements = vec![];
        if !release.tag.trim().is_empty() {
            elements.push(TextObject::mrkdwn(format!("*Tag:* `{}`", escape(release.tag.trim()))));
        }
        if !release.author.trim().is_empty() {
            elements.push(TextObject::mrkdwn(format!("*Author:* {}", escape(release.author.trim()))));
        }
        if !release.url.is_empty() {
            elements.push(TextObject::mrkdwn(format!("<{}|{}>", escape(&release.url), BUTTON_LABEL)));
        }
        if header != title {
            debug!("title truncated to {} characters", self.limits.header_text);
            elements.push(TextObject::mrkdwn(guard::truncate(
                &escape(title),
                self.limits.section_text,
            )));
        }
        let mut blocks = vec![SlackBlock::header(header)];
        if !elements.is_empty() {
            blocks.push(SlackBlock::context(elements));
        }
        blocks
    }

    fn continuation(&self, title: &str, part: usize, total: usize) -> SlackBlock {
        let title = guard::truncate(title, self.limits.header_text);
        SlackBlock::context(vec![TextObject::mrkdwn(format!(
            "(continued) {} · part {} of {}",
            escape(&title),
            part,
            total
        ))])
    }

    fn place_footer(&self, bodies: &mut Vec<Vec<SlackBlock>>, footer: &str) {
        let block = SlackBlock::context(vec![TextObject::mrkdwn(guard::truncate(
            footer,
            self.limits.section_text,
        ))]);
        let reserved = if bodies.len() <= 1 {
            FIRST_MESSAGE_RESERVED
        } else {
            CONTINUATION_RESERVED
        };
        match bodies.last_mut() {
            Some(last) if last.len() + reserved < self.limits.blocks_per_message => last.push(block),
            _ => bodies.push(vec![block]),
        }
    }
}

fn attach_button(bodies: &mut [Vec<SlackBlock>], url: &str) {
    let section = bodies
        .first_mut()
        .and_then(|body| body.iter_mut().find(|block| matches!(block, SlackBlock::Section { .. })));
    if let Some(SlackBlock::Section { accessory, .. }) = section {
        *accessory = Some(Accessory::Button {
            text: TextObject::plain(BUTTON_LABEL),
            url: url.to_string(),
            action_id: String::from(BUTTON_ACTION),
        });
    }
}
