//! Slack Block Kit types.
//!
//! Only the blocks a release announcement needs are modelled. They serialize
//! straight into the JSON Slack expects, e.g. `{"type": "divider"}`.
//!
//! See <https://api.slack.com/reference/block-kit/blocks>.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String, emoji: bool },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        TextObject::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        TextObject::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            TextObject::PlainText { text, .. } | TextObject::Mrkdwn { text } => text,
        }
    }

    /// Length as Slack counts it, in characters.
    pub fn char_count(&self) -> usize {
        self.text().chars().count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Accessory {
    Button {
        text: TextObject,
        url: String,
        action_id: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackBlock {
    Header {
        text: TextObject,
    },
    Section {
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Accessory>,
    },
    Divider,
    Context {
        elements: Vec<TextObject>,
    },
}

impl SlackBlock {
    pub fn header(text: impl Into<String>) -> Self {
        SlackBlock::Header {
            text: TextObject::plain(text),
        }
    }

    pub fn section(text: impl Into<String>) -> Self {
        SlackBlock::Section {
            text: TextObject::mrkdwn(text),
            accessory: None,
        }
    }

    pub fn context(elements: Vec<TextObject>) -> Self {
        SlackBlock::Context { elements }
    }

    /// Characters of visible text carried by the block.
    pub fn text_len(&self) -> usize {
        match self {
            SlackBlock::Header { text } | SlackBlock::Section { text, .. } => text.char_count(),
            SlackBlock::Divider => 0,
            SlackBlock::Context { elements } => elements.iter().map(TextObject::char_count).sum(),
        }
    }
}

/// One Slack message, posted as `{"blocks": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessagePayload {
    pub blocks: Vec<SlackBlock>,
}

impl MessagePayload {
    pub fn new(blocks: Vec<SlackBlock>) -> Self {
        MessagePayload { blocks }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
