//! Packs rendered output into message bodies.
//!
//! Consecutive fragments merge into one Section until the section budget is
//! reached. A body is closed when it runs out of blocks or characters, or when
//! a Header or Divider arrives after the message, counting its title and
//! context blocks, already holds more than `min_blocks_before_break` blocks.
//! A heading is never closed without the section that follows it, even when
//! that section takes the message over `message_text`. Segments always get
//! bodies of their own.
//!
//! Each body leaves room for the blocks the formatter puts in front of it: a
//! title Header and Context in the first message, a Context afterwards.

use crate::block::SlackBlock;
use crate::config::Limits;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::guard::{self, char_len};
use crate::translator::{separator, Fragment, Rendered};
use log::debug;

pub const FIRST_MESSAGE_RESERVED: usize = 2;
pub const CONTINUATION_RESERVED: usize = 1;

pub fn pack<I>(rendered: I, limits: &Limits, diagnostics: &mut Diagnostics) -> Vec<Vec<SlackBlock>>
where
    I: IntoIterator<Item = Rendered>,
{
    let mut packer = Packer::new(limits);
    for item in rendered {
        match item {
            Rendered::Block(block @ SlackBlock::Header { .. }) => packer.push_header(block),
            Rendered::Block(SlackBlock::Divider) => packer.push_divider(),
            Rendered::Block(block) => {
                packer.flush();
                packer.push_block(block);
            }
            Rendered::Fragment(fragment) => packer.push_fragment(fragment, diagnostics),
            Rendered::Segment(text) => packer.push_segment(text, diagnostics),
        }
    }
    packer.finish()
}

struct Packer<'a> {
    limits: &'a Limits,
    done: Vec<Vec<SlackBlock>>,
    body: Vec<SlackBlock>,
    body_chars: usize,
    // text of the Section being built
    text: String,
    tight: bool,
}

impl<'a> Packer<'a> {
    fn new(limits: &'a Limits) -> Self {
        Packer {
            limits,
            done: vec![],
            body: vec![],
            body_chars: 0,
            text: String::new(),
            tight: false,
        }
    }

    // blocks the formatter puts in front of this body
    fn reserved(&self) -> usize {
        if self.done.is_empty() {
            FIRST_MESSAGE_RESERVED
        } else {
            CONTINUATION_RESERVED
        }
    }

    fn capacity(&self) -> usize {
        self.limits
            .blocks_per_message
            .saturating_sub(self.reserved())
            .max(1)
    }

    fn at_break(&self) -> bool {
        self.body.len() + self.reserved() > self.limits.min_blocks_before_break
    }

    // Only headings so far: closing now would send them without their content.
    fn only_headings(&self) -> bool {
        self.body
            .iter()
            .all(|block| matches!(block, SlackBlock::Header { .. }))
    }

    fn push_fragment(&mut self, fragment: Fragment, diagnostics: &mut Diagnostics) {
        let pieces = guard::split(&fragment.text, self.limits.section_text);
        if pieces.len() > 1 {
            diagnostics.report(Diagnostic::OverflowSplit {
                construct: "section",
                pieces: pieces.len(),
            });
        }
        for piece in pieces {
            self.push_piece(piece, fragment.tight);
        }
    }

    fn push_piece(&mut self, piece: String, tight: bool) {
        if piece.trim().is_empty() {
            return;
        }
        let piece_len = char_len(&piece);
        if !self.text.is_empty() {
            let joint = separator(self.tight, tight);
            let merged_len = char_len(&self.text) + joint.len() + piece_len;
            if merged_len <= self.limits.section_text
                && self.body_chars + merged_len <= self.limits.message_text
            {
                self.text.push_str(joint);
                self.text.push_str(&piece);
                self.tight = tight;
                return;
            }
            self.flush();
        }
        if self.body_chars + piece_len > self.limits.message_text && !self.only_headings() {
            self.close();
        }
        self.text = piece;
        self.tight = tight;
    }

    fn flush(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        self.tight = false;
        self.push_block(SlackBlock::section(text));
    }

    fn push_block(&mut self, block: SlackBlock) {
        let over_budget = self.body_chars + block.text_len() > self.limits.message_text;
        if self.body.len() >= self.capacity() || (over_budget && !self.only_headings()) {
            self.close();
        }
        self.body_chars += block.text_len();
        self.body.push(block);
    }

    fn push_header(&mut self, header: SlackBlock) {
        self.flush();
        if self.at_break() {
            self.close();
        }
        self.push_block(header);
    }

    // A rule that would open or end a message is replaced by the message break.
    fn push_divider(&mut self) {
        self.flush();
        if self.at_break() || self.body.len() >= self.capacity() {
            self.close();
            return;
        }
        if matches!(self.body.last(), None | Some(SlackBlock::Divider)) {
            return;
        }
        self.push_block(SlackBlock::Divider);
    }

    fn push_segment(&mut self, text: String, diagnostics: &mut Diagnostics) {
        self.flush();
        self.close();
        self.push_fragment(Fragment::new(text), diagnostics);
        self.flush();
        self.close();
    }

    fn close(&mut self) {
        while matches!(self.body.last(), Some(SlackBlock::Divider)) {
            self.body.pop();
        }
        if self.body.is_empty() {
            return;
        }
        // a heading moves on with the content it introduces
        let carried = match self.body.last() {
            Some(SlackBlock::Header { .. }) if self.body.len() > 1 => self.body.pop(),
            _ => None,
        };
        debug!(
            "closing message {} with {} blocks",
            self.done.len() + 1,
            self.body.len()
        );
        self.done.push(std::mem::take(&mut self.body));
        self.body_chars = 0;
        if let Some(header) = carried {
            self.body_chars = header.text_len();
            self.body.push(header);
        }
    }

    fn finish(mut self) -> Vec<Vec<SlackBlock>> {
        self.flush();
        while matches!(self.body.last(), Some(SlackBlock::Divider)) {
            self.body.pop();
        }
        if !self.body.is_empty() {
            self.done.push(self.body);
        }
        self.done
    }
}
