//! Renders parsed Markdown nodes as Slack blocks and mrkdwn fragments.
//!
//! mrkdwn cheatsheet:
//! - Bold: `*text*`
//! - Italic: `_text_`
//! - Strike: `~text~`
//! - Code: `` `text` `` and `` ```text``` ``
//! - Link: `<url|text>`
//!
//! `&`, `<` and `>` must be sent as HTML entities.
//! See <https://api.slack.com/reference/surfaces/formatting>.

use crate::block::SlackBlock;
use crate::config::Limits;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::entity::{Alignment, ListItem, ListMarker, Markdown, MarkdownInline, MarkdownText, Table};
use crate::guard::{self, char_len};
use crate::parser::parse_markdown_text;

const BULLET: &str = "•";
const CHECKED: &str = "☑";
const UNCHECKED: &str = "☐";
const INDENT: &str = "    ";
const FENCE: &str = "```";
const QUOTE: &str = "&gt;";
const QUOTED_RULE: &str = "───";
const COLUMN_GAP: &str = " | ";
const RECORD_GAP: &str = " · ";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendered {
    Block(SlackBlock),
    Fragment(Fragment),
    /// Content too wide to share a message; it gets messages of its own.
    Segment(String),
}

/// mrkdwn text waiting to be packed into a Section block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    /// Joins a preceding tight fragment with a line break instead of a blank line.
    pub tight: bool,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Fragment {
            text: text.into(),
            tight: false,
        }
    }

    pub fn tight(text: impl Into<String>) -> Self {
        Fragment {
            text: text.into(),
            tight: true,
        }
    }
}

pub fn separator(previous_tight: bool, next_tight: bool) -> &'static str {
    if previous_tight && next_tight {
        "\n"
    } else {
        "\n\n"
    }
}

pub fn translate(node: &Markdown, limits: &Limits, diagnostics: &mut Diagnostics) -> Vec<Rendered> {
    match node {
        Markdown::Heading(level, text) => translate_heading(*level, text, limits, diagnostics),
        Markdown::Paragraph(text) => fragment(translate_text(text)),
        Markdown::UnorderedList(items) | Markdown::OrderedList(items) => {
            fragment(translate_list(items))
        }
        Markdown::TaskListItem(checked, text) => vec![Rendered::Fragment(Fragment::tight(
            format!("{} {}", task_marker(*checked), translate_text(text)),
        ))],
        Markdown::Table(table) => translate_table(table, limits, diagnostics),
        Markdown::Codeblock(_, code) => translate_codeblock(code, limits, diagnostics),
        Markdown::HorizontalRule => vec![Rendered::Block(SlackBlock::Divider)],
        Markdown::Blockquote(children) => translate_blockquote(children, limits, diagnostics),
        Markdown::Html(html) => translate_html(html, diagnostics),
    }
}

fn fragment(text: String) -> Vec<Rendered> {
    if text.trim().is_empty() {
        vec![]
    } else {
        vec![Rendered::Fragment(Fragment::new(text))]
    }
}

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn translate_text(text: &MarkdownText) -> String {
    text.iter().map(translate_inline).collect()
}

fn translate_inline(inline: &MarkdownInline) -> String {
    match inline {
        MarkdownInline::Plaintext(text) => escape(text),
        MarkdownInline::Bold(text) => format!("*{}*", translate_text(&parse_markdown_text(text))),
        MarkdownInline::Italic(text) => {
            format!("_{}_", translate_text(&parse_markdown_text(text)))
        }
        MarkdownInline::Strike(text) => {
            format!("~{}~", translate_text(&parse_markdown_text(text)))
        }
        MarkdownInline::InlineCode(code) => format!("`{}`", escape(code)),
        MarkdownInline::Link(text, url) => translate_link(&plain_text(&parse_markdown_text(text)), url),
        MarkdownInline::Image(alt, url) => {
            translate_link(if alt.is_empty() { "image" } else { alt }, url)
        }
        MarkdownInline::LineBreak => String::from("\n"),
    }
}

fn translate_link(label: &str, url: &str) -> String {
    let label = label.trim();
    if url.is_empty() {
        escape(label)
    } else if label.is_empty() {
        format!("<{}>", escape(url))
    } else {
        format!("<{}|{}>", escape(url), escape(label))
    }
}

/// Text with every bit of formatting removed, for plain_text objects and code blocks.
pub fn plain_text(text: &MarkdownText) -> String {
    text.iter()
        .map(|inline| match inline {
            MarkdownInline::Plaintext(text) | MarkdownInline::InlineCode(text) => text.clone(),
            MarkdownInline::Bold(text)
            | MarkdownInline::Italic(text)
            | MarkdownInline::Strike(text)
            | MarkdownInline::Link(text, _) => plain_text(&parse_markdown_text(text)),
            MarkdownInline::Image(alt, _) => alt.clone(),
            MarkdownInline::LineBreak => String::from(" "),
        })
        .collect()
}

fn translate_heading(
    level: usize,
    text: &MarkdownText,
    limits: &Limits,
    diagnostics: &mut Diagnostics,
) -> Vec<Rendered> {
    let plain = plain_text(text).trim().to_string();
    if plain.is_empty() {
        return vec![];
    }
    // plain_text headers cannot hold a link target
    let linked = text
        .iter()
        .any(|inline| matches!(inline, MarkdownInline::Link(..) | MarkdownInline::Image(..)));
    if level <= 2 && !linked {
        if char_len(&plain) <= limits.header_text {
            return vec![Rendered::Block(SlackBlock::header(plain))];
        }
        diagnostics.report(Diagnostic::ParseDegraded {
            construct: "heading",
            detail: format!("longer than {} characters, sent as bold text", limits.header_text),
        });
    }
    // already bold, so inner bold spans are flattened
    let flattened: MarkdownText = text
        .iter()
        .flat_map(|inline| match inline {
            MarkdownInline::Bold(inner) => parse_markdown_text(inner),
            MarkdownInline::LineBreak => vec![MarkdownInline::Plaintext(String::from(" "))],
            other => vec![other.clone()],
        })
        .collect();
    fragment(format!("*{}*", translate_text(&flattened).trim()))
}

fn task_marker(checked: bool) -> &'static str {
    if checked {
        CHECKED
    } else {
        UNCHECKED
    }
}

fn translate_list(items: &[ListItem]) -> String {
    // running number per depth; None once a bullet interrupts the sequence
    let mut counters: Vec<Option<u64>> = vec![];
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        counters.truncate(item.depth + 1);
        counters.resize(item.depth + 1, None);
        let marker = match item.marker {
            ListMarker::Bullet => {
                counters[item.depth] = None;
                String::from(BULLET)
            }
            ListMarker::Task(checked) => {
                counters[item.depth] = None;
                String::from(task_marker(checked))
            }
            ListMarker::Ordered(start) => {
                let number = counters[item.depth].map_or(start, |prev| prev + 1);
                counters[item.depth] = Some(number);
                format!("{}.", number)
            }
        };
        let indent = INDENT.repeat(item.depth);
        let continuation = format!("\n{}  ", indent);
        let body = translate_text(&item.text).replace('\n', &continuation);
        lines.push(format!("{}{} {}", indent, marker, body).trim_end().to_string());
    }
    lines.join("\n")
}

fn fenced(lines: &[String]) -> String {
    format!("{}\n{}\n{}", FENCE, lines.join("\n"), FENCE)
}

// room left for code inside a fenced section
fn fenced_budget(limits: &Limits) -> usize {
    limits.section_text.saturating_sub(2 * FENCE.len() + 2).max(1)
}

fn cell_text(cell: &MarkdownText) -> String {
    plain_text(cell).replace('\n', " ").trim().to_string()
}

fn pad(text: &str, width: usize, alignment: Alignment) -> String {
    let fill = width.saturating_sub(char_len(text));
    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(fill)),
        Alignment::Right => format!("{}{}", " ".repeat(fill), text),
        Alignment::Center => format!(
            "{}{}{}",
            " ".repeat(fill / 2),
            text,
            " ".repeat(fill - fill / 2)
        ),
    }
}

fn table_line(cells: &[String], widths: &[usize], alignments: &[Alignment]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .zip(alignments)
        .map(|((cell, width), alignment)| pad(cell, *width, *alignment))
        .collect();
    escape(padded.join(COLUMN_GAP).trim_end())
}

fn translate_table(table: &Table, limits: &Limits, diagnostics: &mut Diagnostics) -> Vec<Rendered> {
    let header: Vec<String> = table.header.iter().map(cell_text).collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    let widths: Vec<usize> = (0..header.len())
        .map(|column| {
            rows.iter()
                .map(|row| char_len(&row[column]))
                .fold(char_len(&header[column]), usize::max)
                .max(1)
        })
        .collect();
    let rule = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join("-+-");
    let head = vec![table_line(&header, &widths, &table.alignments), rule];
    let lines: Vec<String> = rows
        .iter()
        .map(|row| table_line(row, &widths, &table.alignments))
        .collect();

    let budget = fenced_budget(limits);
    let head_len = head.iter().map(|line| char_len(line) + 1).sum::<usize>();
    let widest = lines.iter().map(|line| char_len(line) + 1).max().unwrap_or(0);
    if head_len + widest > budget {
        diagnostics.report(Diagnostic::ParseDegraded {
            construct: "table",
            detail: String::from("too wide for a code block, sent as records"),
        });
        return vec![Rendered::Segment(table_records(table))];
    }

    let mut chunks = vec![];
    let mut chunk = head.clone();
    let mut chunk_len = head_len;
    for line in lines {
        let line_len = char_len(&line) + 1;
        if chunk_len + line_len > budget {
            chunks.push(fenced(&chunk));
            chunk = head.clone();
            chunk_len = head_len;
        }
        chunk_len += line_len;
        chunk.push(line);
    }
    chunks.push(fenced(&chunk));
    if chunks.len() > 1 {
        diagnostics.report(Diagnostic::OverflowSplit {
            construct: "table",
            pieces: chunks.len(),
        });
    }
    chunks
        .into_iter()
        .map(|chunk| Rendered::Fragment(Fragment::new(chunk)))
        .collect()
}

// One `*Header:* value · ...` line per row, keeping links and formatting.
fn table_records(table: &Table) -> String {
    let labels: Vec<String> = table.header.iter().map(translate_text).collect();
    if table.rows.is_empty() {
        return labels.join(RECORD_GAP);
    }
    table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&labels)
                .map(|(cell, label)| {
                    let value = translate_text(cell);
                    if label.trim().is_empty() {
                        value
                    } else {
                        format!("*{}:* {}", label.trim(), value)
                    }
                })
                .collect::<Vec<_>>()
                .join(RECORD_GAP)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn translate_codeblock(code: &str, limits: &Limits, diagnostics: &mut Diagnostics) -> Vec<Rendered> {
    let code = code.trim_end_matches('\n');
    if code.trim().is_empty() {
        return vec![];
    }
    let budget = fenced_budget(limits);
    let mut chunks = vec![];
    let mut chunk: Vec<String> = vec![];
    let mut chunk_len = 0;
    for line in code.lines() {
        for piece in guard::split(&escape(line), budget) {
            let piece_len = char_len(&piece) + 1;
            if !chunk.is_empty() && chunk_len + piece_len > budget {
                chunks.push(fenced(&chunk));
                chunk.clear();
                chunk_len = 0;
            }
            chunk_len += piece_len;
            chunk.push(piece);
        }
    }
    chunks.push(fenced(&chunk));
    if chunks.len() > 1 {
        diagnostics.report(Diagnostic::OverflowSplit {
            construct: "code block",
            pieces: chunks.len(),
        });
    }
    chunks
        .into_iter()
        .map(|chunk| Rendered::Fragment(Fragment::new(chunk)))
        .collect()
}

fn translate_blockquote(
    children: &[Markdown],
    limits: &Limits,
    diagnostics: &mut Diagnostics,
) -> Vec<Rendered> {
    let mut body = String::new();
    let mut previous_tight = false;
    for child in children {
        for rendered in translate(child, limits, diagnostics) {
            let (text, tight) = match rendered {
                Rendered::Block(SlackBlock::Header { text }) => {
                    (format!("*{}*", escape(text.text())), false)
                }
                Rendered::Block(SlackBlock::Divider) => (String::from(QUOTED_RULE), false),
                Rendered::Block(_) => continue,
                Rendered::Fragment(fragment) => (fragment.text, fragment.tight),
                Rendered::Segment(text) => (text, false),
            };
            if !body.is_empty() {
                body.push_str(separator(previous_tight, tight));
            }
            body.push_str(&text);
            previous_tight = tight;
        }
    }
    let quoted: Vec<String> = body
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::from(QUOTE)
            } else {
                format!("{} {}", QUOTE, line)
            }
        })
        .collect();
    fragment(quoted.join("\n"))
}

fn translate_html(html: &str, diagnostics: &mut Diagnostics) -> Vec<Rendered> {
    let summary = guard::truncate(html.lines().next().unwrap_or(""), 80);
    if html.trim_start().starts_with("<!--") {
        diagnostics.report(Diagnostic::UnsupportedConstruct {
            construct: "html comment",
            text: summary,
        });
        return vec![];
    }
    diagnostics.report(Diagnostic::UnsupportedConstruct {
        construct: "html",
        text: summary,
    });
    fragment(escape(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_markdown;

    fn render_with(markdown: &str, limits: &Limits) -> (Vec<Rendered>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let rendered = parse_markdown(markdown, limits.max_depth)
            .flat_map(|node| translate(&node, limits, &mut diagnostics))
            .collect();
        (rendered, diagnostics)
    }

    fn render(markdown: &str) -> Vec<Rendered> {
        render_with(markdown, &Limits::default()).0
    }

    fn texts(rendered: &[Rendered]) -> Vec<&str> {
        rendered
            .iter()
            .filter_map(|r| match r {
                Rendered::Fragment(fragment) => Some(fragment.text.as_str()),
                Rendered::Segment(text) => Some(text.as_str()),
                Rendered::Block(_) => None,
            })
            .collect()
    }

    macro_rules! assert_convert {
        ($markdown:expr, $mrkdwn:expr) => {
            assert_eq!(texts(&render($markdown)), vec![$mrkdwn]);
        };
    }

    #[test]
    fn test_inline_spans() {
        assert_convert!(
            "**bold** and *it* and ~~gone~~ and `code`\n",
            "*bold* and _it_ and ~gone~ and `code`"
        );
        assert_convert!("[see docs](https://x.io)\n", "<https://x.io|see docs>");
        assert_convert!("![logo](https://x.io/l.png)\n", "<https://x.io/l.png|logo>");
        assert_convert!("<https://x.io>\n", "<https://x.io|https://x.io>");
        assert_convert!("a & b < c > d\n", "a &amp; b &lt; c &gt; d");
        assert_convert!("**bold *with* italic**\n", "*bold _with_ italic*");
    }

    #[test]
    fn test_headings() {
        assert_eq!(
            render("# Release\n## What's Changed\n"),
            vec![
                Rendered::Block(SlackBlock::header("Release")),
                Rendered::Block(SlackBlock::header("What's Changed")),
            ]
        );
        assert_convert!("### Bug fixes\n", "*Bug fixes*");
        assert_convert!("#### **Loud** [link](https://x.io)\n", "*Loud <https://x.io|link>*");
        assert_eq!(render("#\n"), vec![]);
    }

    #[test]
    fn test_linked_heading_keeps_its_link() {
        assert_convert!("## [v1.2](https://x.io/r)\n", "*<https://x.io/r|v1.2>*");
        assert_convert!("# Released [here](https://x.io)\n", "*Released <https://x.io|here>*");
        let (rendered, diagnostics) = render_with("# Plain title\n", &Limits::default());
        assert_eq!(rendered, vec![Rendered::Block(SlackBlock::header("Plain title"))]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_long_heading_becomes_bold_text() {
        let title = "t".repeat(200);
        let (rendered, diagnostics) = render_with(&format!("# {}\n", title), &Limits::default());
        assert_eq!(texts(&rendered), vec![format!("*{}*", title).as_str()]);
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn test_lists() {
        assert_convert!(
            "- one\n  - two\n    - three\n- four\n",
            "• one\n    • two\n        • three\n• four"
        );
        assert_convert!("1. a\n1. b\n   - c\n1. d\n", "1. a\n2. b\n    • c\n3. d");
        assert_convert!("3. a\n4. b\n", "3. a\n4. b");
        assert_convert!("- mixed\n  - [x] Done\n", "• mixed\n    ☑ Done");
    }

    #[test]
    fn test_task_items() {
        let rendered = render("- [x] Done\n- [ ] Todo\n");
        assert_eq!(
            rendered,
            vec![
                Rendered::Fragment(Fragment::tight("☑ Done")),
                Rendered::Fragment(Fragment::tight("☐ Todo")),
            ]
        );
    }

    #[test]
    fn test_table() {
        assert_convert!(
            "| A | B |\n| --- | --- |\n| 1 | 2 |\n",
            "```\nA | B\n--+--\n1 | 2\n```"
        );
        assert_convert!(
            "| Name | Qty |\n| :-: | --: |\n| x | 10 |\n| long | 2 |\n",
            "```\nName | Qty\n-----+----\n x   |  10\nlong |   2\n```"
        );
        assert_convert!("| A | B |\n| --- | --- |\n", "```\nA | B\n--+--\n```");
    }

    #[test]
    fn test_long_table_repeats_header_per_chunk() {
        let mut markdown = String::from("| Key | Value |\n| --- | --- |\n");
        for i in 0..40 {
            markdown.push_str(&format!("| k{} | value number {} |\n", i, i));
        }
        let limits = Limits {
            section_text: 300,
            ..Limits::default()
        };
        let (rendered, _) = render_with(&markdown, &limits);
        let chunks = texts(&rendered);
        assert!(chunks.len() > 1);
        for chunk in chunks {
            assert!(char_len(chunk) <= 300);
            assert!(chunk.starts_with("```\nKey"));
            assert!(chunk.ends_with("```"));
        }
    }

    #[test]
    fn test_wide_table_becomes_segment() {
        let wide = "w".repeat(120);
        let markdown = format!("| A | B |\n| --- | --- |\n| [x](https://x.io) | {} |\n", wide);
        let limits = Limits {
            section_text: 100,
            ..Limits::default()
        };
        let (rendered, diagnostics) = render_with(&markdown, &limits);
        assert_eq!(
            rendered,
            vec![Rendered::Segment(format!("*A:* <https://x.io|x> · *B:* {}", wide))]
        );
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn test_codeblock_drops_language() {
        assert_convert!("```rust\nfn main() {}\n\nlet x = a < b;\n```\n", "```\nfn main() {}\n\nlet x = a &lt; b;\n```");
    }

    #[test]
    fn test_long_codeblock_is_split_into_fences() {
        let code: String = (0..100).map(|i| format!("line {}\n", i)).collect();
        let limits = Limits {
            section_text: 120,
            ..Limits::default()
        };
        let (rendered, _) = render_with(&format!("```\n{}```\n", code), &limits);
        let chunks = texts(&rendered);
        assert!(chunks.len() > 1);
        for chunk in chunks {
            assert!(char_len(chunk) <= 120);
            assert!(chunk.starts_with("```\n") && chunk.ends_with("\n```"));
        }
    }

    #[test]
    fn test_rule_and_blockquote() {
        assert_eq!(render("---\n"), vec![Rendered::Block(SlackBlock::Divider)]);
        assert_convert!("> quoted\n>\n> - item\n", "&gt; quoted\n&gt;\n&gt; • item");
        assert_convert!("> # Title\n", "&gt; *Title*");
    }

    #[test]
    fn test_html() {
        let (rendered, diagnostics) =
            render_with("<!-- generated -->\n<kbd>Ctrl</kbd>\n", &Limits::default());
        assert_eq!(texts(&rendered), vec!["&lt;kbd&gt;Ctrl&lt;/kbd&gt;"]);
        assert_eq!(diagnostics.iter().count(), 2);
    }
}
