use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::entity::{Alignment, ListItem, ListMarker, Markdown, MarkdownInline, MarkdownText, Table};

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take, take_until, take_while1, take_while_m_n},
    character::complete::{
        alphanumeric1, char, digit1, line_ending, not_line_ending, one_of, satisfy, space0, space1,
    },
    combinator::{all_consuming, eof, map, map_res, not, opt, peek, recognize, verify},
    multi::{many0, many0_count, many1, many1_count, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use std::collections::VecDeque;

const TAB_WIDTH: usize = 4;

/// Lazily parses `input` into block nodes, in document order.
///
/// Lists and quotes nested deeper than `max_depth` levels are flattened.
pub fn parse_markdown(input: &str, max_depth: usize) -> Nodes {
    Nodes::new(input, max_depth)
}

/// Iterator over the block nodes of one document.
///
/// Parsing never fails: anything unrecognized comes out as a paragraph.
/// Degradations are collected and can be drained with [`Nodes::take_diagnostics`].
pub struct Nodes {
    source: String,
    pos: usize,
    depth: usize,
    max_depth: usize,
    pending: VecDeque<Markdown>,
    diagnostics: Diagnostics,
}

enum Parsed {
    Node(Markdown),
    Nodes(Vec<Markdown>),
    Quote(String),
}

impl Nodes {
    pub fn new(input: &str, max_depth: usize) -> Self {
        Nodes::nested(normalize(input), 0, max_depth.max(1))
    }

    fn nested(source: String, depth: usize, max_depth: usize) -> Self {
        Nodes {
            source,
            pos: 0,
            depth,
            max_depth,
            pending: VecDeque::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    fn quote(&mut self, inner: String) -> Markdown {
        if self.depth + 1 >= self.max_depth {
            self.diagnostics.report(Diagnostic::ParseDegraded {
                construct: "blockquote",
                detail: format!("nesting deeper than {} levels kept as text", self.max_depth),
            });
            return Markdown::Blockquote(vec![Markdown::Paragraph(parse_markdown_text(
                inner.trim_end(),
            ))]);
        }
        let mut children = Nodes::nested(inner, self.depth + 1, self.max_depth);
        let nodes: Vec<Markdown> = children.by_ref().collect();
        self.diagnostics.extend(children.take_diagnostics());
        Markdown::Blockquote(nodes)
    }
}

impl Iterator for Nodes {
    type Item = Markdown;

    fn next(&mut self) -> Option<Markdown> {
        loop {
            if let Some(node) = self.pending.pop_front() {
                return Some(node);
            }
            let parsed = {
                let input = skip_blank_lines(&self.source[self.pos..]);
                if input.is_empty() {
                    self.pos = self.source.len();
                    return None;
                }
                let (rest, parsed) = parse_block(input, self.max_depth, &mut self.diagnostics);
                self.pos = self.source.len() - rest.len();
                parsed
            };
            match parsed {
                Parsed::Node(node) => return Some(node),
                Parsed::Nodes(nodes) => self.pending.extend(nodes),
                Parsed::Quote(inner) => return Some(self.quote(inner)),
            }
        }
    }
}

// Unifies line endings, expands leading tabs and guarantees every line ends with '\n'.
fn normalize(input: &str) -> String {
    let unified = input.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len() + 1);
    for line in unified.lines() {
        let mut column = 0;
        let mut body = line;
        for (idx, c) in line.char_indices() {
            match c {
                ' ' => column += 1,
                '\t' => column += TAB_WIDTH - column % TAB_WIDTH,
                _ => {
                    body = &line[idx..];
                    break;
                }
            }
            body = &line[idx + 1..];
        }
        out.extend(std::iter::repeat(' ').take(column));
        out.push_str(body);
        out.push('\n');
    }
    out
}

fn skip_blank_lines(i: &str) -> &str {
    match many0_count(blank_line)(i) {
        Ok((rest, _)) => rest,
        Err(_) => i,
    }
}

fn parse_block<'a>(
    i: &'a str,
    max_depth: usize,
    diagnostics: &mut Diagnostics,
) -> (&'a str, Parsed) {
    if let Ok((rest, (lang, code, closed))) = parse_code_block(i) {
        if !closed {
            diagnostics.report(Diagnostic::ParseDegraded {
                construct: "code block",
                detail: "unterminated fence closed at end of input".into(),
            });
        }
        return (rest, Parsed::Node(Markdown::Codeblock(lang, code)));
    }
    if let Ok((rest, (level, text))) = parse_header(i) {
        return (rest, Parsed::Node(Markdown::Heading(level, text)));
    }
    if let Ok((rest, _)) = parse_horizontal_rule(i) {
        return (rest, Parsed::Node(Markdown::HorizontalRule));
    }
    if let Ok((rest, html)) = parse_html_block(i) {
        return (rest, Parsed::Node(Markdown::Html(html)));
    }
    if let Ok((rest, table)) = parse_table(i) {
        return (rest, Parsed::Node(Markdown::Table(table)));
    }
    if let Ok((rest, inner)) = parse_blockquote(i) {
        return (rest, Parsed::Quote(inner));
    }
    if let Some((rest, items, clamped)) = parse_list(i, max_depth) {
        if clamped {
            diagnostics.report(Diagnostic::ParseDegraded {
                construct: "list",
                detail: format!("nesting deeper than {} levels flattened", max_depth),
            });
        }
        return (rest, list_nodes(items));
    }
    let (rest, node) = parse_paragraph(i);
    (rest, Parsed::Node(node))
}

fn list_nodes(items: Vec<ListItem>) -> Parsed {
    let checklist = items
        .iter()
        .all(|item| item.depth == 0 && matches!(item.marker, ListMarker::Task(_)));
    if checklist {
        return Parsed::Nodes(
            items
                .into_iter()
                .filter_map(|item| match item.marker {
                    ListMarker::Task(checked) => Some(Markdown::TaskListItem(checked, item.text)),
                    _ => None,
                })
                .collect(),
        );
    }
    match items.first().map(|item| item.marker) {
        Some(ListMarker::Ordered(_)) => Parsed::Node(Markdown::OrderedList(items)),
        _ => Parsed::Node(Markdown::UnorderedList(items)),
    }
}

fn blank_line(i: &str) -> IResult<&str, &str> {
    terminated(space0, line_ending)(i)
}

fn any_line(i: &str) -> IResult<&str, &str> {
    terminated(not_line_ending, line_ending)(i)
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn up_to_three_spaces(i: &str) -> IResult<&str, &str> {
    take_while_m_n(0, 3, |c| c == ' ')(i)
}

// this guy matches the literal character #
fn parse_header_tag(i: &str) -> IResult<&str, usize> {
    map(
        terminated(
            verify(take_while1(|c| c == '#'), |s: &str| s.len() <= 6),
            alt((space1, peek(line_ending))),
        ),
        |s: &str| s.len(),
    )(i)
}

// this combines a tuple of the header tag and the rest of the line
fn parse_header(i: &str) -> IResult<&str, (usize, MarkdownText)> {
    let (i, _) = up_to_three_spaces(i)?;
    let (i, level) = parse_header_tag(i)?;
    let (i, text) = any_line(i)?;
    Ok((i, (level, parse_markdown_text(strip_closing_hashes(text)))))
}

fn strip_closing_hashes(text: &str) -> &str {
    let text = text.trim();
    let stripped = text.trim_end_matches('#');
    if stripped.is_empty() {
        stripped
    } else if stripped.ends_with(' ') {
        stripped.trim_end()
    } else {
        text
    }
}

fn parse_setext_underline(i: &str) -> IResult<&str, usize> {
    let (i, _) = up_to_three_spaces(i)?;
    let (i, level) = alt((
        map(take_while1(|c| c == '='), |_| 1),
        map(take_while1(|c| c == '-'), |_| 2),
    ))(i)?;
    let (i, _) = pair(space0, line_ending)(i)?;
    Ok((i, level))
}

fn rule_of<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    recognize(verify(many1_count(terminated(char(c), space0)), |n: &usize| {
        *n >= 3
    }))
}

fn parse_horizontal_rule(i: &str) -> IResult<&str, &str> {
    terminated(
        preceded(
            up_to_three_spaces,
            alt((rule_of('-'), rule_of('*'), rule_of('_'))),
        ),
        line_ending,
    )(i)
}

fn parse_fence_open(i: &str) -> IResult<&str, (usize, &str, &str)> {
    let (i, indent) = map(up_to_three_spaces, |s: &str| s.len())(i)?;
    let (i, fence) = alt((
        verify(take_while1(|c| c == '`'), |s: &str| s.len() >= 3),
        verify(take_while1(|c| c == '~'), |s: &str| s.len() >= 3),
    ))(i)?;
    let (i, info) = verify(any_line, |s: &str| !(fence.starts_with('`') && s.contains('`')))(i)?;
    let lang = info.split_whitespace().next().unwrap_or("");
    Ok((i, (indent, fence, lang)))
}

fn is_fence_close(line: &str, fence: &str) -> bool {
    let marker = fence.chars().next().unwrap_or('`');
    let close: IResult<&str, _> = tuple((
        up_to_three_spaces,
        verify(take_while1(|c| c == marker), |s: &str| s.len() >= fence.len()),
        space0,
        eof,
    ))(line);
    close.is_ok()
}

/// Returns `(language, code, closed)`; an unterminated fence runs to end of input.
fn parse_code_block(i: &str) -> IResult<&str, (String, String, bool)> {
    let (mut rest, (indent, fence, lang)) = parse_fence_open(i)?;
    let mut code = String::new();
    while let Ok((next, line)) = any_line(rest) {
        rest = next;
        if is_fence_close(line, fence) {
            return Ok((rest, (lang.to_string(), code, true)));
        }
        let strip = indent_of(line).min(indent);
        code.push_str(&line[strip..]);
        code.push('\n');
    }
    Ok((rest, (lang.to_string(), code, false)))
}

fn parse_html_start(i: &str) -> IResult<&str, bool> {
    let (i, _) = up_to_three_spaces(i)?;
    let (i, _) = not(parse_autolink)(i)?;
    let (i, _) = char('<')(i)?;
    alt((
        map(tag("!--"), |_| true),
        map(tag("/"), |_| false),
        map(tag("!"), |_| false),
        map(satisfy(|c| c.is_ascii_alphabetic()), |_| false),
    ))(i)
}

/// A comment runs to its `-->`; any other HTML block runs to the next blank line.
fn parse_html_block(i: &str) -> IResult<&str, String> {
    let (_, comment) = parse_html_start(i)?;
    let mut lines = vec![];
    let mut rest = i;
    while let Ok((next, line)) = any_line(rest) {
        if !comment && line.trim().is_empty() {
            break;
        }
        lines.push(line);
        rest = next;
        if comment && line.contains("-->") {
            break;
        }
    }
    Ok((rest, lines.join("\n")))
}

fn parse_alignment(i: &str) -> IResult<&str, Alignment> {
    map(
        delimited(
            space0,
            tuple((opt(char(':')), take_while1(|c| c == '-'), opt(char(':')))),
            space0,
        ),
        |(left, _, right)| match (left.is_some(), right.is_some()) {
            (true, true) => Alignment::Center,
            (false, true) => Alignment::Right,
            _ => Alignment::Left,
        },
    )(i)
}

fn parse_table_separator(i: &str) -> IResult<&str, Vec<Alignment>> {
    let (i, line) = verify(any_line, |s: &str| s.contains('|') && s.contains('-'))(i)?;
    let (_, alignments) = all_consuming(delimited(
        pair(space0, opt(char('|'))),
        separated_list1(char('|'), parse_alignment),
        pair(opt(char('|')), space0),
    ))(line)?;
    Ok((i, alignments))
}

// Splits on unescaped pipes outside of code spans.
fn split_row(line: &str) -> Vec<MarkdownText> {
    let line = line.trim();
    let line = line.strip_prefix('|').unwrap_or(line);
    let line = match line.strip_suffix('|') {
        Some(stripped) if !stripped.ends_with('\\') => stripped,
        _ => line,
    };
    let mut cells = vec![];
    let mut cell = String::new();
    let mut in_code = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '`' => {
                in_code = !in_code;
                cell.push(c);
            }
            '|' if !in_code => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells
        .iter()
        .map(|cell| parse_markdown_text(cell.trim()))
        .collect()
}

fn parse_table(i: &str) -> IResult<&str, Table> {
    let (i, header_line) = verify(any_line, |s: &str| s.contains('|'))(i)?;
    let (i, mut alignments) = parse_table_separator(i)?;
    let mut header = split_row(header_line);
    if header.len() != alignments.len() {
        return Err(nom::Err::Error(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Verify,
        )));
    }
    let mut rows = vec![];
    let mut rest = i;
    while let Ok((next, line)) = any_line(rest) {
        if line.trim().is_empty() || !line.contains('|') {
            break;
        }
        rows.push(split_row(line));
        rest = next;
    }
    let columns = rows.iter().map(Vec::len).fold(header.len(), usize::max);
    alignments.resize(columns, Alignment::Left);
    header.resize(columns, vec![]);
    for row in rows.iter_mut() {
        row.resize(columns, vec![]);
    }
    Ok((
        rest,
        Table {
            alignments,
            header,
            rows,
        },
    ))
}

fn parse_quote_line(i: &str) -> IResult<&str, &str> {
    preceded(
        tuple((up_to_three_spaces, char('>'), opt(char(' ')))),
        any_line,
    )(i)
}

fn parse_blockquote(i: &str) -> IResult<&str, String> {
    map(many1(parse_quote_line), |lines| {
        let mut inner = lines.join("\n");
        inner.push('\n');
        inner
    })(i)
}

fn parse_unordered_list_tag(i: &str) -> IResult<&str, char> {
    terminated(one_of("-*+"), space1)(i)
}

fn parse_ordered_list_tag(i: &str) -> IResult<&str, u64> {
    terminated(
        terminated(
            map_res(verify(digit1, |s: &str| s.len() <= 9), |s: &str| {
                s.parse::<u64>()
            }),
            one_of(".)"),
        ),
        space1,
    )(i)
}

fn parse_task_tag(i: &str) -> IResult<&str, bool> {
    terminated(
        alt((
            map(tag("[ ]"), |_| false),
            map(alt((tag("[x]"), tag("[X]"))), |_| true),
        )),
        alt((space1, peek(line_ending))),
    )(i)
}

fn parse_list_marker(i: &str) -> IResult<&str, ListMarker> {
    alt((
        map(preceded(parse_unordered_list_tag, parse_task_tag), ListMarker::Task),
        map(parse_unordered_list_tag, |_| ListMarker::Bullet),
        map(parse_ordered_list_tag, ListMarker::Ordered),
    ))(i)
}

fn parse_list_element(i: &str) -> IResult<&str, (usize, ListMarker, &str)> {
    let (i, indent) = map(space0, |s: &str| s.len())(i)?;
    let (i, marker) = parse_list_marker(i)?;
    let (i, text) = any_line(i)?;
    Ok((i, (indent, marker, text)))
}

fn is_ordered(marker: ListMarker) -> bool {
    matches!(marker, ListMarker::Ordered(_))
}

/// Collects one run of list lines. Depth follows indentation and is clamped
/// to `max_depth - 1`; the flag reports whether clamping happened.
fn parse_list(i: &str, max_depth: usize) -> Option<(&str, Vec<ListItem>, bool)> {
    let (mut rest, first) = parse_list_element(i).ok()?;
    let ordered = is_ordered(first.1);
    let mut indents: Vec<usize> = vec![];
    let mut items: Vec<ListItem> = vec![];
    let mut clamped = false;
    let mut pending = Some(first);

    loop {
        if let Some((indent, marker, text)) = pending.take() {
            while indents.last().map_or(false, |&top| top > indent) {
                indents.pop();
            }
            if indents.last().map_or(true, |&top| top < indent) {
                indents.push(indent);
            }
            let mut depth = indents.len() - 1;
            if depth >= max_depth {
                depth = max_depth - 1;
                clamped = true;
            }
            items.push(ListItem {
                depth,
                marker,
                text: parse_markdown_text(text.trim()),
            });
        }

        let (after_blank, blanks) = many0_count(blank_line)(rest).unwrap_or((rest, 0));
        if let Ok((next, element)) = parse_list_element(after_blank) {
            let top_level = indents.first().map_or(true, |&base| element.0 <= base);
            if top_level && is_ordered(element.1) != ordered {
                break;
            }
            pending = Some(element);
            rest = next;
            continue;
        }

        // lazy or indented continuation of the previous item
        if blanks == 0 && !interrupts_paragraph(rest) {
            if let Ok((next, line)) = any_line(rest) {
                if !line.trim().is_empty() {
                    if let Some(item) = items.last_mut() {
                        item.text.push(MarkdownInline::LineBreak);
                        item.text.extend(parse_markdown_text(line.trim()));
                    }
                    rest = next;
                    continue;
                }
            }
        }
        break;
    }
    Some((rest, items, clamped))
}

fn interrupts_paragraph(i: &str) -> bool {
    parse_header(i).is_ok()
        || parse_horizontal_rule(i).is_ok()
        || parse_fence_open(i).is_ok()
        || parse_quote_line(i).is_ok()
        || parse_html_start(i).is_ok()
        || parse_list_element(i).is_ok()
        || parse_table(i).is_ok()
}

fn parse_paragraph(i: &str) -> (&str, Markdown) {
    let (mut rest, first) = match any_line(i) {
        Ok(parsed) => parsed,
        Err(_) => return ("", Markdown::Paragraph(parse_markdown_text(i.trim()))),
    };
    let mut lines = vec![first.trim()];
    loop {
        if let Ok((next, level)) = parse_setext_underline(rest) {
            return (next, Markdown::Heading(level, parse_markdown_text(&lines.join("\n"))));
        }
        match any_line(rest) {
            Ok((next, line)) if !line.trim().is_empty() && !interrupts_paragraph(rest) => {
                lines.push(line.trim());
                rest = next;
            }
            _ => break,
        }
    }
    (rest, Markdown::Paragraph(parse_markdown_text(&lines.join("\n"))))
}

/// Parses inline spans. Never fails: stray markers become plain text.
pub fn parse_markdown_text(i: &str) -> MarkdownText {
    match many0(parse_markdown_inline)(i) {
        Ok((_, inlines)) => merge_plaintext(inlines),
        Err(_) => vec![MarkdownInline::Plaintext(i.to_string())],
    }
}

fn merge_plaintext(inlines: Vec<MarkdownInline>) -> MarkdownText {
    let mut merged: MarkdownText = Vec::with_capacity(inlines.len());
    for inline in inlines {
        match (merged.last_mut(), inline) {
            (Some(MarkdownInline::Plaintext(prev)), MarkdownInline::Plaintext(next)) => {
                prev.push_str(&next)
            }
            (_, inline) => merged.push(inline),
        }
    }
    merged
}

fn non_blank(s: &str) -> bool {
    !s.is_empty() && !s.starts_with(char::is_whitespace) && !s.ends_with(char::is_whitespace)
}

fn parse_boldtext(i: &str) -> IResult<&str, &str> {
    alt((
        delimited(tag("**"), verify(take_until("**"), non_blank), tag("**")),
        delimited(tag("__"), verify(take_until("__"), non_blank), tag("__")),
    ))(i)
}

fn parse_italics(i: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('*'), verify(is_not("*\n"), non_blank), char('*')),
        delimited(char('_'), verify(is_not("_\n"), non_blank), char('_')),
    ))(i)
}

fn parse_strike(i: &str) -> IResult<&str, &str> {
    alt((
        delimited(tag("~~"), verify(take_until("~~"), non_blank), tag("~~")),
        delimited(char('~'), verify(is_not("~\n"), non_blank), char('~')),
    ))(i)
}

fn parse_inline_code(i: &str) -> IResult<&str, &str> {
    alt((
        delimited(
            tag("``"),
            map(
                verify(take_until("``"), |s: &str| !s.trim().is_empty()),
                |s: &str| s.trim(),
            ),
            tag("``"),
        ),
        delimited(char('`'), is_not("`"), char('`')),
    ))(i)
}

fn link_destination(s: &str) -> &str {
    let s = s.split_whitespace().next().unwrap_or("");
    s.trim_start_matches('<').trim_end_matches('>')
}

fn parse_link(i: &str) -> IResult<&str, (&str, &str)> {
    pair(
        delimited(char('['), is_not("]\n"), char(']')),
        delimited(char('('), map(is_not(")\n"), link_destination), char(')')),
    )(i)
}

fn parse_image(i: &str) -> IResult<&str, (&str, &str)> {
    preceded(char('!'), parse_link)(i)
}

fn parse_autolink(i: &str) -> IResult<&str, &str> {
    delimited(
        char('<'),
        recognize(pair(
            alt((tag("https://"), tag("http://"), tag("mailto:"))),
            is_not("> \n"),
        )),
        char('>'),
    )(i)
}

// we want to match many things that are not any of our special tags
// intraword underscores (snake_case) are taken whole so they never open italics
fn parse_plaintext(i: &str) -> IResult<&str, String> {
    let word = recognize(pair(
        alphanumeric1,
        many0(pair(many1_count(char('_')), alphanumeric1)),
    ));
    let safe_one_char = preceded(
        not(alt((
            tag("*"),
            tag("_"),
            tag("`"),
            tag("~"),
            tag("["),
            tag("!["),
            tag("<"),
            tag("\\"),
            tag("\n"),
        ))),
        take(1u8),
    );
    let escaped_char = preceded(
        char('\\'),
        recognize(satisfy(|c| c.is_ascii_punctuation())),
    );

    map(many1(alt((word, escaped_char, safe_one_char))), |v| v.join(""))(i)
}

fn parse_markdown_inline(i: &str) -> IResult<&str, MarkdownInline> {
    alt((
        map(parse_boldtext, |s: &str| MarkdownInline::Bold(s.to_string())),
        map(parse_italics, |s: &str| {
            MarkdownInline::Italic(s.to_string())
        }),
        map(parse_strike, |s: &str| {
            MarkdownInline::Strike(s.to_string())
        }),
        map(parse_inline_code, |s: &str| {
            MarkdownInline::InlineCode(s.to_string())
        }),
        map(parse_image, |(alt, url): (&str, &str)| {
            MarkdownInline::Image(alt.to_string(), url.to_string())
        }),
        map(parse_link, |(text, url): (&str, &str)| {
            MarkdownInline::Link(text.to_string(), url.to_string())
        }),
        map(parse_autolink, |url: &str| {
            MarkdownInline::Link(url.to_string(), url.to_string())
        }),
        map(line_ending, |_| MarkdownInline::LineBreak),
        map(parse_plaintext, MarkdownInline::Plaintext),
        map(take(1u8), |s: &str| MarkdownInline::Plaintext(s.to_string())),
    ))(i)
}

#[cfg(test)]
mod tests {
    use crate::config::MAX_NESTING_DEPTH;
    use crate::entity::*;
    use crate::parser::*;
    use nom::error::ErrorKind;

    macro_rules! err {
        ($x:expr, $y:expr) => {
            Err(nom::Err::Error(nom::error::Error::new($x, $y)))
        };
    }

    macro_rules! text {
        ($s:expr) => {
            vec![MarkdownInline::Plaintext(String::from($s))]
        };
    }

    fn parse_all(i: &str) -> Vec<Markdown> {
        parse_markdown(i, MAX_NESTING_DEPTH).collect()
    }

    #[test]
    fn test_parse_italics() {
        assert_eq!(
            parse_italics("*here is italic*"),
            Ok(("", "here is italic"))
        );
        assert_eq!(parse_italics("_here is italic_"), Ok(("", "here is italic")));
        assert!(parse_italics("*here is italic").is_err());
        assert_eq!(
            parse_italics("here is italic*"),
            err!("here is italic*", ErrorKind::Char)
        );
        assert!(parse_italics("* spaced *").is_err());
        assert!(parse_italics("**we are doing bold**").is_err());
        assert!(parse_italics("").is_err());
    }

    #[test]
    fn test_parse_boldtext() {
        assert_eq!(parse_boldtext("**here is bold**"), Ok(("", "here is bold")));
        assert_eq!(parse_boldtext("__here is bold__"), Ok(("", "here is bold")));
        assert_eq!(
            parse_boldtext("**bold with *italic* inside**"),
            Ok(("", "bold with *italic* inside"))
        );
        assert!(parse_boldtext("**here is bold").is_err());
        assert!(parse_boldtext("****").is_err());
        assert!(parse_boldtext("*this is italic*").is_err());
    }

    #[test]
    fn test_parse_inline_code() {
        assert_eq!(parse_inline_code("`here is code`"), Ok(("", "here is code")));
        assert_eq!(parse_inline_code("`` a`b ``"), Ok(("", "a`b")));
        assert!(parse_inline_code("`here is code").is_err());
        assert!(parse_inline_code("``").is_err());
    }

    #[test]
    fn test_parse_link() {
        assert_eq!(
            parse_link("[title](https://www.example.com)"),
            Ok(("", ("title", "https://www.example.com")))
        );
        assert_eq!(
            parse_link("[title](<https://x.io> \"Title\")"),
            Ok(("", ("title", "https://x.io")))
        );
        assert_eq!(
            parse_image("![alt text](image.jpg)"),
            Ok(("", ("alt text", "image.jpg")))
        );
        assert_eq!(
            parse_autolink("<https://x.io/a>"),
            Ok(("", "https://x.io/a"))
        );
        assert!(parse_autolink("<div>").is_err());
    }

    #[test]
    fn test_parse_plaintext() {
        assert_eq!(
            parse_plaintext("oh my gosh!"),
            Ok(("", String::from("oh my gosh!")))
        );
        assert_eq!(
            parse_plaintext("oh my gosh!["),
            Ok(("![", String::from("oh my gosh")))
        );
        assert_eq!(
            parse_plaintext("here is plaintext\n"),
            Ok(("\n", String::from("here is plaintext")))
        );
        assert_eq!(
            parse_plaintext("set max_block_count here"),
            Ok(("", String::from("set max_block_count here")))
        );
        assert_eq!(parse_plaintext("\\*\\[\\]"), Ok(("", String::from("*[]"))));
        assert!(parse_plaintext("").is_err());
    }

    #[test]
    fn test_parse_markdown_text() {
        assert_eq!(parse_markdown_text(""), vec![]);
        assert_eq!(
            parse_markdown_text("here is some plaintext *but what if we italicize?* I guess it doesnt **matter** in my `code`"),
            vec![
                MarkdownInline::Plaintext(String::from("here is some plaintext ")),
                MarkdownInline::Italic(String::from("but what if we italicize?")),
                MarkdownInline::Plaintext(String::from(" I guess it doesnt ")),
                MarkdownInline::Bold(String::from("matter")),
                MarkdownInline::Plaintext(String::from(" in my ")),
                MarkdownInline::InlineCode(String::from("code")),
            ]
        );
        assert_eq!(
            parse_markdown_text("5 * 3 = 15 and [broken link"),
            text!("5 * 3 = 15 and [broken link")
        );
        assert_eq!(
            parse_markdown_text("one\ntwo"),
            vec![
                MarkdownInline::Plaintext(String::from("one")),
                MarkdownInline::LineBreak,
                MarkdownInline::Plaintext(String::from("two")),
            ]
        );
        assert_eq!(
            parse_markdown_text("see [docs](https://x.io) and ~~old~~"),
            vec![
                MarkdownInline::Plaintext(String::from("see ")),
                MarkdownInline::Link(String::from("docs"), String::from("https://x.io")),
                MarkdownInline::Plaintext(String::from(" and ")),
                MarkdownInline::Strike(String::from("old")),
            ]
        );
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header("# h1\n"), Ok(("", (1, text!("h1")))));
        assert_eq!(parse_header("###  h3 ###\n"), Ok(("", (3, text!("h3")))));
        assert_eq!(parse_header("#\n"), Ok(("", (1, vec![]))));
        assert!(parse_header("###h3\n").is_err());
        assert!(parse_header("####### h7\n").is_err());
        assert_eq!(parse_header_tag("### "), Ok(("", 3)));
    }

    #[test]
    fn test_parse_list_tags() {
        assert_eq!(parse_unordered_list_tag("- and some more"), Ok(("and some more", '-')));
        assert!(parse_unordered_list_tag("-and some more").is_err());
        assert_eq!(parse_ordered_list_tag("3. and some more"), Ok(("and some more", 3)));
        assert_eq!(parse_ordered_list_tag("12) x"), Ok(("x", 12)));
        assert!(parse_ordered_list_tag("1.and some more").is_err());
        assert_eq!(
            parse_list_marker("- [x] done"),
            Ok(("done", ListMarker::Task(true)))
        );
        assert_eq!(
            parse_list_marker("- [ ] todo"),
            Ok(("todo", ListMarker::Task(false)))
        );
        assert_eq!(parse_list_marker("* [link](x)"), Ok(("[link](x)", ListMarker::Bullet)));
    }

    #[test]
    fn test_parse_codeblock() {
        assert_eq!(
            parse_code_block("```bash\npip install foobar\n```\n"),
            Ok(("", (String::from("bash"), String::from("pip install foobar\n"), true)))
        );
        assert_eq!(
            parse_code_block("~~~\npip `install` foobar\n~~~\nafter\n"),
            Ok(("after\n", (String::from(""), String::from("pip `install` foobar\n"), true)))
        );
        assert_eq!(
            parse_code_block("```rust\nfn main() {}\n"),
            Ok(("", (String::from("rust"), String::from("fn main() {}\n"), false)))
        );
        assert!(parse_code_block("```inline``` text\n").is_err());
    }

    #[test]
    fn test_parse_horizontal_rule() {
        assert!(parse_horizontal_rule("---\n").is_ok());
        assert!(parse_horizontal_rule("* * *\n").is_ok());
        assert!(parse_horizontal_rule("___  \n").is_ok());
        assert!(parse_horizontal_rule("--\n").is_err());
        assert!(parse_horizontal_rule("- item\n").is_err());
    }

    #[test]
    fn test_parse_table() {
        let (rest, table) = parse_table("| A | B |\n| :-- | --: |\n| 1 | 2 |\n| 3 |\n\nnext\n").unwrap();
        assert_eq!(rest, "\nnext\n");
        assert_eq!(table.alignments, vec![Alignment::Left, Alignment::Right]);
        assert_eq!(table.header, vec![text!("A"), text!("B")]);
        assert_eq!(table.rows, vec![vec![text!("1"), text!("2")], vec![text!("3"), vec![]]]);

        let (_, table) = parse_table("| A | B |\n|---|---|\n").unwrap();
        assert_eq!(table.rows.len(), 0);
        assert_eq!(table.header.len(), 2);

        assert!(parse_table("| A | B |\n|---|\n").is_err());
        assert!(parse_table("a | b\nplain line\n").is_err());
    }

    #[test]
    fn test_split_row_keeps_escaped_and_code_pipes() {
        assert_eq!(
            split_row("| a \\| b | `x|y` |"),
            vec![
                text!("a | b"),
                vec![MarkdownInline::InlineCode(String::from("x|y"))]
            ]
        );
    }

    #[test]
    fn test_parse_nested_list() {
        let nodes = parse_all("- one\n  - two\n    - three\n- four\n");
        let depths: Vec<usize> = match &nodes[..] {
            [Markdown::UnorderedList(items)] => items.iter().map(|item| item.depth).collect(),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(depths, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_deep_list_is_flattened() {
        let mut source = String::new();
        for depth in 0..9 {
            source.push_str(&" ".repeat(depth * 2));
            source.push_str("- item\n");
        }
        let mut nodes = parse_markdown(&source, MAX_NESTING_DEPTH);
        let items = match nodes.next() {
            Some(Markdown::UnorderedList(items)) => items,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(items.len(), 9);
        assert_eq!(items.iter().map(|item| item.depth).max(), Some(MAX_NESTING_DEPTH - 1));
        assert!(!nodes.take_diagnostics().is_empty());
    }

    #[test]
    fn test_marker_change_starts_new_list() {
        let nodes = parse_all("- a\n- b\n1. c\n2. d\n");
        assert_eq!(nodes.len(), 2);
        assert!(matches!(nodes[0], Markdown::UnorderedList(_)));
        assert!(matches!(nodes[1], Markdown::OrderedList(_)));
    }

    #[test]
    fn test_checklist_yields_task_items() {
        assert_eq!(
            parse_all("- [x] Done\n- [ ] Todo\n"),
            vec![
                Markdown::TaskListItem(true, text!("Done")),
                Markdown::TaskListItem(false, text!("Todo")),
            ]
        );
    }

    #[test]
    fn test_parse_blockquote() {
        assert_eq!(
            parse_all("> quoted **text**\n> more\n"),
            vec![Markdown::Blockquote(vec![Markdown::Paragraph(vec![
                MarkdownInline::Plaintext(String::from("quoted ")),
                MarkdownInline::Bold(String::from("text")),
                MarkdownInline::LineBreak,
                MarkdownInline::Plaintext(String::from("more")),
            ])])]
        );
    }

    #[test]
    fn test_setext_and_html() {
        assert_eq!(
            parse_all("Title\n=====\n<!-- generated -->\n<details>\nhidden\n</details>\n"),
            vec![
                Markdown::Heading(1, text!("Title")),
                Markdown::Html(String::from("<!-- generated -->")),
                Markdown::Html(String::from("<details>\nhidden\n</details>")),
            ]
        );
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc\n");
        assert_eq!(normalize("\t- x"), "    - x\n");
    }

    #[test]
    fn test_parse_markdown() {
        assert_eq!(
            parse_all("# Foobar\n\nFoobar is a Python library for dealing with word pluralization.\n\n```bash\n pip install foobar\n```\n## Installation\n\nUse the package manager [pip](https://pip.pypa.io/en/stable/) to install foobar.\n---\n| A | B |\n| --- | --- |\n"),
            vec![
                Markdown::Heading(1, text!("Foobar")),
                Markdown::Paragraph(text!("Foobar is a Python library for dealing with word pluralization.")),
                Markdown::Codeblock(String::from("bash"), String::from(" pip install foobar\n")),
                Markdown::Heading(2, text!("Installation")),
                Markdown::Heading(2, vec![
                    MarkdownInline::Plaintext(String::from("Use the package manager ")),
                    MarkdownInline::Link(String::from("pip"), String::from("https://pip.pypa.io/en/stable/")),
                    MarkdownInline::Plaintext(String::from(" to install foobar.")),
                ]),
                Markdown::Table(Table {
                    alignments: vec![Alignment::Left, Alignment::Left],
                    header: vec![text!("A"), text!("B")],
                    rows: vec![],
                }),
            ]
        )
    }
}
