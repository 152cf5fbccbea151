//! Keeps mrkdwn text within Slack's character limits.
//!
//! Slack rejects over-long text objects outright, so oversized fragments are
//! split at the last safe boundary inside the budget: a blank line, a line
//! break, a sentence end, a space, and only then a hard cut. A cut never lands
//! inside a `<url|label>` link, an inline code span, a code fence or an HTML
//! entity unless that span alone is larger than the budget.

use std::ops::Range;

const ELLIPSIS: char = '…';

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits `text` into pieces of at most `budget` characters each.
///
/// Text that already fits comes back unchanged as a single piece. Only
/// whitespace at the cut points is dropped.
pub fn split(text: &str, budget: usize) -> Vec<String> {
    let budget = budget.max(1);
    if char_len(text) <= budget {
        return vec![text.to_string()];
    }
    let spans = protected_spans(text);
    let mut pieces = vec![];
    let mut start = 0;
    while start < text.len() {
        let rest = &text[start..];
        if char_len(rest) <= budget {
            pieces.push(rest.to_string());
            break;
        }
        let window_end = start + byte_index_of_char(rest, budget);
        let cut = find_cut(text, start, window_end, &spans);
        let piece = text[start..cut].trim_end();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        start = cut + (text[cut..].len() - text[cut..].trim_start_matches('\n').len());
    }
    pieces
}

/// Shortens `text` to `budget` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, budget: usize) -> String {
    if char_len(text) <= budget {
        return text.to_string();
    }
    let keep = budget.saturating_sub(1);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.truncate(truncated.trim_end().len());
    truncated.push(ELLIPSIS);
    truncated
}

fn byte_index_of_char(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map_or(text.len(), |(idx, _)| idx)
}

fn is_safe(cut: usize, spans: &[Range<usize>]) -> bool {
    !spans.iter().any(|span| span.start < cut && cut < span.end)
}

fn find_cut(text: &str, start: usize, end: usize, spans: &[Range<usize>]) -> usize {
    let window = &text[start..end];
    let last_safe = |pattern: &str, after: usize| {
        window
            .rmatch_indices(pattern)
            .map(|(idx, _)| start + idx + after)
            .find(|&cut| cut > start && is_safe(cut, spans))
    };
    let sentence_end = || {
        [". ", "! ", "? "]
            .iter()
            .filter_map(|pattern| last_safe(*pattern, 2))
            .max()
    };
    if let Some(cut) = last_safe("\n\n", 0)
        .or_else(|| last_safe("\n", 0))
        .or_else(sentence_end)
        .or_else(|| last_safe(" ", 1))
    {
        return cut;
    }
    match spans.iter().find(|span| span.start < end && end < span.end) {
        Some(span) if span.start > start => span.start,
        _ => end,
    }
}

// Byte ranges that must stay in one piece.
fn protected_spans(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = vec![];
    let mut i = 0;
    while i < bytes.len() {
        let end = match bytes[i] {
            b'`' if text[i..].starts_with("```") => Some(
                text[i + 3..]
                    .find("```")
                    .map_or(text.len(), |idx| i + 3 + idx + 3),
            ),
            b'`' => closing_on_line(text, i, '`'),
            b'<' => closing_on_line(text, i, '>'),
            b'&' => entity_end(text, i),
            _ => None,
        };
        match end {
            Some(end) => {
                spans.push(i..end);
                i = end;
            }
            None => i += 1,
        }
    }
    spans
}

fn closing_on_line(text: &str, open: usize, close: char) -> Option<usize> {
    let rest = &text[open + 1..];
    let line = rest.find('\n').map_or(rest, |idx| &rest[..idx]);
    line.find(close).map(|idx| open + 1 + idx + 1)
}

fn entity_end(text: &str, open: usize) -> Option<usize> {
    let rest = &text[open + 1..];
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '#'))
        .unwrap_or(rest.len());
    if name_len > 0 && name_len <= 8 && rest[name_len..].starts_with(';') {
        Some(open + 1 + name_len + 1)
    } else {
        None
    }
}
