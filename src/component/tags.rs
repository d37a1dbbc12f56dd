//! Markup tag scanning.
//!
//! A tag name is the maximal run of `[A-Za-z0-9_]` directly after `<`.
//! Closing tags, comments and doctypes start with `/` or `!` and never match.
//!
//! ```text
//! <Foo.Slot a="1">   →  "Foo"
//! <my-card>          →  "my"
//! </Foo>             →  (nothing)
//! ```

use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([A-Za-z0-9_]+)").unwrap());

/// Distinct tag names in `markup`, in order of first appearance.
///
/// Letters of either case match. Spellings are kept apart, so `<nav>` and
/// `<Nav>` are two tags.
pub fn scan_tags(markup: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    TAG_RE
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| seen.insert(*name))
        .map(str::to_owned)
        .collect()
}

const fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

// ============================================================================
// Opening tag parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    /// `None` for bare attributes such as `<input disabled>`.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag {
    pub name: String,
    pub attrs: Vec<Attr>,
    pub self_closing: bool,
    /// Byte offset just past the closing `>`.
    pub end: usize,
}

/// Parse the opening tag starting at `markup[start] == '<'`.
///
/// Returns `None` when the text at `start` is not a well-formed opening tag
/// (closing tag, comment, stray `<`, or an unterminated tag).
pub fn parse_open_tag(markup: &str, start: usize) -> Option<OpenTag> {
    let bytes = markup.as_bytes();
    if bytes.get(start) != Some(&b'<') {
        return None;
    }

    let name_start = start + 1;
    let mut pos = name_start;
    // Tag names may carry `-`, `:` and `.` after the first identifier char.
    while pos < bytes.len() && (is_name_char(bytes[pos]) || matches!(bytes[pos], b'-' | b':' | b'.')) {
        pos += 1;
    }
    if pos == name_start || !is_name_char(bytes[name_start]) {
        return None;
    }
    let name = markup[name_start..pos].to_owned();

    let mut attrs = Vec::new();
    loop {
        pos = skip_whitespace(bytes, pos);
        match bytes.get(pos)? {
            b'>' => {
                return Some(OpenTag {
                    name,
                    attrs,
                    self_closing: false,
                    end: pos + 1,
                });
            }
            b'/' if bytes.get(pos + 1) == Some(&b'>') => {
                return Some(OpenTag {
                    name,
                    attrs,
                    self_closing: true,
                    end: pos + 2,
                });
            }
            _ => {
                let (attr, next) = parse_attr(markup, pos)?;
                attrs.push(attr);
                pos = next;
            }
        }
    }
}

fn parse_attr(markup: &str, start: usize) -> Option<(Attr, usize)> {
    let bytes = markup.as_bytes();
    let mut pos = start;
    while pos < bytes.len()
        && !bytes[pos].is_ascii_whitespace()
        && !matches!(bytes[pos], b'=' | b'>' | b'/' | b'"' | b'\'')
    {
        pos += 1;
    }
    if pos == start {
        return None;
    }
    let name = markup[start..pos].to_owned();

    let after_name = skip_whitespace(bytes, pos);
    if bytes.get(after_name) != Some(&b'=') {
        return Some((Attr { name, value: None }, pos));
    }

    let value_start = skip_whitespace(bytes, after_name + 1);
    match *bytes.get(value_start)? {
        quote @ (b'"' | b'\'') => {
            let close = markup[value_start + 1..].find(quote as char)? + value_start + 1;
            let value = markup[value_start + 1..close].to_owned();
            Some((Attr { name, value: Some(value) }, close + 1))
        }
        _ => {
            let mut end = value_start;
            while end < bytes.len() && !bytes[end].is_ascii_whitespace() && bytes[end] != b'>' {
                end += 1;
            }
            let value = markup[value_start..end].to_owned();
            Some((Attr { name, value: Some(value) }, end))
        }
    }
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}
