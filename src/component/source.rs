//! Single-file component splitting.
//!
//! A component file holds top-level `<template>`, `<script>` and `<style>`
//! blocks. Anything between blocks is ignored, as are HTML comments and
//! custom blocks (`<docs>…</docs>`).

use super::{literal::LiteralError, tags::parse_open_tag};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("more than one <{0}> block")]
    DuplicateBlock(&'static str),

    #[error("<{0}> is never closed")]
    UnclosedBlock(String),

    #[error("missing <template> block")]
    MissingTemplate,

    #[error("script has no `export default`")]
    MissingDefaultExport,

    #[error("invalid export: {0}")]
    Literal(#[from] LiteralError),

    #[error("exported `{key}` must be {expected}")]
    ExportShape { key: &'static str, expected: &'static str },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleBlock {
    pub content: String,
    pub lang: Option<String>,
}

/// Raw blocks of one component file, contents trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentSource {
    pub template: String,
    pub script: String,
    pub styles: Vec<StyleBlock>,
}

pub trait SourceParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<ComponentSource, ParseError>;
}

/// Block splitter for `.vue`-style files. Block names are case-insensitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct SfcParser;

impl SourceParser for SfcParser {
    fn parse(&self, raw: &str) -> Result<ComponentSource, ParseError> {
        // ASCII lowercasing keeps byte offsets intact.
        let lower = raw.to_ascii_lowercase();
        let mut template = None;
        let mut script = None;
        let mut styles = Vec::new();

        let mut pos = 0;
        while let Some(offset) = raw[pos..].find('<') {
            let lt = pos + offset;

            if raw[lt..].starts_with("<!--") {
                pos = raw[lt..].find("-->").map_or(raw.len(), |end| lt + end + 3);
                continue;
            }

            let Some(tag) = parse_open_tag(raw, lt) else {
                pos = lt + 1;
                continue;
            };
            if tag.self_closing {
                pos = tag.end;
                continue;
            }

            let name = tag.name.to_ascii_lowercase();
            let (close_start, close_end) = if name == "template" {
                find_template_close(&lower, tag.end)
            } else {
                find_close(&lower, &name, tag.end)
            }
            .ok_or_else(|| ParseError::UnclosedBlock(tag.name.clone()))?;

            let content = raw[tag.end..close_start].trim().to_owned();
            match name.as_str() {
                "template" => {
                    if template.replace(content).is_some() {
                        return Err(ParseError::DuplicateBlock("template"));
                    }
                }
                "script" => {
                    if script.replace(content).is_some() {
                        return Err(ParseError::DuplicateBlock("script"));
                    }
                }
                "style" => {
                    let lang = tag
                        .attrs
                        .iter()
                        .find(|attr| attr.name.eq_ignore_ascii_case("lang"))
                        .and_then(|attr| attr.value.clone());
                    styles.push(StyleBlock { content, lang });
                }
                _ => {}
            }
            pos = close_end;
        }

        Ok(ComponentSource {
            template: template.ok_or(ParseError::MissingTemplate)?,
            script: script.unwrap_or_default(),
            styles,
        })
    }
}

/// `(start, end)` of the first `</name>` at or after `from`.
fn find_close(lower: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let needle = format!("</{name}");
    let mut search = from;
    loop {
        let start = search + lower[search..].find(&needle)?;
        let after = start + needle.len();
        match lower.as_bytes().get(after) {
            Some(b'>' | b' ' | b'\t' | b'\r' | b'\n') => {
                let end = after + lower[after..].find('>')? + 1;
                return Some((start, end));
            }
            // `</scripts>` and friends
            _ => search = after,
        }
    }
}

/// Like [`find_close`], but templates nest (`<template v-slot>` inside the
/// root template), so inner pairs are skipped.
fn find_template_close(lower: &str, from: usize) -> Option<(usize, usize)> {
    const WORD: &str = "template";
    let bytes = lower.as_bytes();
    let mut depth = 1usize;
    let mut pos = from;

    loop {
        let word = pos + lower[pos..].find(WORD)?;
        let name_end = word + WORD.len();
        let closing = word >= 2 && bytes[word - 2..word] == *b"</";
        let opening = !closing && word >= 1 && bytes[word - 1] == b'<';
        let delimited = matches!(
            bytes.get(name_end),
            Some(b'>' | b'/' | b' ' | b'\t' | b'\r' | b'\n')
        );
        if !(opening || closing) || !delimited {
            pos = name_end;
            continue;
        }

        let start = if closing { word - 2 } else { word - 1 };
        let end = name_end + lower[name_end..].find('>')? + 1;
        if closing {
            depth -= 1;
            if depth == 0 {
                return Some((start, end));
            }
        } else if bytes[end - 2] != b'/' {
            depth += 1;
        }
        pos = end;
    }
}
