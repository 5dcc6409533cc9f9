//! Front matter splitting and Markdown rendering.
//!
//! A content file is either plain Markdown, or a YAML block between two
//! `---` markers followed by Markdown:
//!
//! ```text
//! ---
//! Title: Hello
//! ---
//! # Hello
//! ```
//!
//! Markdown goes through pulldown-cmark with a whitelisted set of optional
//! extensions picked by name from `config.yml`.

use super::error::BuildError;
use crate::log;
use pulldown_cmark::{CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, html::push_html};
use regex::Regex;
use std::{path::Path, sync::LazyLock};

/// Loosely-typed key/value data from front matter and theme params.
pub type Metadata = serde_yaml::Mapping;

const DELIMITER: &str = "---";

/// Bare URLs turned into links by the `linkify` extension. Only `https`.
static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https://[^ \t\r\n<>"'()\[\]{}]+"#).expect("valid regex"));

/// Trailing punctuation that ends a sentence rather than a URL.
const URL_TRAILING: &[char] = &['.', ',', ';', ':', '!', '?'];

// ============================================================================
// Front matter
// ============================================================================

/// Split raw content into `(front matter, body)`.
///
/// Returns `None` when the content has no delimiters at all. A single stray
/// delimiter is an error.
pub fn split_front_matter<'a>(
    raw: &'a str,
    path: &Path,
) -> Result<(Option<&'a str>, &'a str), BuildError> {
    let parts: Vec<&str> = raw.splitn(3, DELIMITER).collect();
    match parts.as_slice() {
        [body] => Ok((None, body)),
        [_, meta, body] => Ok((Some(meta), body)),
        _ => Err(BuildError::MalformedContent(path.to_path_buf())),
    }
}

/// Decode a front matter block. Empty blocks yield empty metadata.
fn decode_metadata(source: &str) -> Result<Metadata, serde_yaml::Error> {
    use serde::de::Error;

    if source.trim().is_empty() {
        return Ok(Metadata::new());
    }
    match serde_yaml::from_str::<serde_yaml::Value>(source)? {
        serde_yaml::Value::Null => Ok(Metadata::new()),
        serde_yaml::Value::Mapping(map) => Ok(map),
        _ => Err(serde_yaml::Error::custom("front matter must be a key/value mapping")),
    }
}

// ============================================================================
// Markdown
// ============================================================================

/// Markdown renderer configured with named extensions.
#[derive(Debug, Clone)]
pub struct Markdown {
    options: Options,
    linkify: bool,
}

impl Markdown {
    /// Build a renderer from extension names. Unknown names are logged and
    /// skipped.
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        let mut options = Options::empty();
        let mut linkify = false;

        for ext in extensions {
            match ext.as_ref() {
                "footnote" => options.insert(Options::ENABLE_FOOTNOTES),
                "linkify" => linkify = true,
                "table" => options.insert(Options::ENABLE_TABLES),
                "strikethrough" => options.insert(Options::ENABLE_STRIKETHROUGH),
                "tasklist" => options.insert(Options::ENABLE_TASKLISTS),
                unknown => log!("warn"; "ignoring unknown markdown extension `{unknown}`"),
            }
        }

        Self { options, linkify }
    }

    /// Parse a content file into front matter and rendered body HTML.
    pub fn parse(&self, raw: &str, path: &Path) -> Result<(Metadata, String), BuildError> {
        let (meta, body) = split_front_matter(raw, path)?;
        let metadata = match meta {
            Some(source) => decode_metadata(source).map_err(|source| BuildError::FrontMatter {
                path: path.to_path_buf(),
                source,
            })?,
            None => Metadata::new(),
        };
        Ok((metadata, self.render(body)))
    }

    /// Convert Markdown to HTML.
    pub fn render(&self, text: &str) -> String {
        let parser = Parser::new_ext(text, self.options);
        let mut html = String::with_capacity(text.len() * 2);

        if self.linkify {
            push_html(&mut html, linkify(parser).into_iter());
        } else {
            push_html(&mut html, parser);
        }
        html
    }
}

/// Walk the event stream and wrap bare `https://` URLs in links.
///
/// Adjacent text events are merged first so a URL split by the parser is
/// matched whole. Text inside links and code blocks is left alone.
fn linkify<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::new();
    let mut pending = String::new();
    let mut opaque_depth = 0usize;

    let flush = |pending: &mut String, out: &mut Vec<Event<'a>>, opaque: bool| {
        if pending.is_empty() {
            return;
        }
        let text = std::mem::take(pending);
        if opaque {
            out.push(Event::Text(text.into()));
        } else {
            push_linkified(&text, out);
        }
    };

    for event in events {
        match event {
            Event::Text(text) => pending.push_str(&text),
            other => {
                flush(&mut pending, &mut out, opaque_depth > 0);
                match &other {
                    Event::Start(Tag::Link { .. } | Tag::CodeBlock(_)) => opaque_depth += 1,
                    Event::End(TagEnd::Link | TagEnd::CodeBlock) => {
                        opaque_depth = opaque_depth.saturating_sub(1);
                    }
                    _ => {}
                }
                out.push(other);
            }
        }
    }
    flush(&mut pending, &mut out, opaque_depth > 0);
    out
}

fn push_linkified<'a>(text: &str, out: &mut Vec<Event<'a>>) {
    let mut last = 0;
    for m in URL_PATTERN.find_iter(text) {
        let url = m.as_str().trim_end_matches(URL_TRAILING);
        if url.len() <= "https://".len() {
            continue;
        }
        if m.start() > last {
            out.push(Event::Text(text[last..m.start()].to_owned().into()));
        }
        let dest: CowStr<'a> = url.to_owned().into();
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: dest.clone(),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(dest));
        out.push(Event::End(TagEnd::Link));
        last = m.start() + url.len();
    }
    if last < text.len() {
        out.push(Event::Text(text[last..].to_owned().into()));
    }
}
