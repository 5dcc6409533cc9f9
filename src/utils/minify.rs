//! Minification for generated markup, stylesheets and scripts.
//!
//! All three go through `minify_html`. Stylesheets and scripts are wrapped
//! in a `<style>`/`<script>` element so its embedded CSS/JS minifiers apply,
//! then unwrapped again.

use std::{borrow::Cow, path::Path};
use thiserror::Error;

// ============================================================================
// Types
// ============================================================================

/// Content type for minification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinifyType {
    Html,
    Css,
    Js,
}

impl MinifyType {
    /// Media category from a destination file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("html" | "htm") => Some(Self::Html),
            Some("css") => Some(Self::Css),
            Some("js" | "mjs") => Some(Self::Js),
            _ => None,
        }
    }

    const fn wrapper(self) -> Option<&'static str> {
        match self {
            Self::Html => None,
            Self::Css => Some("style"),
            Self::Js => Some("script"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MinifyError {
    #[error("minified <{0}> content could not be unwrapped; does the source contain `</{0}>`?")]
    Unwrap(&'static str),
}

// ============================================================================
// Unified Minify Function
// ============================================================================

/// Minify `input` by the media type of `path`.
///
/// Returns `Cow::Borrowed` if minify is disabled or the type is not handled.
pub fn minify<'a>(path: &Path, input: &'a [u8], enabled: bool) -> Result<Cow<'a, [u8]>, MinifyError> {
    if !enabled {
        return Ok(Cow::Borrowed(input));
    }
    match MinifyType::from_path(path) {
        Some(kind) => minify_as(kind, input).map(Cow::Owned),
        None => Ok(Cow::Borrowed(input)),
    }
}

/// Minify `input` as `kind`.
pub fn minify_as(kind: MinifyType, input: &[u8]) -> Result<Vec<u8>, MinifyError> {
    match kind.wrapper() {
        None => Ok(minify_html::minify(input, &html_cfg())),
        Some(_) if input.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
        Some(tag) => minify_embedded(tag, input),
    }
}

// ============================================================================
// Internal Implementation
// ============================================================================

fn html_cfg() -> minify_html::Cfg {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    cfg
}

/// Minify CSS/JS by round-tripping through its HTML element.
fn minify_embedded(tag: &'static str, body: &[u8]) -> Result<Vec<u8>, MinifyError> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    // a closing tag inside the body would end the element early
    let needle = &close.as_bytes()[..close.len() - 1];
    if body.windows(needle.len()).any(|w| w.eq_ignore_ascii_case(needle)) {
        return Err(MinifyError::Unwrap(tag));
    }

    let mut doc = Vec::with_capacity(body.len() + open.len() + close.len());
    doc.extend_from_slice(open.as_bytes());
    doc.extend_from_slice(body);
    doc.extend_from_slice(close.as_bytes());

    let out = minify_html::minify(&doc, &html_cfg());
    if out.is_empty() {
        return Ok(out);
    }
    out.strip_prefix(open.as_bytes())
        .and_then(|rest| rest.strip_suffix(close.as_bytes()))
        .map(<[u8]>::to_vec)
        .ok_or(MinifyError::Unwrap(tag))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, input: &[u8], enabled: bool) -> Vec<u8> {
        minify(Path::new(name), input, enabled).unwrap().into_owned()
    }

    #[test]
    fn test_from_path() {
        assert_eq!(MinifyType::from_path(Path::new("a/index.html")), Some(MinifyType::Html));
        assert_eq!(MinifyType::from_path(Path::new("a.htm")), Some(MinifyType::Html));
        assert_eq!(MinifyType::from_path(Path::new("style.css")), Some(MinifyType::Css));
        assert_eq!(MinifyType::from_path(Path::new("app.js")), Some(MinifyType::Js));
        assert_eq!(MinifyType::from_path(Path::new("logo.png")), None);
        assert_eq!(MinifyType::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_minify_html_basic() {
        let html = b"<html>\n  <head>\n  </head>\n  <body>\n    <p>Hello</p>\n  </body>\n</html>";
        let result = run("index.html", html, true);
        let result_str = String::from_utf8_lossy(&result);

        assert!(!result_str.contains("\n  "));
        assert!(result_str.contains("<p>Hello</p>"));
    }

    #[test]
    fn test_minify_css() {
        let css = b"body {\n    color: red;\n}\n\n/* note */\n";
        let result = run("style.css", css, true);
        let result_str = String::from_utf8_lossy(&result);

        assert!(result.len() < css.len());
        assert!(!result_str.contains("<style>"));
        assert!(!result_str.contains("note"));
        assert!(result_str.contains("color:red"));
    }

    #[test]
    fn test_minify_js() {
        let js = b"function greet(name) {\n    // say hi\n    return 'hi ' + name;\n}\n";
        let result = run("app.js", js, true);
        let result_str = String::from_utf8_lossy(&result);

        assert!(result.len() < js.len());
        assert!(!result_str.contains("<script>"));
        assert!(!result_str.contains("say hi"));
    }

    #[test]
    fn test_disabled_is_passthrough() {
        for (name, input) in [
            ("index.html", &b"<html>\n  <body>\n  </body>\n</html>"[..]),
            ("style.css", &b"body {\n  color: red;\n}\n"[..]),
            ("app.js", &b"const a = 1;\n\nconsole.log(a);\n"[..]),
        ] {
            let result = minify(Path::new(name), input, false).unwrap();
            assert!(matches!(result, Cow::Borrowed(_)));
            assert_eq!(&*result, input);
        }
    }

    #[test]
    fn test_unhandled_type_is_passthrough() {
        let data = b"\x89PNG\r\n  raw  ";
        assert_eq!(run("logo.png", data, true), data);
    }

    #[test]
    fn test_whitespace_only_stylesheet() {
        assert!(run("empty.css", b"  \n\n", true).is_empty());
        assert!(run("notes.css", b"/* nothing yet */\n", true).is_empty());
    }

    #[test]
    fn test_unwrap_failure_is_error() {
        let err = minify(Path::new("bad.css"), b"a{}</STYLE><p>x</p><style>", true).unwrap_err();
        assert!(err.to_string().contains("style"));
    }
}
