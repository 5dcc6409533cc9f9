//! Public asset mirroring.
//!
//! Stylesheets, scripts and HTML files are rendered as templates (so they
//! can reference `Theme` params) and then minified. Everything else is
//! byte-copied.

use super::markdown::Metadata;
use super::template::template_name;
use super::{BuildContext, BuildError};
use crate::utils::minify::MinifyType;
use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};

/// Extensions rendered through the template engine.
const TEMPLATED: &[&str] = &["css", "html", "htm", "js"];

/// Mirror `source` from `public_root` into the output tree. Returns the
/// destination.
pub fn process_asset(
    source: &Path,
    public_root: &Path,
    ctx: &BuildContext<'_>,
) -> Result<PathBuf, BuildError> {
    let rel = source
        .strip_prefix(public_root)
        .map_err(|_| BuildError::OutsideContentRoot(source.to_path_buf()))?;
    let dest = ctx.config.output_dir().join(rel);

    if !is_templated(source) {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(BuildError::io(parent))?;
        }
        fs::copy(source, &dest).map_err(BuildError::io(source))?;
        return Ok(dest);
    }

    let name = template_name(rel);
    let raw = fs::read_to_string(source).map_err(BuildError::io(source))?;
    let text = match MinifyType::from_path(source) {
        Some(MinifyType::Css | MinifyType::Js) => literal_comment_markers(&raw),
        _ => Cow::Borrowed(raw.as_str()),
    };
    let empty = Metadata::new();
    let url = format!("/{name}");
    let rendered = ctx
        .templates
        .render_asset(&name, &text, &ctx.page_context(&empty, &url), source)?;

    ctx.publish(&dest, rendered)?;
    Ok(dest)
}

/// In scripts and stylesheets `{#` is plain text (private class fields,
/// minified blocks); only `{{ }}` and `{% %}` are template syntax there.
fn literal_comment_markers(text: &str) -> Cow<'_, str> {
    if text.contains("{#") {
        Cow::Owned(text.replace("{#", "{{ '{#' }}"))
    } else {
        Cow::Borrowed(text)
    }
}

fn is_templated(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| TEMPLATED.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use tempfile::TempDir;

    fn site(debug: bool) -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("themes/demo/layouts")).unwrap();
        fs::create_dir_all(root.join("public/img")).unwrap();
        fs::write(root.join("themes/demo/layouts/base.html"), "{% include \"body\" %}").unwrap();

        let mut config = SiteConfig::parse("Theme: demo\nThemeParams:\n  Accent: teal\n")
            .unwrap()
            .with_root(root);
        config.debug = debug;
        (dir, config)
    }

    #[test]
    fn test_binary_asset_is_copied() {
        let (dir, config) = site(false);
        let public = config.public_dir();
        let source = public.join("img/logo.png");
        let bytes = b"\x89PNG\r\n\x1a\n {{ Theme.Accent }}";
        fs::write(&source, bytes).unwrap();

        let ctx = BuildContext::new(&config).unwrap();
        let dest = process_asset(&source, &public, &ctx).unwrap();

        assert_eq!(dest, dir.path().join("build/img/logo.png"));
        assert_eq!(fs::read(dest).unwrap(), bytes);
    }

    #[test]
    fn test_stylesheet_is_templated() {
        let (_dir, config) = site(true);
        let public = config.public_dir();
        let source = public.join("style.css");
        fs::write(&source, "a {\n  color: {{ Theme.Accent }};\n}\n").unwrap();

        let ctx = BuildContext::new(&config).unwrap();
        let css = fs::read_to_string(process_asset(&source, &public, &ctx).unwrap()).unwrap();
        assert_eq!(css, "a {\n  color: teal;\n}\n");
    }

    #[test]
    fn test_stylesheet_minified_in_release() {
        let (_dir, config) = site(false);
        let public = config.public_dir();
        let source = public.join("style.css");
        fs::write(&source, "a {\n  color: {{ Theme.Accent }};\n}\n").unwrap();

        let ctx = BuildContext::new(&config).unwrap();
        let css = fs::read_to_string(process_asset(&source, &public, &ctx).unwrap()).unwrap();
        assert!(css.contains("color:teal"));
        assert!(!css.contains('\n'));
    }

    #[test]
    fn test_script_hash_brace_is_literal() {
        let (_dir, config) = site(true);
        let public = config.public_dir();
        let source = public.join("app.js");
        fs::write(
            &source,
            "class A{#x=1;get x(){return this.#x}}\nconst accent = \"{{ Theme.Accent }}\";\n",
        )
        .unwrap();

        let ctx = BuildContext::new(&config).unwrap();
        let js = fs::read_to_string(process_asset(&source, &public, &ctx).unwrap()).unwrap();
        assert_eq!(js, "class A{#x=1;get x(){return this.#x}}\nconst accent = \"teal\";\n");
    }

    #[test]
    fn test_literal_comment_markers() {
        assert!(matches!(literal_comment_markers("a { color: red; }"), Cow::Borrowed(_)));
        assert_eq!(literal_comment_markers("x{#y}"), "x{{ '{#' }}y}");
    }

    #[test]
    fn test_html_asset_sees_its_path() {
        let (_dir, config) = site(true);
        let public = config.public_dir();
        let source = public.join("404.html");
        fs::write(&source, "<p>{{ Site.Path|safe }}</p>").unwrap();

        let ctx = BuildContext::new(&config).unwrap();
        let html = fs::read_to_string(process_asset(&source, &public, &ctx).unwrap()).unwrap();
        assert!(html.starts_with("<p>/404.html</p>"));
        assert!(html.contains("/hot"));
    }
}
