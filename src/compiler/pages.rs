//! Content page compilation.

use super::markdown::Metadata;
use super::route::resolve;
use super::{BuildContext, BuildError};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Compile one content file and write the page. Returns the destination.
///
/// `.md` files are parsed for front matter and rendered as Markdown; `.html`
/// files are used as the body template as-is. Anything else is rejected.
pub fn compile_page(source: &Path, ctx: &BuildContext<'_>) -> Result<PathBuf, BuildError> {
    let config = ctx.config;
    let route = resolve(&config.content_dir(), &config.output_dir(), source)?;
    let raw = fs::read_to_string(source).map_err(BuildError::io(source))?;

    let (meta, body) = match source.extension().and_then(|e| e.to_str()) {
        Some("md") => ctx.markdown.parse(&raw, source)?,
        Some("html") => (Metadata::new(), raw),
        _ => return Err(BuildError::UnsupportedContent(source.to_path_buf())),
    };

    let url = route.url_path();
    let html = ctx
        .templates
        .render_page(&body, &ctx.page_context(&meta, &url), source)?;

    let dest = route.path();
    ctx.publish(&dest, html)?;
    Ok(dest)
}
