//! Theme layout composition.
//!
//! The theme's `layouts/` directory is parsed once per build into a shared
//! environment. Each page renders from a clone of that environment with a
//! single extra template, `body`, holding the page content. The base
//! layout pulls it in with `{% include "body" %}`. The shared environment is
//! never mutated, so one page's body cannot leak into another.
//!
//! ```text
//! layouts/base.html ─┐
//! layouts/nav.html  ─┼─► Templates ──clone──► + body (page A) ──► render
//! layouts/...       ─┘        │
//!                             └─────clone──► + body (page B) ──► render
//! ```
//!
//! Missing context keys render as empty values instead of failing.

use super::error::BuildError;
use super::markdown::Metadata;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;
use std::{fs, path::Path};
use walkdir::WalkDir;

/// Entry-point layout every page renders through.
pub const ENTRY: &str = "base.html";

/// Name of the per-page content slot.
pub const BODY: &str = "body";

/// Render context: `Theme`, `Page` and `Site` at the top level.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageContext<'a> {
    pub theme: &'a Metadata,
    pub page: &'a Metadata,
    pub site: SiteMeta<'a>,
}

/// Build-level values exposed as `Site`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiteMeta<'a> {
    pub debug: bool,
    /// Logical URL path of the page being rendered
    pub path: &'a str,
}

/// Parsed theme layouts.
#[derive(Clone)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Parse every file under `layouts_dir`, named by its relative path
    /// (`base.html`, `partials/nav.html`).
    pub fn load(layouts_dir: &Path) -> Result<Self, BuildError> {
        let mut env = new_env();

        for entry in WalkDir::new(layouts_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let name = template_name(path.strip_prefix(layouts_dir).unwrap_or(path));
            let source = fs::read_to_string(path).map_err(BuildError::io(path))?;
            env.add_template_owned(name, source)
                .map_err(BuildError::template(path))?;
        }

        Ok(Self { env })
    }

    /// Build from in-memory `(name, source)` pairs.
    #[cfg(test)]
    pub fn from_sources(sources: &[(&str, &str)]) -> Result<Self, minijinja::Error> {
        let mut env = new_env();
        for (name, source) in sources {
            env.add_template_owned(name.to_string(), source.to_string())?;
        }
        Ok(Self { env })
    }

    /// Render the entry layout with `body` as the page's content slot.
    ///
    /// `body` is itself a template: rendered Markdown, or the raw source of
    /// an `.html` page. `source` is only used for error messages.
    pub fn render_page(
        &self,
        body: &str,
        ctx: &PageContext<'_>,
        source: &Path,
    ) -> Result<String, BuildError> {
        let mut env = self.env.clone();
        env.add_template_owned(BODY, body.to_owned())
            .map_err(BuildError::template(source))?;
        env.get_template(ENTRY)
            .and_then(|template| template.render(ctx))
            .map_err(BuildError::template(source))
    }

    /// Render a standalone asset (stylesheet, script, markup) as a template.
    ///
    /// Assets may include layouts but do not go through the entry layout.
    pub fn render_asset(
        &self,
        name: &str,
        text: &str,
        ctx: &PageContext<'_>,
        source: &Path,
    ) -> Result<String, BuildError> {
        self.env
            .render_named_str(name, text, ctx)
            .map_err(BuildError::template(source))
    }
}

/// Environment shared by all layouts: lenient undefined values, source
/// whitespace kept verbatim, HTML escaping for markup templates only.
fn new_env() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    env.set_keep_trailing_newline(true);
    env.set_auto_escape_callback(|name| {
        if name == BODY || name.ends_with(".html") || name.ends_with(".htm") {
            AutoEscape::Html
        } else {
            AutoEscape::None
        }
    });
    env
}

/// Template name for a path relative to the layouts directory, always with
/// `/` separators.
pub(super) fn template_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
