//! Content and asset compilation.
//!
//! - **route**: Source path to pretty-URL destination
//! - **markdown**: Front matter splitting and Markdown rendering
//! - **template**: Theme layout composition
//! - **pages**: Compile one content file into an output page
//! - **assets**: Mirror one public file, templating text assets
//!
//! # Flow
//!
//! ```text
//! content/*.md ──► resolve ──► parse ──► render_page ──┐
//! content/*.html ─────────────────────► render_page ──┼──► publish ──► build/
//! public/*.{css,js,html} ─────────────► render_asset ─┘      │
//! public/* ──────────────────────────────────────────── copy ─┘
//! ```
//!
//! `publish` injects the live-reload script (debug only) and minifies
//! (release only) before writing.

pub mod assets;
pub mod error;
pub mod markdown;
pub mod pages;
pub mod route;
pub mod template;

pub use assets::process_asset;
pub use error::BuildError;
pub use pages::compile_page;

use crate::config::SiteConfig;
use crate::reload;
use crate::utils::minify::{MinifyType, minify};
use markdown::{Markdown, Metadata};
use std::{
    fs,
    path::{Path, PathBuf},
};
use template::{PageContext, SiteMeta, Templates};
use walkdir::{DirEntry, WalkDir};

// ============================================================================
// Build context
// ============================================================================

/// Everything a single build pass shares across pages and assets.
pub struct BuildContext<'a> {
    pub config: &'a SiteConfig,
    pub templates: Templates,
    pub markdown: Markdown,
}

impl<'a> BuildContext<'a> {
    /// Load the theme layouts and configure Markdown for one build.
    pub fn new(config: &'a SiteConfig) -> Result<Self, BuildError> {
        Ok(Self {
            config,
            templates: Templates::load(&config.layouts_dir())?,
            markdown: Markdown::new(config.markdown.extensions.as_slice()),
        })
    }

    /// Template context for a page or asset at logical `path`.
    fn page_context<'b>(&'b self, page: &'b Metadata, path: &'b str) -> PageContext<'b> {
        PageContext {
            theme: &self.config.theme_params,
            page,
            site: SiteMeta {
                debug: self.config.debug,
                path,
            },
        }
    }

    /// Finalize rendered text and write it to `dest`.
    fn publish(&self, dest: &Path, text: String) -> Result<(), BuildError> {
        let is_html = MinifyType::from_path(dest) == Some(MinifyType::Html);
        let text = if self.config.debug && is_html {
            reload::inject(&text, self.config.reload_port())
        } else {
            text
        };

        let bytes = minify(dest, text.as_bytes(), !self.config.debug).map_err(|source| {
            BuildError::Minify {
                path: dest.to_path_buf(),
                source,
            }
        })?;

        write_output(dest, &bytes)
    }
}

// ============================================================================
// Shared utilities
// ============================================================================

/// Collect regular files under `dir` depth-first in file-name order.
///
/// Hidden entries (leading `.`) are skipped along with everything beneath
/// them. A missing directory yields no files.
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

/// Write `bytes` to `dest`, creating parent directories.
fn write_output(dest: &Path, bytes: &[u8]) -> Result<(), BuildError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(BuildError::io(parent))?;
    }
    fs::write(dest, bytes).map_err(BuildError::io(dest))
}
