//! Content path to output path resolution.
//!
//! Every page gets a pretty URL: `about.md` is written to
//! `about/index.html`, while `index.*` files stay where they are.
//!
//! ```text
//! content/index.md      → build/index.html
//! content/about.md      → build/about/index.html
//! content/blog/post.md  → build/blog/post/index.html
//! content/blog/index.md → build/blog/index.html
//! ```

use super::error::BuildError;
use std::path::{Component, Path, PathBuf};

/// Where a content file lands in the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Destination directory (absolute, under the output root)
    pub dir: PathBuf,
    /// Destination file name inside `dir`
    pub file_name: String,
    /// `dir` relative to the output root
    pub rel_dir: PathBuf,
}

impl Route {
    /// Full destination path.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Logical URL directory of the page: `/`, `/about`, `/blog/post`.
    pub fn url_path(&self) -> String {
        let segments: Vec<_> = self
            .rel_dir
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy()),
                _ => None,
            })
            .collect();
        format!("/{}", segments.join("/"))
    }
}

/// Compute the destination of `source` under `output_root`.
pub fn resolve(content_root: &Path, output_root: &Path, source: &Path) -> Result<Route, BuildError> {
    let rel = source
        .strip_prefix(content_root)
        .map_err(|_| BuildError::OutsideContentRoot(source.to_path_buf()))?;

    let file_name = rel
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| BuildError::OutsideContentRoot(source.to_path_buf()))?;
    let parent = rel.parent().unwrap_or(Path::new(""));

    let (rel_dir, file_name) = if file_name.starts_with("index.") {
        let file_name = match file_name.strip_suffix(".md") {
            Some(stem) => format!("{stem}.html"),
            None => file_name,
        };
        (parent.to_path_buf(), file_name)
    } else {
        let base = file_name.split('.').next().unwrap_or_default();
        (parent.join(base), "index.html".to_string())
    };

    Ok(Route {
        dir: output_root.join(&rel_dir),
        file_name,
        rel_dir,
    })
}
