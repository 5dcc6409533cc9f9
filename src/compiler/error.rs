//! Build error types.
//!
//! Every variant that concerns a single file names it, so a failed build
//! points at the offending path.

use crate::utils::minify::MinifyError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("malformed content in `{0}`: front matter must be enclosed by a pair of `---` lines")]
    MalformedContent(PathBuf),

    #[error("unsupported content `{0}`: pages must be `.md` or `.html` files")]
    UnsupportedContent(PathBuf),

    #[error("`{0}` is outside its source directory")]
    OutsideContentRoot(PathBuf),

    #[error("invalid front matter in `{path}`")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("template error in `{path}`")]
    Template {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to minify `{path}`")]
    Minify {
        path: PathBuf,
        #[source]
        source: MinifyError,
    },

    #[error("IO error at `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk directory")]
    Walk(#[from] walkdir::Error),
}

impl BuildError {
    /// `map_err` adapter for IO failures at `path`.
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// `map_err` adapter for template failures while rendering `path`.
    pub fn template(path: &Path) -> impl FnOnce(minijinja::Error) -> Self + '_ {
        move |source| Self::Template {
            path: path.to_path_buf(),
            source,
        }
    }
}
