//! Theme acquisition under `themes/`.
//!
//! A theme is fetched with a shallow `git clone` and detached from its
//! repository by deleting `.git`, so it becomes plain project files. The
//! directory name is the last URL segment without a `.git` suffix:
//!
//! ```text
//! https://example.com/acme/paper.git ──► themes/paper/
//! ```

use crate::{config::defaults::layout, exec, log};
use anyhow::{Context, Result, bail};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Directory name for a theme given by URL or name.
pub fn theme_name(url: &str) -> Result<&str> {
    let base = url.trim_end_matches(['/', '\\']);
    let base = base.rsplit(['/', '\\', ':']).next().unwrap_or(base);
    let name = base.strip_suffix(".git").unwrap_or(base);

    if name.is_empty() || name == "." || name == ".." {
        bail!("Cannot derive a theme name from `{url}`");
    }
    Ok(name)
}

fn theme_path(root: &Path, url: &str) -> Result<PathBuf> {
    Ok(root.join(layout::THEMES).join(theme_name(url)?))
}

/// Clone `url` into `themes/<name>`. Fails if the theme already exists.
pub fn add_theme(root: &Path, url: &str) -> Result<PathBuf> {
    let dest = theme_path(root, url)?;
    if dest.exists() {
        bail!("Theme `{}` already added", theme_name(url)?);
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    if let Err(err) = exec!(["git"]; "clone", "--depth=1", url, &dest) {
        // a failed clone may leave a partial checkout behind
        fs::remove_dir_all(&dest).ok();
        return Err(err.context(format!("Failed to clone `{url}`")));
    }

    let git_dir = dest.join(".git");
    if git_dir.exists() {
        fs::remove_dir_all(&git_dir)
            .with_context(|| format!("Failed to remove {}", git_dir.display()))?;
    }

    log!("theme"; "added {}", dest.display());
    Ok(dest)
}

/// Delete `themes/<name>`.
pub fn remove_theme(root: &Path, name_or_url: &str) -> Result<PathBuf> {
    let dest = theme_path(root, name_or_url)?;
    if !dest.is_dir() {
        bail!("Theme `{}` not found", theme_name(name_or_url)?);
    }
    fs::remove_dir_all(&dest).with_context(|| format!("Failed to remove {}", dest.display()))?;

    log!("theme"; "removed {}", dest.display());
    Ok(dest)
}

/// Replace an installed theme with a fresh clone of `url`.
pub fn update_theme(root: &Path, url: &str) -> Result<PathBuf> {
    remove_theme(root, url).context("Failed to update theme")?;
    add_theme(root, url).context("Failed to update theme")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git_available() -> bool {
        exec!(["git"]; "--version").is_ok()
    }

    /// A committed repository holding a minimal theme.
    fn theme_repo(dir: &Path) -> PathBuf {
        let repo = dir.join("paper.git");
        fs::create_dir_all(repo.join("layouts")).unwrap();
        fs::write(repo.join("layouts/base.html"), "{% include \"body\" %}").unwrap();

        exec!(&repo; ["git"]; "init", "-q").unwrap();
        exec!(&repo; ["git"]; "add", ".").unwrap();
        exec!(
            &repo; ["git"];
            "-c", "user.name=kiln", "-c", "user.email=kiln@localhost",
            "commit", "-q", "-m", "theme"
        )
        .unwrap();
        repo
    }

    #[test]
    fn test_theme_name() {
        assert_eq!(theme_name("https://example.com/acme/paper.git").unwrap(), "paper");
        assert_eq!(theme_name("https://example.com/acme/paper/").unwrap(), "paper");
        assert_eq!(theme_name("git@example.com:paper.git").unwrap(), "paper");
        assert_eq!(theme_name("paper").unwrap(), "paper");
        assert!(theme_name("https://example.com/..").is_err());
        assert!(theme_name("").is_err());
    }

    #[test]
    fn test_add_refuses_existing_theme() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("themes/paper")).unwrap();

        let err = add_theme(dir.path(), "https://example.com/paper.git").unwrap_err();
        assert!(err.to_string().contains("already added"));
    }

    #[test]
    fn test_failed_clone_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nowhere/paper.git");

        assert!(add_theme(dir.path(), &missing.to_string_lossy()).is_err());
        assert!(!dir.path().join("themes/paper").exists());
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("themes/paper/layouts")).unwrap();

        remove_theme(dir.path(), "paper").unwrap();
        assert!(!dir.path().join("themes/paper").exists());
        assert!(remove_theme(dir.path(), "paper").is_err());
    }

    #[test]
    fn test_update_requires_installed_theme() {
        let dir = TempDir::new().unwrap();
        assert!(update_theme(dir.path(), "https://example.com/paper.git").is_err());
    }

    #[test]
    fn test_add_and_update_from_local_repo() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let repo = theme_repo(&dir.path().join("upstream"));
        let url = repo.to_string_lossy().into_owned();
        let site = dir.path().join("site");

        let dest = add_theme(&site, &url).unwrap();
        assert_eq!(dest, site.join("themes/paper"));
        assert!(dest.join("layouts/base.html").is_file());
        assert!(!dest.join(".git").exists());

        fs::write(dest.join("local-edit.txt"), "mine").unwrap();
        update_theme(&site, &url).unwrap();
        assert!(dest.join("layouts/base.html").is_file());
        assert!(!dest.join("local-edit.txt").exists());
    }
}
