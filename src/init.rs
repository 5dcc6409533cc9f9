//! Site initialization module.
//!
//! Creates a new site with a starter page and a minimal `default` theme.

use crate::config::defaults::layout;
use anyhow::{Context, Result, bail};
use std::{fs, path::Path};

/// Starter files, relative to the site root
const STARTER_FILES: &[(&str, &str)] = &[
    (layout::CONFIG_FILE, include_str!("embed/init/config.yml")),
    ("content/index.md", include_str!("embed/init/index.md")),
    ("themes/default/layouts/base.html", include_str!("embed/init/base.html")),
    ("themes/default/public/style.css", include_str!("embed/init/style.css")),
];

/// Default site directory structure
const SITE_DIRS: &[&str] = &[layout::CONTENT, layout::PUBLIC, layout::THEMES];

/// Create a new site at `root`, which must be missing or empty.
pub fn new_site(root: &Path) -> Result<()> {
    if !is_dir_empty(root)? {
        bail!(
            "`{}` is not empty. Use `kiln init <SITE_NAME>` to create in a subdirectory.",
            root.display()
        );
    }

    for dir in SITE_DIRS {
        let path = root.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
    }

    for (rel, content) in STARTER_FILES {
        write_file(&root.join(rel), content)?;
    }
    write_file(&root.join(".gitignore"), &format!("{}/\n", layout::OUTPUT))?;

    Ok(())
}

/// Check if a directory is missing or completely empty
fn is_dir_empty(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    let mut entries =
        fs::read_dir(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(entries.next().is_none())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build::build_site, config::SiteConfig};
    use tempfile::TempDir;

    #[test]
    fn test_new_site_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("blog");
        new_site(&root).unwrap();

        for dir in SITE_DIRS {
            assert!(root.join(dir).is_dir(), "{dir}");
        }
        assert_eq!(
            fs::read_to_string(root.join("content/index.md")).unwrap(),
            "---\nTitle: Hello\n---\n# Hello, World!\n"
        );
        assert_eq!(fs::read_to_string(root.join(".gitignore")).unwrap(), "build/\n");
    }

    #[test]
    fn test_new_site_builds() {
        let dir = TempDir::new().unwrap();
        new_site(dir.path()).unwrap();

        let config = SiteConfig::load(dir.path(), Path::new(layout::CONFIG_FILE)).unwrap();
        assert_eq!(config.theme, "default");
        build_site(&config).unwrap();

        let html = fs::read_to_string(config.output_dir().join("index.html")).unwrap();
        assert!(html.contains("Hello, World!"));
        assert!(html.contains("My Site"));
        assert!(config.output_dir().join("style.css").is_file());
    }

    #[test]
    fn test_refuses_non_empty_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "mine").unwrap();

        assert!(new_site(dir.path()).is_err());
        assert!(!dir.path().join(layout::CONFIG_FILE).exists());
    }
}
