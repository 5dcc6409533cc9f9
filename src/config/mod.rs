//! Site configuration management for `config.yml`.
//!
//! # Keys
//!
//! | Key                   | Purpose                                        |
//! |-----------------------|------------------------------------------------|
//! | `Theme`               | Theme directory name under `themes/`           |
//! | `ThemeParams`         | Free-form values exposed to templates as `Theme` |
//! | `Markdown.Extensions` | Optional Markdown extensions to enable         |
//! | `Port`                | Dev server HTTP port (default 8000)            |
//! | `Interface`           | Dev server bind address (default 127.0.0.1)    |
//! | `ReloadPort`          | Live-reload socket port (default `Port + 1`)   |
//!
//! # Example
//!
//! ```yaml
//! Theme: demo
//! ThemeParams:
//!   Author: Jane
//! Markdown:
//!   Extensions: [footnote, linkify]
//! Port: 8080
//! ```

pub mod defaults;
mod error;

pub use error::ConfigError;

use defaults::layout;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
};

/// Root configuration structure representing `config.yml`.
///
/// One snapshot is immutable for the duration of a build. Unknown keys are
/// ignored so older binaries keep working with newer project files.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(rename_all = "PascalCase")]
pub struct SiteConfig {
    /// Absolute project root (set after loading)
    #[serde(skip)]
    pub root: PathBuf,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Debug mode: no minification, live-reload script injected
    #[serde(skip)]
    pub debug: bool,

    /// Theme directory name under `themes/`
    #[serde(default)]
    pub theme: String,

    /// Theme parameters, opaque to the build
    #[serde(default)]
    pub theme_params: serde_yaml::Mapping,

    #[serde(default)]
    pub markdown: MarkdownConfig,

    /// HTTP port; `0` falls back to the default
    #[serde(default = "defaults::port")]
    #[educe(Default = defaults::port())]
    pub port: u16,

    #[serde(default = "defaults::interface")]
    #[educe(Default = defaults::interface())]
    pub interface: String,

    #[serde(default)]
    pub reload_port: Option<u16>,
}

/// `Markdown` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarkdownConfig {
    /// Extension names; unknown entries are reported and skipped
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl SiteConfig {
    /// Parse configuration from a YAML string.
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Load and validate `file` (relative to `root`), reading the debug flag
    /// from the environment.
    pub fn load(root: &Path, file: &Path) -> Result<Self, ConfigError> {
        let root = root
            .canonicalize()
            .map_err(|err| ConfigError::Io(root.to_path_buf(), err))?;
        let config_path = root.join(file);

        let content = fs::read_to_string(&config_path)
            .map_err(|err| ConfigError::Io(config_path.clone(), err))?;
        let mut config =
            Self::parse(&content).map_err(|err| ConfigError::Yaml(config_path.clone(), err))?;

        config.root = root;
        config.config_path = config_path;
        config.debug = debug_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Re-read the config file.
    ///
    /// Root, debug flag and listener settings are kept: the dev server has
    /// already bound its sockets and pages point at the reload port.
    pub fn reload(&self) -> Result<Self, ConfigError> {
        let mut fresh = Self::load(&self.root, &self.config_path)?;
        fresh.debug = self.debug;
        fresh.port = self.port;
        fresh.interface.clone_from(&self.interface);
        fresh.reload_port = self.reload_port;
        Ok(fresh)
    }

    /// Replace the project root (paths are derived from it).
    pub fn with_root(mut self, root: &Path) -> Self {
        self.config_path = root.join(layout::CONFIG_FILE);
        self.root = root.to_path_buf();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.theme.trim().is_empty() {
            return Err(ConfigError::Validation("`Theme` must be set".into()));
        }
        if self.theme.contains(['/', '\\']) || self.theme == ".." {
            return Err(ConfigError::Validation(format!(
                "`Theme` must be a directory name under `{}/`, got `{}`",
                layout::THEMES,
                self.theme
            )));
        }
        self.ip()?;
        if self.reload_port() == self.port() {
            return Err(ConfigError::Validation(format!(
                "`ReloadPort` must differ from `Port` ({}); set `ReloadPort` explicitly",
                self.port()
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------------

    /// Effective HTTP port.
    pub fn port(&self) -> u16 {
        if self.port == 0 { defaults::PORT } else { self.port }
    }

    /// Effective live-reload socket port.
    pub fn reload_port(&self) -> u16 {
        self.reload_port
            .filter(|&port| port != 0)
            .unwrap_or_else(|| self.port().saturating_add(1))
    }

    fn ip(&self) -> Result<IpAddr, ConfigError> {
        self.interface.parse().map_err(|_| {
            ConfigError::Validation(format!("`Interface` is not an IP address: `{}`", self.interface))
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.ip()?, self.port()))
    }

    pub fn reload_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.ip()?, self.reload_port()))
    }

    /// URL to open in a browser.
    pub fn url(&self) -> String {
        let host = match self.ip() {
            Ok(ip) if ip.is_loopback() || ip.is_unspecified() => "localhost".to_string(),
            Ok(IpAddr::V6(ip)) => format!("[{ip}]"),
            _ => self.interface.clone(),
        };
        format!("http://{host}:{}", self.port())
    }

    pub fn theme_dir(&self) -> PathBuf {
        self.root.join(layout::THEMES).join(&self.theme)
    }

    pub fn layouts_dir(&self) -> PathBuf {
        self.theme_dir().join(layout::LAYOUTS)
    }

    pub fn theme_public_dir(&self) -> PathBuf {
        self.theme_dir().join(layout::PUBLIC)
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join(layout::CONTENT)
    }

    pub fn public_dir(&self) -> PathBuf {
        self.root.join(layout::PUBLIC)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(layout::OUTPUT)
    }
}

/// Read the debug flag from the environment.
fn debug_from_env() -> bool {
    std::env::var(defaults::DEBUG_ENV).is_ok_and(|value| parse_flag(&value))
}

/// Interpret a boolean-ish environment value.
///
/// Empty, `0`, `false`, `no` and `off` are false; anything else is true.
fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty()
        || value == "0"
        || ["false", "no", "off"]
            .iter()
            .any(|v| value.eq_ignore_ascii_case(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal() {
        let config = SiteConfig::parse("Theme: demo\nPort: 8080\n").unwrap();

        assert_eq!(config.theme, "demo");
        assert_eq!(config.port(), 8080);
        assert_eq!(config.reload_port(), 8081);
        assert!(config.theme_params.is_empty());
        assert!(config.markdown.extensions.is_empty());
    }

    #[test]
    fn test_parse_full() {
        let config = SiteConfig::parse(
            r#"
Theme: demo
ThemeParams:
  Author: Jane
  Nav: [home, about]
Markdown:
  Extensions: [footnote, linkify, nonsense]
Port: 3000
Interface: 0.0.0.0
ReloadPort: 4000
"#,
        )
        .unwrap();

        assert_eq!(
            config.theme_params.get("Author").and_then(|v| v.as_str()),
            Some("Jane")
        );
        assert_eq!(config.markdown.extensions, ["footnote", "linkify", "nonsense"]);
        assert_eq!(config.interface, "0.0.0.0");
        assert_eq!(config.reload_port(), 4000);
        assert_eq!(config.url(), "http://localhost:3000");
    }

    #[test]
    fn test_port_defaults() {
        let absent = SiteConfig::parse("Theme: demo\n").unwrap();
        assert_eq!(absent.port(), 8000);

        let zero = SiteConfig::parse("Theme: demo\nPort: 0\n").unwrap();
        assert_eq!(zero.port(), 8000);
        assert_eq!(zero.reload_port(), 8001);

        assert_eq!(SiteConfig::default().port(), 8000);
        assert_eq!(SiteConfig::default().interface, "127.0.0.1");
    }

    #[test]
    fn test_unknown_keys_tolerated() {
        let config = SiteConfig::parse("Theme: demo\nSomethingNew: true\n").unwrap();
        assert_eq!(config.theme, "demo");
    }

    #[test]
    fn test_validate() {
        let missing = SiteConfig::parse("Port: 8080\n").unwrap();
        assert!(matches!(missing.validate(), Err(ConfigError::Validation(_))));

        let escaping = SiteConfig::parse("Theme: ../outside\n").unwrap();
        assert!(escaping.validate().is_err());

        let bad_iface = SiteConfig::parse("Theme: demo\nInterface: nowhere\n").unwrap();
        assert!(bad_iface.validate().is_err());

        let ok = SiteConfig::parse("Theme: demo\n").unwrap();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_reload_port_must_differ() {
        // Port + 1 saturates at the top of the range
        let top = SiteConfig::parse("Theme: demo\nPort: 65535\n").unwrap();
        assert_eq!(top.reload_port(), 65535);
        assert!(matches!(top.validate(), Err(ConfigError::Validation(_))));

        let same = SiteConfig::parse("Theme: demo\nPort: 3000\nReloadPort: 3000\n").unwrap();
        assert!(same.validate().is_err());

        let explicit = SiteConfig::parse("Theme: demo\nPort: 65535\nReloadPort: 65534\n").unwrap();
        assert!(explicit.validate().is_ok());
    }

    #[test]
    fn test_parse_flag() {
        for truthy in ["1", "true", "TRUE", "yes", "on", "anything"] {
            assert!(parse_flag(truthy), "{truthy}");
        }
        for falsy in ["", " ", "0", "false", "False", "no", "off"] {
            assert!(!parse_flag(falsy), "{falsy:?}");
        }
    }

    #[test]
    fn test_derived_paths() {
        let config = SiteConfig::parse("Theme: demo\n")
            .unwrap()
            .with_root(Path::new("/site"));

        assert_eq!(config.content_dir(), Path::new("/site/content"));
        assert_eq!(config.public_dir(), Path::new("/site/public"));
        assert_eq!(config.output_dir(), Path::new("/site/build"));
        assert_eq!(config.layouts_dir(), Path::new("/site/themes/demo/layouts"));
        assert_eq!(config.theme_public_dir(), Path::new("/site/themes/demo/public"));
        assert_eq!(config.config_path, Path::new("/site/config.yml"));
    }

    #[test]
    fn test_load_and_reload() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.yml"), "Theme: demo\nPort: 8080\n").unwrap();

        let mut config = SiteConfig::load(dir.path(), Path::new("config.yml")).unwrap();
        assert_eq!(config.port(), 8080);
        assert!(config.root.is_absolute());

        config.debug = true;
        fs::write(dir.path().join("config.yml"), "Theme: other\nPort: 9090\n").unwrap();
        let fresh = config.reload().unwrap();
        assert_eq!(fresh.theme, "other");
        assert!(fresh.debug);
        assert_eq!(fresh.port(), 8080);
        assert_eq!(fresh.reload_port(), 8081);
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let missing = SiteConfig::load(dir.path(), Path::new("config.yml"));
        assert!(matches!(missing, Err(ConfigError::Io(..))));

        fs::write(dir.path().join("config.yml"), "Theme: [unclosed\n").unwrap();
        let malformed = SiteConfig::load(dir.path(), Path::new("config.yml"));
        assert!(matches!(malformed, Err(ConfigError::Yaml(..))));
    }
}
