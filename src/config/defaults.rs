//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

/// Port used when `Port` is absent or zero.
pub const PORT: u16 = 8000;

pub fn port() -> u16 {
    PORT
}

pub fn interface() -> String {
    "127.0.0.1".into()
}

/// Environment variable toggling debug mode.
pub const DEBUG_ENV: &str = "KILN_DEBUG";

// ============================================================================
// Project layout
// ============================================================================

pub mod layout {
    pub const CONTENT: &str = "content";
    pub const PUBLIC: &str = "public";
    pub const THEMES: &str = "themes";
    pub const LAYOUTS: &str = "layouts";
    pub const OUTPUT: &str = "build";
    pub const CONFIG_FILE: &str = "config.yml";
}
