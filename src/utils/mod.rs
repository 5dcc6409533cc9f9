//! Utility modules.

pub mod command;
pub mod minify;
