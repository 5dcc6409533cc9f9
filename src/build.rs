//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── reset build/
//!     │
//!     ├── themes/<theme>/public ──► process_asset() ──┐
//!     ├── public/ ────────────────► process_asset() ──┤ (project overrides theme)
//!     │                                               ▼
//!     └── content/ ───────────────► compile_page() ──► build/
//! ```
//!
//! Every pass is sequential and in file-name order. The first failing file
//! aborts the build.

use crate::{
    compiler::{BuildContext, BuildError, collect_files, compile_page, process_asset},
    config::SiteConfig,
    log,
};
use std::{fs, path::Path, time::Instant};

/// Counters reported after each build.
#[derive(Debug)]
pub struct BuildStats {
    started: Instant,
    pub pages: usize,
    pub assets: usize,
}

impl BuildStats {
    fn start() -> Self {
        Self {
            started: Instant::now(),
            pages: 0,
            assets: 0,
        }
    }

    fn report(&self) {
        log!("build"; "{} pages built in {}ms", self.pages, self.started.elapsed().as_millis());
    }
}

/// Build the whole site into the output directory.
///
/// Statistics are logged whether or not the build succeeds.
pub fn build_site(config: &SiteConfig) -> Result<BuildStats, BuildError> {
    let mut stats = BuildStats::start();
    let result = run(config, &mut stats);
    stats.report();
    result.map(|()| stats)
}

fn run(config: &SiteConfig, stats: &mut BuildStats) -> Result<(), BuildError> {
    reset_output(&config.output_dir())?;
    let ctx = BuildContext::new(config)?;

    // theme first so project files of the same name overwrite it
    for public_root in [config.theme_public_dir(), config.public_dir()] {
        for source in collect_files(&public_root)? {
            process_asset(&source, &public_root, &ctx)?;
            stats.assets += 1;
        }
    }

    for source in collect_files(&config.content_dir())? {
        compile_page(&source, &ctx)?;
        stats.pages += 1;
    }

    Ok(())
}

/// Remove and recreate the output directory.
fn reset_output(output: &Path) -> Result<(), BuildError> {
    if output.exists() {
        fs::remove_dir_all(output).map_err(BuildError::io(output))?;
    }
    fs::create_dir_all(output).map_err(BuildError::io(output))
}
