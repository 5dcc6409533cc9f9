//! File system watcher for live reload.
//!
//! Every directory under the theme, content and public roots is watched
//! individually, plus the directory holding the config file. Each relevant
//! event triggers a full rebuild whose outcome is broadcast to the browser
//! sessions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  Signal::Fs   ┌──────────────────────────────────────┐
//! │  notify  │──────────────▶│             event loop               │
//! └──────────┘               │                                      │
//! ┌──────────┐ Signal::      │  relevant? ─► reload config          │
//! │  Ctrl+C  │──Shutdown────▶│              ─► build_site           │
//! └──────────┘               │              ─► Hub::broadcast       │
//!                            └──────────────────────────────────────┘
//! ```
//!
//! Events are not debounced: a burst of N events runs N rebuilds.

use crate::{
    build::build_site,
    config::SiteConfig,
    hub::{Hub, Notice},
    log,
    logger::stamp,
};
use anyhow::{Context, Result, bail};
use notify::{
    Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    event::ModifyKind,
};
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
};
use walkdir::WalkDir;

/// Input of the event loop.
pub enum Signal {
    Fs(notify::Result<Event>),
    Shutdown,
}

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Creates, writes and removes. Metadata-only changes and access events
/// are ignored.
fn is_relevant(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(modify) => !matches!(modify, ModifyKind::Metadata(_)),
        _ => false,
    }
}

/// Format path as relative to the project root for log display.
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// Directories whose contents feed the build.
struct Roots {
    config_file: PathBuf,
    dirs: Vec<PathBuf>,
}

impl Roots {
    fn new(config: &SiteConfig) -> Self {
        Self {
            config_file: config.config_path.clone(),
            dirs: vec![config.theme_dir(), config.content_dir(), config.public_dir()],
        }
    }

    /// First path of `event` that should trigger a rebuild.
    fn trigger<'a>(&self, event: &'a Event) -> Option<&'a PathBuf> {
        if !is_relevant(&event.kind) {
            return None;
        }
        event.paths.iter().find(|path| {
            !is_temp_file(path)
                && (**path == self.config_file || self.dirs.iter().any(|dir| path.starts_with(dir)))
        })
    }
}

// =============================================================================
// Watcher Setup
// =============================================================================

/// Watch every non-hidden directory under `root`.
fn watch_tree(watcher: &mut impl Watcher, root: &Path) -> Result<usize> {
    let mut count = 0;
    let dirs = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in dirs {
        let entry = entry.with_context(|| format!("Failed to scan {}", root.display()))?;
        if entry.file_type().is_dir() {
            watcher
                .watch(entry.path(), RecursiveMode::NonRecursive)
                .with_context(|| format!("Failed to watch {}", entry.path().display()))?;
            count += 1;
        }
    }
    Ok(count)
}

/// Register the watch set. Every root must exist: a directory that cannot
/// be watched would silently miss rebuilds.
fn setup_watchers(watcher: &mut impl Watcher, config: &SiteConfig, roots: &Roots) -> Result<()> {
    let mut count = 0;
    for dir in &roots.dirs {
        if !dir.is_dir() {
            bail!(
                "Cannot watch `{}`: directory does not exist",
                rel_path(dir, &config.root)
            );
        }
        count += watch_tree(watcher, dir)?;
    }

    let config_dir = roots.config_file.parent().unwrap_or(&config.root);
    watcher
        .watch(config_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", config_dir.display()))?;

    log!("watch"; "watching {} directories", count + 1);
    Ok(())
}

/// Pick up directories created after startup.
fn watch_new_dirs(watcher: &mut impl Watcher, event: &Event, roots: &Roots) {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))) {
        return;
    }
    for path in &event.paths {
        if path.is_dir()
            && roots.dirs.iter().any(|dir| path.starts_with(dir))
            && let Err(err) = watch_tree(watcher, path)
        {
            log!("warn"; "{err:#}");
        }
    }
}

// =============================================================================
// Rebuild
// =============================================================================

/// Reload the config and rebuild, broadcasting the outcome.
///
/// Returns the config to use for the next event: the fresh one, or the
/// previous one when the file no longer parses.
fn rebuild(config: SiteConfig, hub: &Hub) -> SiteConfig {
    let config = match config.reload() {
        Ok(fresh) => fresh,
        Err(err) => {
            report(hub, &err.into());
            return config;
        }
    };

    match build_site(&config) {
        Ok(_) => hub.broadcast(Notice::Reload),
        Err(err) => report(hub, &err.into()),
    }
    config
}

/// Log a failure and show it in every open page.
pub fn report(hub: &Hub, err: &anyhow::Error) {
    let text = format!("{err:#}");
    log!("error"; "{text}");
    hub.broadcast(Notice::Error(text));
}

// =============================================================================
// Public API
// =============================================================================

/// Register the watch set and start the event loop thread.
///
/// Registration failures, including a missing theme, content or public
/// directory, are returned before the thread starts. Send
/// [`Signal::Shutdown`] through the returned sender to stop the loop, which
/// drops the OS watcher.
pub fn spawn(config: SiteConfig, hub: Hub) -> Result<(Sender<Signal>, JoinHandle<()>)> {
    let (tx, rx) = mpsc::channel();
    let fs_tx = tx.clone();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
        fs_tx.send(Signal::Fs(event)).ok();
    })
    .context("Failed to create file watcher")?;

    let roots = Roots::new(&config);
    setup_watchers(&mut watcher, &config, &roots)?;

    let handle = thread::spawn(move || event_loop(watcher, rx, config, roots, &hub));
    Ok((tx, handle))
}

fn event_loop(
    mut watcher: RecommendedWatcher,
    rx: Receiver<Signal>,
    mut config: SiteConfig,
    mut roots: Roots,
    hub: &Hub,
) {
    for signal in rx {
        let event = match signal {
            Signal::Shutdown => break,
            Signal::Fs(Err(err)) => {
                log!("watch"; "error: {err}");
                continue;
            }
            Signal::Fs(Ok(event)) => event,
        };
        let Some(trigger) = roots.trigger(&event) else {
            continue;
        };

        log!("watch"; "[{}] {} changed, rebuilding...", stamp(), rel_path(trigger, &config.root));
        watch_new_dirs(&mut watcher, &event, &roots);

        let theme = config.theme.clone();
        config = rebuild(config, hub);
        if config.theme != theme {
            roots = Roots::new(&config);
            if let Err(err) = watch_tree(&mut watcher, &config.theme_dir()) {
                log!("warn"; "{err:#}");
            }
        }
    }
    drop(watcher);
}
