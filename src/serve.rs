//! Development server with live reload support.
//!
//! Built on `tiny_http` with the following features:
//!
//! - Static file serving from the build output directory
//! - Automatic `index.html` resolution for directories
//! - File watching and auto-rebuild (via `watch` module)
//! - Reload/error notices pushed over a WebSocket (via `reload` module)
//! - Graceful shutdown on Ctrl+C
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  ┌──────────────────┐  ┌─────────────────┐
//! │   Main Thread   │  │  Watcher Thread  │  │  Reload Socket  │
//! │  (HTTP Server)  │  │  (File Monitor)  │  │ (one per page)  │
//! └────────┬────────┘  └────────┬─────────┘  └────────┬────────┘
//!          │                    │ broadcast           │ loaded
//!          ▼                    └───────► Hub ◄───────┘
//!    Serve build/
//! ```

use crate::{
    build::build_site,
    config::SiteConfig,
    hub::Hub,
    log, reload,
    watch::{self, Signal},
};
use anyhow::{Context, Result, anyhow};
use std::{
    fs,
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

// ============================================================================
// Server Entry Point
// ============================================================================

/// Build once, then serve with live reload until Ctrl+C.
///
/// Build failures are reported to the browser instead of stopping the
/// server. Failing to bind a socket or register the watch set is fatal.
pub fn serve_site(mut config: SiteConfig, open_browser: bool) -> Result<()> {
    config.debug = true;

    let (hub, hub_thread) = Hub::spawn();
    if let Err(err) = build_site(&config) {
        watch::report(&hub, &err.into());
    }

    let reload_addr = reload::listen(config.reload_addr()?, hub.clone())?;
    log!("reload"; "ws://{reload_addr}{}", reload::ENDPOINT);

    let (signals, watcher) = watch::spawn(config.clone(), hub.clone())?;

    let addr = config.listen_addr()?;
    let server = Server::http(addr).map_err(|err| anyhow!("Failed to bind {addr}: {err}"))?;
    let server = Arc::new(server);

    // Set up Ctrl+C handler for graceful shutdown
    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        signals.send(Signal::Shutdown).ok();
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    let url = config.url();
    log!("serve"; "{url}");
    if open_browser && let Err(err) = open::that(&url) {
        log!("warn"; "failed to open browser: {err}");
    }

    // Handle requests in main thread (blocks until Ctrl+C)
    let serve_root = config.output_dir();
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &serve_root) {
            log!("serve"; "request error: {e:#}");
        }
    }

    watcher.join().map_err(|_| anyhow!("watcher thread panicked"))?;
    hub.shutdown();
    hub_thread.join().map_err(|_| anyhow!("hub thread panicked"))?;
    Ok(())
}

// ============================================================================
// Request Handling
// ============================================================================

/// Handle a single HTTP request.
///
/// Request resolution order:
/// 1. Exact file match → serve file
/// 2. Directory with index.html → serve index.html
/// 3. Nothing found → 404
fn handle_request(request: Request, serve_root: &Path) -> Result<()> {
    match resolve_request(request.url(), serve_root) {
        Some(path) => serve_file(request, &path),
        None => serve_not_found(request),
    }
}

/// Map a request URL to a file under `serve_root`.
fn resolve_request(url: &str, serve_root: &Path) -> Option<PathBuf> {
    // Strip query string (e.g., ?t=123456) before decoding
    let path = url.split(['?', '#']).next().unwrap_or_default();
    // Decode URL-encoded characters (e.g., %20 → space)
    let path = urlencoding::decode(path).ok()?;
    let rel = Path::new(path.trim_start_matches('/'));

    if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
        return None;
    }

    let local_path = serve_root.join(rel);
    if local_path.is_file() {
        return Some(local_path);
    }
    let index_path = local_path.join("index.html");
    index_path.is_file().then_some(index_path)
}

// ============================================================================
// Response Helpers
// ============================================================================

fn header(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value).map_err(|()| anyhow!("invalid header `{value}`"))
}

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let response = Response::from_data(content).with_header(header(guess_content_type(path))?);

    request.respond(response)?;
    Ok(())
}

/// Serve 404 Not Found response.
fn serve_not_found(request: Request) -> Result<()> {
    let response = Response::from_string("404 Not Found")
        .with_status_code(StatusCode(404))
        .with_header(header("text/plain; charset=utf-8")?);
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",

        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("about")).unwrap();
        fs::create_dir_all(root.join("my docs")).unwrap();
        fs::write(root.join("index.html"), "home").unwrap();
        fs::write(root.join("about/index.html"), "about").unwrap();
        fs::write(root.join("my docs/a.txt"), "a").unwrap();
        fs::write(root.join("style.css"), "css").unwrap();
        dir
    }

    #[test]
    fn test_resolve_files_and_directories() {
        let dir = site();
        let root = dir.path();

        assert_eq!(resolve_request("/", root), Some(root.join("index.html")));
        assert_eq!(resolve_request("/about", root), Some(root.join("about/index.html")));
        assert_eq!(resolve_request("/about/", root), Some(root.join("about/index.html")));
        assert_eq!(resolve_request("/style.css?v=3", root), Some(root.join("style.css")));
        assert_eq!(resolve_request("/my%20docs/a.txt", root), Some(root.join("my docs/a.txt")));
    }

    #[test]
    fn test_resolve_missing_and_traversal() {
        let dir = site();
        let root = dir.path().join("about");

        assert_eq!(resolve_request("/nope.html", &root), None);
        assert_eq!(resolve_request("/../index.html", &root), None);
        assert_eq!(resolve_request("/%2e%2e/index.html", &root), None);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("a/index.html")), "text/html; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("style.css")), "text/css; charset=utf-8");
        assert_eq!(guess_content_type(Path::new("logo.svg")), "image/svg+xml");
        assert_eq!(guess_content_type(Path::new("blob")), "application/octet-stream");
    }
}
