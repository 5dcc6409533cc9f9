//! Live-reload socket and the page script that talks to it.
//!
//! The socket has its own listener: each accepted connection is upgraded to
//! a WebSocket on `/hot`, then split in two halves over a cloned
//! `TcpStream`:
//!
//! ```text
//!              ┌── writer ──► Hub (broadcasts)
//! TcpStream ───┤
//!              └── reader ──► session thread: "loaded" / close
//! ```

use crate::hub::{Hub, LOADED, SessionId, Sink};
use crate::log;
use anyhow::{Context, Result};
use std::{
    net::{SocketAddr, TcpListener, TcpStream},
    thread,
};
use tungstenite::{
    Message, WebSocket,
    handshake::server::{ErrorResponse, Request, Response},
    http::StatusCode,
    protocol::Role,
};

/// Path of the reload endpoint.
pub const ENDPOINT: &str = "/hot";

/// Client script; `{port}` is replaced with the socket port.
const SCRIPT: &str = include_str!("embed/reload.js");

// ============================================================================
// Script injection
// ============================================================================

/// Insert the reload script before the last `</body>`, or append it when
/// the document has none.
pub fn inject(html: &str, port: u16) -> String {
    let script = format!("<script>{}</script>", SCRIPT.replace("{port}", &port.to_string()));

    // ASCII lowercasing keeps byte offsets intact
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + script.len());
            out.push_str(&html[..at]);
            out.push_str(&script);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{html}{script}"),
    }
}

// ============================================================================
// Socket listener
// ============================================================================

impl Sink for WebSocket<TcpStream> {
    fn deliver(&mut self, text: &str) -> Result<()> {
        self.send(Message::text(text))?;
        Ok(())
    }
}

/// Bind the reload socket and accept sessions on a background thread.
///
/// Returns the bound address.
pub fn listen(addr: SocketAddr, hub: Hub) -> Result<SocketAddr> {
    let listener =
        TcpListener::bind(addr).with_context(|| format!("Failed to bind reload socket on {addr}"))?;
    let local = listener.local_addr()?;

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let hub = hub.clone();
                    thread::spawn(move || {
                        if let Err(err) = run_session(stream, &hub) {
                            log!("reload"; "{err:#}");
                        }
                    });
                }
                Err(err) => log!("reload"; "accept failed: {err}"),
            }
        }
    });

    Ok(local)
}

/// Upgrade one connection and read from it until it closes.
///
/// Both halves write to the same socket: the hub sends broadcasts, while
/// the reader answers pings and closes on its own. The page script never
/// pings, and a close reply only races with a broadcast on a connection
/// that is going away, so whole frames are not expected to interleave.
fn run_session(stream: TcpStream, hub: &Hub) -> Result<()> {
    let writer = stream.try_clone().context("Failed to clone reload socket")?;

    let mut reader = match tungstenite::accept_hdr(stream, check_path) {
        Ok(ws) => ws,
        // wrong path or not a WebSocket request; the client already got its answer
        Err(_) => return Ok(()),
    };
    let id = hub.register(WebSocket::from_raw_socket(writer, Role::Server, None));

    read_loop(&mut reader, id, hub);
    hub.deregister(id);
    Ok(())
}

fn read_loop(reader: &mut WebSocket<TcpStream>, id: SessionId, hub: &Hub) {
    loop {
        match reader.read() {
            Ok(Message::Text(text)) if text.as_str() == LOADED => hub.loaded(id),
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

/// Handshake callback: only [`ENDPOINT`] is upgraded.
fn check_path(request: &Request, response: Response) -> Result<Response, ErrorResponse> {
    if request.uri().path() == ENDPOINT {
        return Ok(response);
    }
    let mut denied = ErrorResponse::new(Some("not found".to_string()));
    *denied.status_mut() = StatusCode::NOT_FOUND;
    Err(denied)
}
