//! Live-reload session hub.
//!
//! A single thread owns every connected browser session and is reached only
//! through a command channel, so the session set needs no lock:
//!
//! ```text
//! reload listener ──Register/Loaded/Deregister──┐
//!                                               ▼
//! watcher ─────────────Broadcast────────────► hub thread ──► sinks
//! ```
//!
//! A session only receives broadcasts after its page has answered with
//! `loaded`, so a tab that is still navigating never gets a reload meant
//! for the page it is leaving. The latest build failure is remembered and
//! delivered to each session as it acknowledges, so a tab opened while the
//! build is broken still shows the error overlay.

use crate::log;
use rustc_hash::FxHashMap;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

pub type SessionId = u64;

/// Wire text that asks a page to reload.
pub const RELOAD: &str = "reload";

/// Wire text a page sends once its listener is attached.
pub const LOADED: &str = "loaded";

/// Outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Build succeeded; reload the page
    Reload,
    /// Build failed; show this text in the overlay
    Error(String),
}

impl Notice {
    pub fn as_text(&self) -> &str {
        match self {
            Self::Reload => RELOAD,
            Self::Error(text) => text,
        }
    }
}

/// Write half of a session.
pub trait Sink: Send {
    /// Deliver one text message. An error means the connection is dead.
    fn deliver(&mut self, text: &str) -> anyhow::Result<()>;
}

enum Command {
    Register(SessionId, Box<dyn Sink>),
    Loaded(SessionId),
    Deregister(SessionId),
    Broadcast(Notice),
    Sessions(Sender<Vec<SessionId>>),
    Shutdown,
}

/// Handle to the hub thread. Cheap to clone.
#[derive(Clone)]
pub struct Hub {
    tx: Sender<Command>,
    next_id: Arc<AtomicU64>,
}

impl Hub {
    /// Start the hub thread.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || State::default().run(rx));
        let hub = Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (hub, handle)
    }

    /// Add a session. It receives nothing until [`Hub::loaded`].
    pub fn register(&self, sink: impl Sink + 'static) -> SessionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.send(Command::Register(id, Box::new(sink)));
        id
    }

    /// Mark a session as ready for broadcasts.
    pub fn loaded(&self, id: SessionId) {
        self.send(Command::Loaded(id));
    }

    pub fn deregister(&self, id: SessionId) {
        self.send(Command::Deregister(id));
    }

    pub fn broadcast(&self, notice: Notice) {
        self.send(Command::Broadcast(notice));
    }

    /// Ids of the live sessions, sorted. Empty once the hub has stopped.
    pub fn sessions(&self) -> Vec<SessionId> {
        let (tx, rx) = mpsc::channel();
        self.send(Command::Sessions(tx));
        rx.recv().unwrap_or_default()
    }

    /// Stop the hub thread, dropping every session.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    fn send(&self, command: Command) {
        // a stopped hub has no sessions left to notify
        self.tx.send(command).ok();
    }
}

struct Session {
    sink: Box<dyn Sink>,
    loaded: bool,
}

#[derive(Default)]
struct State {
    sessions: FxHashMap<SessionId, Session>,
    /// Error text of the latest build, cleared by the next success
    failure: Option<String>,
}

impl State {
    fn run(mut self, rx: Receiver<Command>) {
        for command in rx {
            match command {
                Command::Register(id, sink) => {
                    self.sessions.insert(id, Session { sink, loaded: false });
                }
                Command::Loaded(id) => self.acknowledge(id),
                Command::Deregister(id) => {
                    self.sessions.remove(&id);
                }
                Command::Broadcast(notice) => self.broadcast(&notice),
                Command::Sessions(reply) => {
                    let mut ids: Vec<_> = self.sessions.keys().copied().collect();
                    ids.sort_unstable();
                    reply.send(ids).ok();
                }
                Command::Shutdown => break,
            }
        }
    }

    fn acknowledge(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        session.loaded = true;

        if let Some(text) = &self.failure
            && let Err(err) = session.sink.deliver(text)
        {
            log!("reload"; "dropping session {id}: {err:#}");
            self.sessions.remove(&id);
        }
    }

    /// Deliver to every acknowledged session, dropping those whose write
    /// fails.
    fn broadcast(&mut self, notice: &Notice) {
        self.failure = match notice {
            Notice::Reload => None,
            Notice::Error(text) => Some(text.clone()),
        };

        let text = notice.as_text();
        self.sessions.retain(|id, session| {
            if !session.loaded {
                return true;
            }
            match session.sink.deliver(text) {
                Ok(()) => true,
                Err(err) => {
                    log!("reload"; "dropping session {id}: {err:#}");
                    false
                }
            }
        });
    }
}
