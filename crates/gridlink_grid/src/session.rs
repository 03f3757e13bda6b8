use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use gridlink_core::{Connection, QueryRequest, QueryResult, Value};
use uuid::Uuid;

pub type EditorId = Uuid;

/// Identifies one lookup session: the editor it feeds and which of that
/// editor's sessions it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionTicket {
    pub editor: EditorId,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Succeeded | SessionState::Failed)
    }
}

#[derive(Debug)]
pub enum SessionEvent {
    AboutToLoad,
    Succeeded(QueryResult),
    Failed(String),
}

#[derive(Debug)]
pub struct SessionMessage {
    pub ticket: SessionTicket,
    pub event: SessionEvent,
}

/// Statement and caps for one lookup execution.
#[derive(Debug, Clone)]
pub struct LookupQuery {
    pub sql: String,
    pub row_limit: u64,
    pub cell_length_limit: usize,
}

/// Receives session lifecycle events on the thread that drains the hub.
pub trait SessionListener {
    fn on_about_to_load(&mut self, ticket: SessionTicket);

    fn on_succeeded(&mut self, ticket: SessionTicket, result: QueryResult);

    fn on_failed(&mut self, ticket: SessionTicket, message: String);
}

pub fn dispatch(listener: &mut dyn SessionListener, message: SessionMessage) {
    let ticket = message.ticket;
    match message.event {
        SessionEvent::AboutToLoad => listener.on_about_to_load(ticket),
        SessionEvent::Succeeded(result) => listener.on_succeeded(ticket, result),
        SessionEvent::Failed(error) => listener.on_failed(ticket, error),
    }
}

/// One in-flight lookup query.
///
/// A session is submitted at most once. `finish` moves it to a terminal
/// state exactly once; later calls report `false` so duplicate terminal
/// events can be discarded.
#[derive(Debug)]
pub struct QuerySession {
    ticket: SessionTicket,
    state: SessionState,
}

impl QuerySession {
    pub fn new(ticket: SessionTicket) -> Self {
        Self {
            ticket,
            state: SessionState::Idle,
        }
    }

    pub fn ticket(&self) -> SessionTicket {
        self.ticket
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Queues `AboutToLoad` and runs `query` on a worker thread, which later
    /// sends exactly one terminal event on `events`.
    pub fn submit(
        &mut self,
        db: Arc<dyn Connection>,
        query: LookupQuery,
        events: &Sender<SessionMessage>,
    ) -> bool {
        if self.state != SessionState::Idle {
            log::warn!(
                "Lookup session {} already submitted, ignoring resubmission",
                self.ticket.editor
            );
            return false;
        }

        self.state = SessionState::Loading;
        let ticket = self.ticket;

        let _ = events.send(SessionMessage {
            ticket,
            event: SessionEvent::AboutToLoad,
        });

        let sender = events.clone();
        let spawned = thread::Builder::new()
            .name("fk-lookup".to_string())
            .spawn(move || {
                let event = run_lookup(db.as_ref(), &query);
                let _ = sender.send(SessionMessage { ticket, event });
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn lookup worker: {}", e);
            let _ = events.send(SessionMessage {
                ticket,
                event: SessionEvent::Failed(e.to_string()),
            });
        }

        true
    }

    /// Moves a loading session to its terminal state. Returns `false` if it
    /// was not loading.
    pub fn finish(&mut self, succeeded: bool) -> bool {
        if self.state != SessionState::Loading {
            return false;
        }

        self.state = if succeeded {
            SessionState::Succeeded
        } else {
            SessionState::Failed
        };
        true
    }
}

fn run_lookup(db: &dyn Connection, query: &LookupQuery) -> SessionEvent {
    let limit = u32::try_from(query.row_limit).unwrap_or(u32::MAX);
    let request = QueryRequest::new(query.sql.as_str()).with_limit(limit);
    let started = Instant::now();

    match db.execute(&request) {
        Ok(mut result) => {
            result.rows.truncate(usize::try_from(query.row_limit).unwrap_or(usize::MAX));
            for row in &mut result.rows {
                for value in row.iter_mut() {
                    let taken = std::mem::replace(value, Value::Null);
                    *value = taken.truncated(query.cell_length_limit);
                }
            }

            log::info!(
                "Lookup loaded {} rows in {:.2?}",
                result.row_count(),
                started.elapsed()
            );
            SessionEvent::Succeeded(result)
        }
        Err(e) => {
            log::warn!("Lookup query failed: {}", e);
            SessionEvent::Failed(e.detail())
        }
    }
}

/// Channel shared by every session of one controller.
pub struct SessionHub {
    sender: Sender<SessionMessage>,
    receiver: Receiver<SessionMessage>,
}

impl SessionHub {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> &Sender<SessionMessage> {
        &self.sender
    }

    /// Everything queued right now, without blocking.
    pub fn drain(&self) -> Vec<SessionMessage> {
        self.receiver.try_iter().collect()
    }

    /// Blocks for the next message until `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Option<SessionMessage> {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}
