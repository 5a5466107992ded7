use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::auth::identity::SessionOperation;
use crate::error::ErrorCode;

pub const SESSION_EVENT_CAPACITY: usize = 64;
pub const SESSION_EVENT_HISTORY: usize = 32;

/// Lifecycle events emitted by the session controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEventKind {
    /// Startup restore finished
    Restored {
        authenticated: bool,
    },

    /// A stored record existed but could not be used
    RestoreDegraded {
        reason: String,
    },

    SignedIn {
        operation: SessionOperation,
        identity_id: String,
    },

    SignInFailed {
        operation: SessionOperation,
        code: ErrorCode,
    },

    SignedOut,

    /// An operation was abandoned before completing and the session reset
    Interrupted {
        operation: SessionOperation,
    },
}

/// A session event with the time it was emitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast stream of session events with a short replay history
#[derive(Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
    history: Arc<Mutex<VecDeque<SessionEvent>>>,
    history_size: usize,
}

impl SessionEvents {
    pub fn new(capacity: usize, history_size: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            history: Arc::new(Mutex::new(VecDeque::with_capacity(history_size))),
            history_size,
        }
    }

    /// Receive events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        debug!("New subscriber registered to session events");
        self.sender.subscribe()
    }

    /// Publish an event; returns the number of live receivers
    pub fn publish(&self, kind: SessionEventKind) -> usize {
        let event = SessionEvent::new(kind);

        {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            history.push_back(event.clone());
            while history.len() > self.history_size {
                history.pop_front();
            }
        }

        // No receivers is not an error: the event is still in the history
        let receivers = self.sender.send(event).unwrap_or(0);
        trace!(receivers, "Session event published");
        receivers
    }

    /// Most recent events, oldest first
    pub fn recent(&self) -> Vec<SessionEvent> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Kinds of the most recent events, oldest first
    pub fn recent_kinds(&self) -> Vec<SessionEventKind> {
        self.recent().into_iter().map(|event| event.kind).collect()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(SESSION_EVENT_CAPACITY, SESSION_EVENT_HISTORY)
    }
}
