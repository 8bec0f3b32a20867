//! Shared transport engine
//!
//! `TransportCore` owns the two things every concrete transport needs and
//! none should reimplement: the connection-state tracker with
//! change-only notification, and the framed ingest path from raw inbound
//! text to listener callbacks. Concrete transports embed one and keep only
//! their raw I/O.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::communication::framing::MessageFramer;
use crate::communication::{ConnectionState, TransportListener};

/// State tracking and framed message dispatch shared by all transports.
///
/// Thread safety: the framing buffer is serialized behind its own mutex, so
/// overlapping I/O completions cannot interleave extraction. Listener
/// callbacks are invoked without holding any internal lock, so a listener
/// may call back into the transport.
pub struct TransportCore {
    name: String,
    state: RwLock<ConnectionState>,
    framer: Mutex<MessageFramer>,
    listener: RwLock<Option<Arc<dyn TransportListener>>>,
}

impl TransportCore {
    /// Create a core for the transport `name` (used in trace output only).
    pub fn new(name: impl Into<String>, framer: MessageFramer) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(ConnectionState::NotConnected),
            framer: Mutex::new(framer),
            listener: RwLock::new(None),
        }
    }

    /// The transport name used in trace output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Transition to `new_state`, notifying the listener only on an actual
    /// change. The owning transport is the only caller.
    pub fn set_state(&self, new_state: ConnectionState) {
        {
            let mut guard = self.state.write();
            if *guard == new_state {
                return;
            }
            tracing::debug!("{}: {} -> {}", self.name, *guard, new_state);
            *guard = new_state;
        }

        // Clone out of the slot and drop the guard before the callback, so
        // the listener may call back into the transport.
        let listener = self.listener.read().clone();
        match listener {
            Some(listener) => listener.on_connection_state(new_state),
            None => tracing::debug!("{}: state change with no listener installed", self.name),
        }
    }

    /// Feed raw inbound text through the framer, emitting each complete
    /// message to the listener. Empty chunks are ignored.
    pub fn ingest(&self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }

        let messages = self.framer.lock().push(chunk);
        if messages.is_empty() {
            return;
        }

        let listener = self.listener.read().clone();
        match listener {
            Some(listener) => {
                for message in &messages {
                    listener.on_message(message);
                }
            }
            None => tracing::debug!(
                "{}: dropping {} framed message(s), no listener installed",
                self.name,
                messages.len()
            ),
        }
    }

    /// Discard any partially-framed inbound data.
    pub fn reset_framer(&self) {
        self.framer.lock().clear();
    }

    /// Install or clear the single event listener.
    pub fn set_listener(&self, listener: Option<Arc<dyn TransportListener>>) {
        *self.listener.write() = listener;
    }
}

impl std::fmt::Debug for TransportCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportCore")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
