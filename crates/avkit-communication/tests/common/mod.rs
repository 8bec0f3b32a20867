#![allow(dead_code)]

use avkit_communication::{Connectable, ConnectionState, Transport, TransportListener};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Mock transport for testing decorators and the watchdog.
///
/// Records every accepted send with a timestamp, counts connect calls, and
/// lets tests drive state transitions and inject inbound messages as if a
/// device had answered.
pub struct MockTransport {
    state: Mutex<ConnectionState>,
    listener: Mutex<Option<Arc<dyn TransportListener>>>,
    sent: Mutex<Vec<(String, Instant)>>,
    accept_sends: AtomicBool,
    connect_calls: AtomicUsize,
    // When set, connect() transitions straight to Connected like a
    // synchronous medium; when clear, the mock stays NotConnected so tests
    // can observe repeated reconnect attempts.
    connects_synchronously: bool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ConnectionState::NotConnected),
            listener: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            accept_sends: AtomicBool::new(true),
            connect_calls: AtomicUsize::new(0),
            connects_synchronously: true,
        })
    }

    /// A mock whose connect() never succeeds.
    pub fn new_unconnectable() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ConnectionState::NotConnected),
            listener: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            accept_sends: AtomicBool::new(true),
            connect_calls: AtomicUsize::new(0),
            connects_synchronously: false,
        })
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn sent_with_times(&self) -> Vec<(String, Instant)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn set_accept_sends(&self, accept: bool) {
        self.accept_sends.store(accept, Ordering::SeqCst);
    }

    /// Drive a state transition, notifying the installed listener the way a
    /// real transport would.
    pub fn set_state(&self, new_state: ConnectionState) {
        {
            let mut state = self.state.lock().unwrap();
            if *state == new_state {
                return;
            }
            *state = new_state;
        }
        // Lock released before the callback, same as real transports.
        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener.on_connection_state(new_state);
        }
    }

    /// Deliver an inbound message to the installed listener, as if the
    /// device had answered and the framer extracted it.
    pub fn inject_message(&self, message: &str) {
        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener.on_message(message);
        }
    }
}

impl Connectable for MockTransport {
    fn connection_state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    fn connect(&self) {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.connects_synchronously {
            self.set_state(ConnectionState::Connected);
        }
    }
}

impl Transport for MockTransport {
    fn disconnect(&self) {
        self.set_state(ConnectionState::NotConnected);
    }

    fn send(&self, message: &str) -> bool {
        if !self.accept_sends.load(Ordering::SeqCst) {
            return false;
        }
        self.sent
            .lock()
            .unwrap()
            .push((message.to_string(), Instant::now()));
        true
    }

    fn set_listener(&self, listener: Option<Arc<dyn TransportListener>>) {
        *self.listener.lock().unwrap() = listener;
    }
}

/// Listener that records everything it observes.
#[derive(Default)]
pub struct RecordingListener {
    pub states: Mutex<Vec<ConnectionState>>,
    pub messages: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn states(&self) -> Vec<ConnectionState> {
        self.states.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl TransportListener for RecordingListener {
    fn on_connection_state(&self, state: ConnectionState) {
        self.states.lock().unwrap().push(state);
    }

    fn on_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
