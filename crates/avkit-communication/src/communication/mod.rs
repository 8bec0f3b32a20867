//! Transport abstractions for AV device communication
//!
//! Every concrete transport (serial, TCP, or anything else that can move
//! text to a device) presents the same contract: connect, disconnect, send,
//! plus two observable events — connection-state changes and extracted
//! inbound messages. Decorators such as [`QueuedTransport`] implement the
//! same contract so they substitute anywhere a transport is expected.
//!
//! [`QueuedTransport`]: crate::communication::queued::QueuedTransport

pub mod engine;
pub mod framing;
pub mod queued;
pub mod scheduler;
pub mod serial;
pub mod tcp;
pub mod watchdog;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::communication::engine::TransportCore;
use crate::communication::framing::MessageFramer;

/// Connection state of a transport.
///
/// Transitions are reported through [`TransportListener::on_connection_state`]
/// and only on an actual change; setting the same state twice produces no
/// notification. Only the owning transport mutates its own state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No link to the device.
    #[default]
    NotConnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The link is up and sends are possible.
    Connected,
    /// An orderly teardown is in progress. Synchronous media may skip this
    /// state and drop straight to `NotConnected`.
    Disconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::NotConnected => write!(f, "Not Connected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Byte-to-text codec applied at the transport boundary.
///
/// AV devices are overwhelmingly ASCII, but a few speak 8-bit legacy
/// encodings. The engine works on `str`; concrete transports decode inbound
/// bytes and encode outbound messages with their configured codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    /// UTF-8, decoded lossily (invalid sequences become U+FFFD).
    #[default]
    Utf8,
    /// ISO-8859-1; every byte maps to the code point of the same value.
    Latin1,
}

impl TextEncoding {
    /// Decode inbound bytes to text.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }

    /// Encode outbound text to bytes. Characters outside Latin-1 are
    /// replaced with `?` in `Latin1` mode.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
                .collect(),
        }
    }
}

/// The minimal capability needed for reconnection monitoring: read the
/// connection state and ask for a connection.
///
/// [`ConnectionWatchdog`] consumes this rather than the full [`Transport`]
/// contract so that non-transport components can also be monitored.
///
/// [`ConnectionWatchdog`]: crate::communication::watchdog::ConnectionWatchdog
pub trait Connectable: Send + Sync {
    /// Current connection state.
    fn connection_state(&self) -> ConnectionState;

    /// Request a connection. Success or failure is reported through the
    /// transport's state notifications, not a return value, because the
    /// attempt may be asynchronous.
    fn connect(&self);
}

/// The transport capability contract.
///
/// Implemented by every concrete transport and by decorators. `send` returns
/// whether the message was *accepted for sending*, not whether the device
/// received it — delivery guarantees end at the transport boundary.
pub trait Transport: Connectable {
    /// Request an orderly teardown of the link.
    fn disconnect(&self);

    /// Submit text for transmission. Returns `true` if the transport
    /// accepted the message.
    fn send(&self, message: &str) -> bool;

    /// Install or clear the single event listener. Transports carry one
    /// listener slot by design; installing a listener replaces any previous
    /// one.
    fn set_listener(&self, listener: Option<Arc<dyn TransportListener>>);
}

/// Listener for transport events.
///
/// Implement this trait to receive connection-state changes and extracted
/// inbound messages. All methods default to no-ops.
pub trait TransportListener: Send + Sync {
    /// Called when the connection state changes (only on actual change).
    fn on_connection_state(&self, _state: ConnectionState) {}

    /// Called for each message extracted by the framing engine.
    fn on_message(&self, _message: &str) {}
}

/// A transport that accepts everything and talks to nothing.
///
/// Useful as a placeholder before a real transport is configured, and as a
/// harmless default target for a [`queued::QueuedTransport`] swap.
pub struct NoOpTransport {
    core: TransportCore,
}

impl NoOpTransport {
    /// Create a new no-op transport.
    pub fn new() -> Self {
        Self {
            core: TransportCore::new("noop", MessageFramer::new("")),
        }
    }
}

impl Default for NoOpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectable for NoOpTransport {
    fn connection_state(&self) -> ConnectionState {
        self.core.state()
    }

    fn connect(&self) {
        self.core.set_state(ConnectionState::Connected);
    }
}

impl Transport for NoOpTransport {
    fn disconnect(&self) {
        self.core.set_state(ConnectionState::NotConnected);
    }

    fn send(&self, message: &str) -> bool {
        tracing::trace!("NoOpTransport discarding {} bytes", message.len());
        true
    }

    fn set_listener(&self, listener: Option<Arc<dyn TransportListener>>) {
        self.core.set_listener(listener);
    }
}
