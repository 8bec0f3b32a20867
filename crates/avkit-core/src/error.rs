//! Error handling for AVKit
//!
//! Provides error types for the device-communication layers:
//! - Connection errors (port, host, and link-level failures)
//! - Transport errors (framing, send, and usage failures)
//!
//! All error types use `thiserror` for ergonomic error handling. Runtime
//! failures inside the transport engine are absorbed and traced rather than
//! propagated; these types surface at construction time and at the
//! port-enumeration boundary.

use thiserror::Error;

/// Connection error type
///
/// Represents errors related to establishing or holding a link to an AV
/// device over serial, TCP, or any other medium.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Port not found
    #[error("Port not found: {port}")]
    PortNotFound {
        /// The name of the port that was not found.
        port: String,
    },

    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Connection timeout
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Connection lost
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// Invalid hostname/IP
    #[error("Invalid hostname: {hostname}")]
    InvalidHostname {
        /// The invalid hostname or IP address.
        hostname: String,
    },

    /// TCP connection error
    #[error("TCP connection error: {reason}")]
    TcpError {
        /// The reason for the TCP error.
        reason: String,
    },

    /// Serial port error
    #[error("Serial port error: {reason}")]
    SerialError {
        /// The reason for the serial port error.
        reason: String,
    },

    /// Invalid connection parameters
    #[error("Invalid connection parameters: {reason}")]
    InvalidParameters {
        /// The reason the parameters are invalid.
        reason: String,
    },

    /// Generic connection error
    #[error("Connection error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

/// Transport error type
///
/// Represents errors raised by the transport engine itself: framing,
/// pacing-queue usage, and configuration problems.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Transport is not connected
    #[error("Transport not connected")]
    NotConnected,

    /// A send was rejected by the transport
    #[error("Send rejected: {reason}")]
    SendRejected {
        /// The reason the send was rejected.
        reason: String,
    },

    /// Response framing failed and the buffer was discarded
    #[error("Framing error: {reason}")]
    Framing {
        /// The reason framing failed.
        reason: String,
    },

    /// Invalid transport or queue configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// An operation was called in a mode that does not support it
    #[error("Usage error: {reason}")]
    Usage {
        /// The reason the call is a usage error.
        reason: String,
    },

    /// Generic transport error
    #[error("Transport error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

/// Main error type for AVKit
///
/// A unified error type that can represent any error from the communication
/// layers. This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Connection(ConnectionError::ConnectionTimeout { .. })
        )
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a transport error
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_predicates() {
        let err: Error = ConnectionError::ConnectionTimeout { timeout_ms: 500 }.into();
        assert!(err.is_timeout());
        assert!(err.is_connection_error());
        assert!(!err.is_transport_error());

        let err: Error = TransportError::NotConnected.into();
        assert!(err.is_transport_error());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_error_display() {
        let err: Error = ConnectionError::FailedToOpen {
            port: "/dev/ttyUSB0".to_string(),
            reason: "busy".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Failed to open port /dev/ttyUSB0: busy");

        let err = Error::other("something went wrong");
        assert_eq!(err.to_string(), "something went wrong");

        let err: Error = TransportError::Usage {
            reason: "advance_queue called in DelayInterval mode".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Usage error: advance_queue called in DelayInterval mode"
        );

        let err: Error = TransportError::SendRejected {
            reason: "inner transport refused queue head".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Send rejected: inner transport refused queue head"
        );
    }
}
