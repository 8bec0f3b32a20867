//! # AVKit Communication
//!
//! Device communication layer for AVKit. Supports Serial/RS-232 and TCP/IP
//! connections to AV devices, with delimiter-based response framing, a
//! queueing decorator for command pacing, and a reconnection watchdog.

pub mod communication;

pub use communication::{
    engine::TransportCore,
    framing::{MessageFramer, MessagePreprocessor},
    queued::{PacingMode, QueuedTransport, QueuedTransportConfig},
    scheduler::ScheduledTask,
    serial::{list_ports, SerialParity, SerialPortInfo, SerialTransport, SerialTransportConfig},
    tcp::{TcpTransport, TcpTransportConfig},
    watchdog::{ConnectionWatchdog, ConnectionWatchdogConfig},
    Connectable, ConnectionState, NoOpTransport, TextEncoding, Transport, TransportListener,
};
