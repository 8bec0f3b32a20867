//! TCP transport
//!
//! Most networked AV devices (displays, matrix switchers, codecs) expose a
//! plain TCP control port. `TcpTransport` drives one: an async connect with
//! timeout, a reader task that decodes inbound bytes and feeds the framing
//! engine, and a writer task that drains an outbound channel.

use avkit_core::{thread_safe, ConnectionError, Result, ThreadSafe, TransportError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::communication::engine::TransportCore;
use crate::communication::framing::MessageFramer;
use crate::communication::{ConnectionState, Connectable, TextEncoding, Transport, TransportListener};

/// Configuration for a [`TcpTransport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpTransportConfig {
    /// Device hostname or IP address.
    pub host: String,
    /// Device control port.
    pub port: u16,
    /// Response delimiter; empty disables framing.
    pub delimiter: String,
    /// Byte-to-text codec for this device.
    pub encoding: TextEncoding,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl TcpTransportConfig {
    /// Create a configuration with the default `"\r\n"` delimiter, UTF-8
    /// encoding, and a 5 second connect timeout.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            delimiter: "\r\n".to_string(),
            encoding: TextEncoding::default(),
            connect_timeout_ms: 5000,
        }
    }

    /// Set the response delimiter.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Set the byte-to-text codec.
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }
}

/// Live socket resources: the outbound channel and the spawned tasks.
struct TcpIo {
    outbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    tasks: Vec<JoinHandle<()>>,
}

/// A [`Transport`] over a TCP control connection.
///
/// Connection failures never surface as errors to callers; they are traced
/// and reported as a transition back to `NotConnected`, and recovery is left
/// to the caller or a watchdog.
pub struct TcpTransport {
    core: Arc<TransportCore>,
    config: TcpTransportConfig,
    io: ThreadSafe<TcpIo>,
}

impl TcpTransport {
    /// Create a transport for the device at `config.host:config.port`.
    pub fn new(config: TcpTransportConfig) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(ConnectionError::InvalidHostname {
                hostname: config.host.clone(),
            }
            .into());
        }
        if config.port == 0 {
            return Err(ConnectionError::InvalidParameters {
                reason: "port must be non-zero".to_string(),
            }
            .into());
        }

        let name = format!("tcp:{}:{}", config.host, config.port);
        let framer = MessageFramer::new(config.delimiter.clone());
        Ok(Self {
            core: Arc::new(TransportCore::new(name, framer)),
            config,
            io: thread_safe(TcpIo {
                outbound: None,
                tasks: Vec::new(),
            }),
        })
    }
}

impl Connectable for TcpTransport {
    fn connection_state(&self) -> ConnectionState {
        self.core.state()
    }

    fn connect(&self) {
        if self.core.state() != ConnectionState::NotConnected {
            tracing::debug!(
                "{}: connect ignored while {}",
                self.core.name(),
                self.core.state()
            );
            return;
        }
        self.core.set_state(ConnectionState::Connecting);
        self.core.reset_framer();

        let core = self.core.clone();
        let io = self.io.clone();
        let config = self.config.clone();
        let handle = tokio::spawn(async move {
            let addr = format!("{}:{}", config.host, config.port);
            let attempt = tokio::time::timeout(
                Duration::from_millis(config.connect_timeout_ms),
                TcpStream::connect(&addr),
            )
            .await;

            let stream = match attempt {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    tracing::error!(
                        "{}: {}",
                        core.name(),
                        ConnectionError::TcpError {
                            reason: e.to_string(),
                        }
                    );
                    core.set_state(ConnectionState::NotConnected);
                    return;
                }
                Err(_) => {
                    tracing::error!(
                        "{}: {}",
                        core.name(),
                        ConnectionError::ConnectionTimeout {
                            timeout_ms: config.connect_timeout_ms,
                        }
                    );
                    core.set_state(ConnectionState::NotConnected);
                    return;
                }
            };

            let (mut read_half, mut write_half) = stream.into_split();
            let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

            let writer_core = core.clone();
            let writer = tokio::spawn(async move {
                while let Some(data) = rx.recv().await {
                    if let Err(e) = write_half.write_all(&data).await {
                        tracing::error!("{}: write failed: {}", writer_core.name(), e);
                        break;
                    }
                }
            });

            let reader_core = core.clone();
            let reader_io = io.clone();
            let encoding = config.encoding;
            let reader = tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                loop {
                    match read_half.read(&mut buf).await {
                        Ok(0) => {
                            tracing::debug!(
                                "{}: {}",
                                reader_core.name(),
                                ConnectionError::ConnectionLost {
                                    reason: "closed by remote".to_string(),
                                }
                            );
                            break;
                        }
                        Ok(n) => reader_core.ingest(&encoding.decode(&buf[..n])),
                        Err(e) => {
                            tracing::error!(
                                "{}: {}",
                                reader_core.name(),
                                ConnectionError::ConnectionLost {
                                    reason: e.to_string(),
                                }
                            );
                            break;
                        }
                    }
                }
                reader_io.lock().outbound = None;
                reader_core.set_state(ConnectionState::NotConnected);
            });

            {
                let mut guard = io.lock();
                guard.outbound = Some(tx);
                guard.tasks.push(writer);
                guard.tasks.push(reader);
            }
            core.set_state(ConnectionState::Connected);
        });
        self.io.lock().tasks.push(handle);
    }
}

impl Transport for TcpTransport {
    fn disconnect(&self) {
        if self.core.state() == ConnectionState::NotConnected {
            return;
        }
        self.core.set_state(ConnectionState::Disconnecting);
        {
            let mut guard = self.io.lock();
            guard.outbound = None;
            for task in guard.tasks.drain(..) {
                task.abort();
            }
        }
        self.core.set_state(ConnectionState::NotConnected);
    }

    fn send(&self, message: &str) -> bool {
        if self.core.state() != ConnectionState::Connected {
            tracing::debug!("{}: {}, rejecting send", self.core.name(), TransportError::NotConnected);
            return false;
        }
        let guard = self.io.lock();
        match &guard.outbound {
            Some(tx) => tx.send(self.config.encoding.encode(message)).is_ok(),
            None => false,
        }
    }

    fn set_listener(&self, listener: Option<Arc<dyn TransportListener>>) {
        self.core.set_listener(listener);
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}
