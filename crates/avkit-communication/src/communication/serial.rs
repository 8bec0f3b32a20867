//! Serial transport
//!
//! RS-232 is still the lingua franca of AV control: projectors, matrix
//! switchers, and legacy displays all take commands over a serial line,
//! either on an onboard port or through a USB adapter.
//!
//! Provides:
//! - Port enumeration and discovery
//! - Baud rate, parity, and stop-bit configuration
//! - A [`Transport`] implementation with a background reader thread

use avkit_core::{thread_safe, ConnectionError, Error, Result, ThreadSafe, TransportError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::communication::engine::TransportCore;
use crate::communication::framing::MessageFramer;
use crate::communication::{Connectable, ConnectionState, TextEncoding, Transport, TransportListener};

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// Serial number if available
    pub serial_number: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            serial_number: None,
            vid: None,
            pid: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set serial number
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Set USB IDs
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }
}

/// List serial ports suitable for device control
///
/// Filters enumeration to control-port patterns:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyS*, /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    match serialport::available_ports() {
        Ok(ports) => {
            let port_infos: Vec<SerialPortInfo> = ports
                .iter()
                .filter(|port| is_control_port(&port.port_name))
                .map(|port| {
                    let info = SerialPortInfo::new(&port.port_name, port_description(port));

                    match &port.port_type {
                        serialport::SerialPortType::UsbPort(usb_info) => {
                            let mut info = info.with_usb_ids(usb_info.vid, usb_info.pid);
                            if let Some(ref mfg) = usb_info.manufacturer {
                                info = info.with_manufacturer(mfg);
                            }
                            if let Some(ref serial) = usb_info.serial_number {
                                info = info.with_serial_number(serial);
                            }
                            info
                        }
                        _ => info,
                    }
                })
                .collect();

            Ok(port_infos)
        }
        Err(e) => {
            tracing::error!("Failed to enumerate serial ports: {}", e);
            Err(Error::other(format!("Failed to enumerate ports: {}", e)))
        }
    }
}

/// Check if a port name matches device control port patterns
///
/// Onboard RS-232 ports (/dev/ttyS*) are included alongside USB adapters;
/// many AV racks still run native serial.
fn is_control_port(port_name: &str) -> bool {
    // Windows COM ports
    if port_name.starts_with("COM") && port_name[3..].chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    // Linux onboard, USB, and ACM devices
    if port_name.starts_with("/dev/ttyS")
        || port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
    {
        return true;
    }

    // macOS serial and modem devices
    if port_name.starts_with("/dev/cu.usbserial-") || port_name.starts_with("/dev/cu.usbmodem") {
        return true;
    }

    false
}

/// Get a user-friendly description for a port
fn port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Serial parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SerialParity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

fn to_serialport_parity(parity: SerialParity) -> serialport::Parity {
    match parity {
        SerialParity::None => serialport::Parity::None,
        SerialParity::Even => serialport::Parity::Even,
        SerialParity::Odd => serialport::Parity::Odd,
    }
}

/// Configuration for a [`SerialTransport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialTransportConfig {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3").
    pub port: String,
    /// Baud rate. 9600 is the near-universal AV default.
    pub baud_rate: u32,
    /// Data bits (5-8).
    pub data_bits: u8,
    /// Stop bits (1-2).
    pub stop_bits: u8,
    /// Parity setting.
    pub parity: SerialParity,
    /// Hardware flow control.
    pub flow_control: bool,
    /// Response delimiter; empty disables framing.
    pub delimiter: String,
    /// Byte-to-text codec for this device.
    pub encoding: TextEncoding,
}

impl SerialTransportConfig {
    /// Create a 9600-8-N-1 configuration with a `"\r"` delimiter.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
            flow_control: false,
            delimiter: "\r".to_string(),
            encoding: TextEncoding::default(),
        }
    }

    /// Set the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the response delimiter.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(ConnectionError::InvalidParameters {
                reason: "port name must not be empty".to_string(),
            }
            .into());
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(ConnectionError::InvalidParameters {
                reason: format!("invalid data bits: {}", self.data_bits),
            }
            .into());
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(ConnectionError::InvalidParameters {
                reason: format!("invalid stop bits: {}", self.stop_bits),
            }
            .into());
        }
        Ok(())
    }
}

/// Live port resources: the writer handle, the reader thread, and its
/// shutdown flag.
struct SerialIo {
    writer: Option<Box<dyn serialport::SerialPort>>,
    reader: Option<std::thread::JoinHandle<()>>,
    shutdown: Option<Arc<AtomicBool>>,
}

/// A [`Transport`] over a local serial port.
///
/// Serial open/close is synchronous, so `connect` resolves before it
/// returns and the `Disconnecting` state is skipped on teardown. A
/// background thread owns the blocking reads and feeds the framing engine.
pub struct SerialTransport {
    core: Arc<TransportCore>,
    config: SerialTransportConfig,
    io: ThreadSafe<SerialIo>,
}

impl SerialTransport {
    /// Create a transport for the port in `config`.
    pub fn new(config: SerialTransportConfig) -> Result<Self> {
        config.validate()?;
        let name = format!("serial:{}", config.port);
        let framer = MessageFramer::new(config.delimiter.clone());
        Ok(Self {
            core: Arc::new(TransportCore::new(name, framer)),
            config,
            io: thread_safe(SerialIo {
                writer: None,
                reader: None,
                shutdown: None,
            }),
        })
    }

    fn open_port(&self) -> Result<Box<dyn serialport::SerialPort>> {
        let builder = serialport::new(&self.config.port, self.config.baud_rate)
            .timeout(Duration::from_millis(10)) // Short timeout keeps the reader responsive
            .data_bits(match self.config.data_bits {
                5 => serialport::DataBits::Five,
                6 => serialport::DataBits::Six,
                7 => serialport::DataBits::Seven,
                _ => serialport::DataBits::Eight,
            })
            .stop_bits(match self.config.stop_bits {
                2 => serialport::StopBits::Two,
                _ => serialport::StopBits::One,
            })
            .parity(to_serialport_parity(self.config.parity))
            .flow_control(if self.config.flow_control {
                serialport::FlowControl::Hardware
            } else {
                serialport::FlowControl::None
            });

        builder.open().map_err(|e| match e.kind() {
            serialport::ErrorKind::NoDevice => ConnectionError::PortNotFound {
                port: self.config.port.clone(),
            }
            .into(),
            _ => ConnectionError::FailedToOpen {
                port: self.config.port.clone(),
                reason: e.to_string(),
            }
            .into(),
        })
    }
}

impl Connectable for SerialTransport {
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

        let port = match self.open_port() {
            Ok(port) => port,
            Err(e) => {
                tracing::error!("{}: {}", self.core.name(), e);
                self.core.set_state(ConnectionState::NotConnected);
                return;
            }
        };

        let mut reader_port = match port.try_clone() {
            Ok(clone) => clone,
            Err(e) => {
                tracing::error!("{}: failed to clone port handle: {}", self.core.name(), e);
                self.core.set_state(ConnectionState::NotConnected);
                return;
            }
        };

        let shutdown = Arc::new(AtomicBool::new(false));
        let reader_shutdown = shutdown.clone();
        let core = self.core.clone();
        let encoding = self.config.encoding;
        let reader = std::thread::spawn(move || {
            let mut buf = [0u8; 1024];
            loop {
                if reader_shutdown.load(Ordering::SeqCst) {
                    break;
                }
                match std::io::Read::read(&mut reader_port, &mut buf) {
                    Ok(0) => continue,
                    Ok(n) => core.ingest(&encoding.decode(&buf[..n])),
                    Err(e)
                        if e.kind() == std::io::ErrorKind::TimedOut
                            || e.kind() == std::io::ErrorKind::Interrupted =>
                    {
                        continue
                    }
                    Err(e) => {
                        tracing::error!(
                            "{}: {}",
                            core.name(),
                            ConnectionError::SerialError {
                                reason: e.to_string(),
                            }
                        );
                        core.set_state(ConnectionState::NotConnected);
                        break;
                    }
                }
            }
        });

        {
            let mut guard = self.io.lock();
            guard.writer = Some(port);
            guard.reader = Some(reader);
            guard.shutdown = Some(shutdown);
        }
        self.core.set_state(ConnectionState::Connected);
    }
}

impl Transport for SerialTransport {
    fn disconnect(&self) {
        if self.core.state() == ConnectionState::NotConnected {
            return;
        }

        let reader = {
            let mut guard = self.io.lock();
            if let Some(flag) = guard.shutdown.take() {
                flag.store(true, Ordering::SeqCst);
            }
            guard.writer = None;
            guard.reader.take()
        };
        if let Some(handle) = reader {
            let _ = handle.join();
        }

        // Synchronous medium: straight to NotConnected.
        self.core.set_state(ConnectionState::NotConnected);
    }

    fn send(&self, message: &str) -> bool {
        if self.core.state() != ConnectionState::Connected {
            tracing::debug!("{}: {}, rejecting send", self.core.name(), TransportError::NotConnected);
            return false;
        }
        let mut guard = self.io.lock();
        match guard.writer.as_mut() {
            Some(port) => {
                let data = self.config.encoding.encode(message);
                match std::io::Write::write_all(port, &data) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!("{}: write failed: {}", self.core.name(), e);
                        false
                    }
                }
            }
            None => false,
        }
    }

    fn set_listener(&self, listener: Option<Arc<dyn TransportListener>>) {
        self.core.set_listener(listener);
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}
