//! GPS Serial Client
//!
//! Async line-oriented reader for NMEA receivers, with serial port
//! auto-detection and a mock mode for testing without hardware.

use crate::error::NmeaError;
use crate::sentence::Sentence;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio_serial::{
    DataBits, Parity, SerialPortBuilderExt, SerialPortType, SerialStream, StopBits,
};
use tracing::{debug, info, warn};

/// Read timeout for the serial port
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// USB descriptions that identify a GPS receiver
const GPS_KEYWORDS: [&str; 5] = ["BU-353", "GLOBALSAT", "GPS", "U-BLOX", "UBLOX"];

/// USB descriptions to skip outright
const SKIP_KEYWORDS: [&str; 3] = ["BLUETOOTH", "WIRELESS", " BT "];

enum Feed {
    Serial(Lines<BufReader<SerialStream>>),
    Mock { sentences: Vec<&'static str>, next: usize },
}

/// Client for an NMEA-0183 serial GPS receiver
pub struct GpsClient {
    port_name: String,
    feed: Feed,
}

impl GpsClient {
    /// Open a specific serial port at the given baud rate (8N1)
    pub fn open(port: &str, baud: u32) -> Result<Self, NmeaError> {
        info!("Opening GPS receiver on {} at {} baud", port, baud);

        let stream = tokio_serial::new(port, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(READ_TIMEOUT)
            .open_native_async()?;

        Ok(Self {
            port_name: port.to_string(),
            feed: Feed::Serial(BufReader::new(stream).lines()),
        })
    }

    /// Scan serial ports for a GPS receiver and open the first match
    pub fn autodetect(baud: u32) -> Result<Self, NmeaError> {
        let port = Self::discover_port().ok_or(NmeaError::DeviceNotFound)?;
        Self::open(&port, baud)
    }

    /// Create a mock client that cycles a canned sentence sequence
    pub fn mock() -> Self {
        info!("Creating mock GPS client");
        Self {
            port_name: "mock".to_string(),
            feed: Feed::Mock {
                sentences: vec![
                    "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47",
                    "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A",
                    "$GPVTG,054.7,T,034.4,M,005.5,N,010.2,K*48",
                    "$GPGSV,2,1,08,01,40,083,46,02,17,308,41,12,07,344,39,14,22,228,45*75",
                ],
                next: 0,
            },
        }
    }

    /// Find the serial port of an attached GPS receiver.
    ///
    /// USB devices are matched on their product description: Bluetooth and
    /// wireless adapters are skipped, known GPS vendor strings win, and any
    /// remaining USB-serial device is taken as a last resort.
    pub fn discover_port() -> Option<String> {
        let ports = match tokio_serial::available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                warn!("Serial port enumeration failed: {}", e);
                return None;
            }
        };

        let mut fallback = None;
        for port in ports {
            let SerialPortType::UsbPort(usb) = &port.port_type else {
                continue;
            };
            let description = format!(
                "{} {}",
                usb.product.as_deref().unwrap_or(""),
                usb.manufacturer.as_deref().unwrap_or(""),
            )
            .to_uppercase();

            if SKIP_KEYWORDS.iter().any(|k| description.contains(k)) {
                continue;
            }
            if GPS_KEYWORDS.iter().any(|k| description.contains(k)) {
                debug!("GPS receiver matched on {}: {}", port.port_name, description);
                return Some(port.port_name);
            }
            if fallback.is_none() {
                fallback = Some(port.port_name);
            }
        }

        if let Some(name) = &fallback {
            debug!("No labeled GPS receiver, falling back to USB serial {}", name);
        }
        fallback
    }

    /// Read the next NMEA sentence.
    ///
    /// Lines that do not start with `$` are skipped; `Ok(None)` means the
    /// port reached end-of-stream. Decode failures are returned so the
    /// caller can log and keep reading.
    pub async fn next_sentence(&mut self) -> Result<Option<Sentence>, NmeaError> {
        match &mut self.feed {
            Feed::Serial(lines) => loop {
                match lines.next_line().await? {
                    Some(line) => {
                        let line = line.trim();
                        if !line.starts_with('$') {
                            continue;
                        }
                        return Sentence::parse(line).map(Some);
                    }
                    None => return Ok(None),
                }
            },
            Feed::Mock { sentences, next } => {
                // Pace the canned feed like a real receiver so polling loops
                // running against a mock client do not spin.
                tokio::time::sleep(Duration::from_millis(50)).await;
                let line = sentences[*next % sentences.len()];
                *next += 1;
                Sentence::parse(line).map(Some)
            }
        }
    }

    /// Name of the open port ("mock" for mock clients)
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Whether this client runs against canned data
    pub fn is_mock(&self) -> bool {
        matches!(self.feed, Feed::Mock { .. })
    }
}
