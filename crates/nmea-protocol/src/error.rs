//! NMEA Error Types

use thiserror::Error;

/// Errors that can occur while reading or decoding NMEA sentences
#[derive(Debug, Error)]
pub enum NmeaError {
    /// Serial port connection error
    #[error("Serial port error: {0}")]
    Serial(String),

    /// No GPS receiver found on any serial port
    #[error("GPS receiver not found")]
    DeviceNotFound,

    /// Client is not connected to a port
    #[error("GPS client is not connected")]
    NotConnected,

    /// Line is not framed as an NMEA sentence
    #[error("Invalid sentence framing: {0}")]
    BadFraming(String),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:02X}, got {actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// A field could not be decoded
    #[error("Malformed {field} field in {sentence}: {value:?}")]
    BadField {
        sentence: &'static str,
        field: &'static str,
        value: String,
    },
}

impl From<std::io::Error> for NmeaError {
    fn from(err: std::io::Error) -> Self {
        NmeaError::Serial(err.to_string())
    }
}

impl From<tokio_serial::Error> for NmeaError {
    fn from(err: tokio_serial::Error) -> Self {
        NmeaError::Serial(err.to_string())
    }
}
