//! NMEA-0183 Protocol Implementation
//!
//! This crate provides async serial communication with NMEA-0183 GPS
//! receivers (BU-353N5 and compatible). It decodes the RMC, GGA, VTG and
//! GSV sentence types into a merged position fix.

mod client;
mod error;
mod fix;
mod geo;
mod sentence;

pub use client::GpsClient;
pub use error::NmeaError;
pub use fix::{cardinal, GpsFix};
pub use geo::{haversine_m, EARTH_RADIUS_M};
pub use sentence::{GgaData, GsvData, RmcData, Sentence, VtgData};

/// Speed conversion constants
pub mod speed {
    /// Knots to kilometers per hour
    pub const KNOTS_TO_KMH: f64 = 1.852;
    /// Knots to miles per hour
    pub const KNOTS_TO_MPH: f64 = 1.15078;
}

/// Default baud rate for BU-353N5 class receivers
pub const DEFAULT_BAUD: u32 = 4800;
