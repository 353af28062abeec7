//! GPS Monitoring Service
//!
//! Background fix polling over an NMEA serial client:
//! - Merges interleaved sentences into the current fix
//! - Publishes fixes via a watch channel with a staleness window
//! - Logs track points to daily CSV/JSON files
//! - Fires a distance-interval trigger for GPS-paced capture

mod monitor;
mod track;
mod trigger;

pub use monitor::{probe, FixReader, GpsMonitor, MonitorConfig, ProbeReport, ProbeStatus};
pub use track::{TrackLog, TrackRecord};
pub use trigger::DistanceTrigger;

use thiserror::Error;

/// GPS monitoring errors
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Nmea(#[from] nmea_protocol::NmeaError),
}
