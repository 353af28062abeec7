//! GPS Track Logging
//!
//! Appends fixes to daily CSV and JSON files under a `gps_data` directory
//! and keeps a bounded in-memory history of recent track points.

use crate::MonitorError;
use chrono::{DateTime, Local};
use nmea_protocol::GpsFix;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default in-memory history retention
const DEFAULT_MAX_HISTORY: usize = 10_000;

/// Flattened track point, one row in the CSV log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Wall-clock time the point was recorded
    pub recorded_at: DateTime<Local>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_knots: Option<f64>,
    pub speed_kmh: Option<f64>,
    pub speed_mph: Option<f64>,
    pub course_deg: Option<f64>,
    pub course_cardinal: Option<String>,
    pub altitude_m: Option<f64>,
    pub satellites: Option<u32>,
    pub fix_quality: u8,
    pub hdop: Option<f64>,
}

impl TrackRecord {
    /// Build a record from a fix at the current wall-clock time
    pub fn from_fix(fix: &GpsFix) -> Self {
        Self {
            recorded_at: Local::now(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            speed_knots: fix.speed_knots,
            speed_kmh: fix.speed_kmh(),
            speed_mph: fix.speed_mph(),
            course_deg: fix.course_deg,
            course_cardinal: fix.course_cardinal().map(str::to_string),
            altitude_m: fix.altitude_m,
            satellites: fix.satellites,
            fix_quality: fix.fix_quality,
            hdop: fix.hdop,
        }
    }
}

/// Daily track log writer
pub struct TrackLog {
    dir: PathBuf,
    history: VecDeque<TrackRecord>,
    max_history: usize,
}

impl TrackLog {
    /// Create a track log rooted at `dir` (created if missing)
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, MonitorError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Track log directory: {}", dir.display());
        Ok(Self {
            dir,
            history: VecDeque::with_capacity(1024),
            max_history: DEFAULT_MAX_HISTORY,
        })
    }

    /// Append a fix to today's CSV and JSON logs; returns the CSV path
    pub fn append(&mut self, fix: &GpsFix) -> Result<PathBuf, MonitorError> {
        let record = TrackRecord::from_fix(fix);
        let csv_path = self.append_csv(&record)?;
        self.append_json(&record)?;

        while self.history.len() >= self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(record);

        Ok(csv_path)
    }

    fn append_csv(&self, record: &TrackRecord) -> Result<PathBuf, MonitorError> {
        let path = self.dir.join(format!(
            "gps_data_{}.csv",
            Local::now().format("%Y%m%d")
        ));
        let new_file = !path.exists();

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(new_file)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;

        debug!("Track point appended to {}", path.display());
        Ok(path)
    }

    fn append_json(&self, record: &TrackRecord) -> Result<PathBuf, MonitorError> {
        let path = self.dir.join(format!(
            "gps_data_{}.json",
            Local::now().format("%Y%m%d")
        ));

        let mut records: Vec<TrackRecord> = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?).unwrap_or_default()
        } else {
            Vec::new()
        };
        records.push(record.clone());
        fs::write(&path, serde_json::to_string_pretty(&records)?)?;

        Ok(path)
    }

    /// Most recent track points, newest first
    pub fn recent(&self, limit: usize) -> Vec<TrackRecord> {
        self.history.iter().rev().take(limit).cloned().collect()
    }

    /// Number of points held in memory
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Log directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fix() -> GpsFix {
        GpsFix {
            latitude: Some(48.1173),
            longitude: Some(11.5167),
            speed_knots: Some(22.4),
            course_deg: Some(84.4),
            satellites: Some(8),
            fix_quality: 1,
            has_fix: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_append_creates_daily_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = TrackLog::new(tmp.path().join("gps_data")).unwrap();

        let csv_path = log.append(&sample_fix()).unwrap();
        assert!(csv_path.exists());

        let contents = fs::read_to_string(&csv_path).unwrap();
        let mut lines = contents.lines();
        assert!(lines.next().unwrap().starts_with("recorded_at,latitude"));
        assert!(lines.next().unwrap().contains("48.1173"));

        let json_path = csv_path.with_extension("json");
        let records: Vec<TrackRecord> =
            serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].course_cardinal.as_deref(), Some("E"));
    }

    #[test]
    fn test_csv_header_written_once() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = TrackLog::new(tmp.path()).unwrap();

        let path = log.append(&sample_fix()).unwrap();
        log.append(&sample_fix()).unwrap();

        let contents = fs::read_to_string(path).unwrap();
        let headers = contents
            .lines()
            .filter(|l| l.starts_with("recorded_at"))
            .count();
        assert_eq!(headers, 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_history_retention() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = TrackLog::new(tmp.path()).unwrap();
        log.max_history = 5;

        for _ in 0..10 {
            log.append(&sample_fix()).unwrap();
        }
        assert_eq!(log.history_len(), 5);
        assert_eq!(log.recent(100).len(), 5);
    }
}
