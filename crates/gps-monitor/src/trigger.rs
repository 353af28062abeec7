//! Distance-Interval Capture Trigger

use nmea_protocol::{haversine_m, GpsFix};
use tracing::debug;

/// Fires when the rig has moved a configured distance since the last capture.
///
/// Drives GPS-paced capture: the first valid fix always fires, after which
/// the trigger re-arms at the fix it fired on.
#[derive(Debug, Clone)]
pub struct DistanceTrigger {
    interval_m: f64,
    last_capture: Option<(f64, f64)>,
}

impl DistanceTrigger {
    /// Create a trigger with the given interval in meters
    pub fn new(interval_m: f64) -> Self {
        Self {
            interval_m: interval_m.max(0.0),
            last_capture: None,
        }
    }

    /// Update the capture interval
    pub fn set_interval(&mut self, interval_m: f64) {
        self.interval_m = interval_m.max(0.0);
    }

    /// Current interval in meters
    pub fn interval_m(&self) -> f64 {
        self.interval_m
    }

    /// Check a fix against the trigger; fires and re-arms when the distance
    /// from the last capture position reaches the interval.
    pub fn check(&mut self, fix: &GpsFix) -> bool {
        let (Some(lat), Some(lon)) = (fix.latitude, fix.longitude) else {
            return false;
        };

        match self.last_capture {
            None => {
                self.last_capture = Some((lat, lon));
                true
            }
            Some((last_lat, last_lon)) => {
                let distance = haversine_m(last_lat, last_lon, lat, lon);
                if distance >= self.interval_m {
                    debug!("Distance trigger fired after {:.2} m", distance);
                    self.last_capture = Some((lat, lon));
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Distance from the last capture position, if armed
    pub fn distance_since_capture(&self, fix: &GpsFix) -> Option<f64> {
        let (lat, lon) = (fix.latitude?, fix.longitude?);
        let (last_lat, last_lon) = self.last_capture?;
        Some(haversine_m(last_lat, last_lon, lat, lon))
    }

    /// Forget the last capture position
    pub fn reset(&mut self) {
        self.last_capture = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_at(lat: f64, lon: f64) -> GpsFix {
        GpsFix {
            latitude: Some(lat),
            longitude: Some(lon),
            has_fix: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_fix_fires() {
        let mut trigger = DistanceTrigger::new(1.0);
        assert!(trigger.check(&fix_at(48.0, 11.0)));
    }

    #[test]
    fn test_fires_at_interval() {
        let mut trigger = DistanceTrigger::new(1.0);
        trigger.check(&fix_at(48.0, 11.0));

        // ~0.55 m: below the interval
        assert!(!trigger.check(&fix_at(48.000005, 11.0)));
        // ~1.1 m from the armed position: fires
        assert!(trigger.check(&fix_at(48.00001, 11.0)));
        // Re-armed at the new position
        assert!(!trigger.check(&fix_at(48.00001, 11.0)));
    }

    #[test]
    fn test_missing_position_never_fires() {
        let mut trigger = DistanceTrigger::new(1.0);
        assert!(!trigger.check(&GpsFix::default()));
    }

    #[test]
    fn test_reset_rearms() {
        let mut trigger = DistanceTrigger::new(5.0);
        trigger.check(&fix_at(48.0, 11.0));
        trigger.reset();
        assert!(trigger.check(&fix_at(48.0, 11.0)));
    }

    #[test]
    fn test_distance_since_capture() {
        let mut trigger = DistanceTrigger::new(1.0);
        trigger.check(&fix_at(48.0, 11.0));
        let d = trigger.distance_since_capture(&fix_at(48.00001, 11.0)).unwrap();
        assert!((d - 1.112).abs() < 0.05, "got {}", d);
    }
}
