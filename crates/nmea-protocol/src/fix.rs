//! Merged GPS Fix State
//!
//! A receiver interleaves RMC, GGA, VTG and GSV sentences; each carries a
//! subset of the position state. `GpsFix` accumulates them field-wise so the
//! most recent value of every field is always available.

use crate::sentence::Sentence;
use crate::speed;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// The 16-wind compass rose
const CARDINALS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW",
    "W", "WNW", "NW", "NNW",
];

/// Convert a course in degrees to its 16-wind cardinal direction
pub fn cardinal(degrees: f64) -> &'static str {
    let index = (degrees / 22.5).round() as isize % 16;
    CARDINALS[index.rem_euclid(16) as usize]
}

/// Accumulated position fix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    /// UTC time of the last fix
    pub time: Option<NaiveTime>,
    /// UTC date of the last fix
    pub date: Option<NaiveDate>,
    /// Latitude in signed degrees
    pub latitude: Option<f64>,
    /// Longitude in signed degrees
    pub longitude: Option<f64>,
    /// Speed over ground in knots
    pub speed_knots: Option<f64>,
    /// True course over ground in degrees
    pub course_deg: Option<f64>,
    /// Antenna altitude above mean sea level (meters)
    pub altitude_m: Option<f64>,
    /// Number of satellites used for the fix
    pub satellites: Option<u32>,
    /// Satellites in view (from GSV)
    pub satellites_in_view: Option<u32>,
    /// GGA fix quality, 0 = invalid
    pub fix_quality: u8,
    /// Horizontal dilution of precision
    pub hdop: Option<f64>,
    /// Whether the receiver reports a valid fix
    pub has_fix: bool,
}

impl GpsFix {
    /// Speed over ground in km/h
    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed_knots.map(|k| k * speed::KNOTS_TO_KMH)
    }

    /// Speed over ground in mph
    pub fn speed_mph(&self) -> Option<f64> {
        self.speed_knots.map(|k| k * speed::KNOTS_TO_MPH)
    }

    /// Cardinal direction of the course, if a course is known
    pub fn course_cardinal(&self) -> Option<&'static str> {
        self.course_deg.map(cardinal)
    }

    /// Whether both coordinates are present
    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Fold a decoded sentence into the fix
    pub fn update_from_sentence(&mut self, sentence: &Sentence) {
        match sentence {
            Sentence::Rmc(rmc) => {
                self.time = rmc.time.or(self.time);
                self.date = rmc.date.or(self.date);
                if rmc.latitude.is_some() {
                    self.latitude = rmc.latitude;
                    self.longitude = rmc.longitude;
                }
                if rmc.speed_knots.is_some() {
                    self.speed_knots = rmc.speed_knots;
                }
                if rmc.course_deg.is_some() {
                    self.course_deg = rmc.course_deg;
                }
                self.has_fix = rmc.has_fix() || self.fix_quality > 0;
            }
            Sentence::Gga(gga) => {
                self.time = gga.time.or(self.time);
                if gga.latitude.is_some() {
                    self.latitude = gga.latitude;
                    self.longitude = gga.longitude;
                }
                self.fix_quality = gga.fix_quality;
                if gga.satellites.is_some() {
                    self.satellites = gga.satellites;
                }
                if gga.hdop.is_some() {
                    self.hdop = gga.hdop;
                }
                if gga.altitude_m.is_some() {
                    self.altitude_m = gga.altitude_m;
                }
                self.has_fix = gga.has_fix();
            }
            Sentence::Vtg(vtg) => {
                if vtg.course_true.is_some() {
                    self.course_deg = vtg.course_true;
                }
                if vtg.speed_knots.is_some() {
                    self.speed_knots = vtg.speed_knots;
                }
            }
            Sentence::Gsv(gsv) => {
                if gsv.satellites_in_view.is_some() {
                    self.satellites_in_view = gsv.satellites_in_view;
                }
            }
            Sentence::Unsupported(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentence::{GgaData, RmcData, VtgData};

    #[test]
    fn test_cardinal_directions() {
        assert_eq!(cardinal(0.0), "N");
        assert_eq!(cardinal(90.0), "E");
        assert_eq!(cardinal(180.0), "S");
        assert_eq!(cardinal(270.0), "W");
        assert_eq!(cardinal(84.4), "E");
        assert_eq!(cardinal(359.9), "N");
        assert_eq!(cardinal(22.5), "NNE");
        assert_eq!(cardinal(45.0), "NE");
    }

    #[test]
    fn test_fix_accumulates_across_sentences() {
        let mut fix = GpsFix::default();

        fix.update_from_sentence(&Sentence::Gga(GgaData {
            latitude: Some(48.1173),
            longitude: Some(11.5167),
            fix_quality: 1,
            satellites: Some(8),
            altitude_m: Some(545.4),
            ..Default::default()
        }));
        assert!(fix.has_fix);
        assert_eq!(fix.satellites, Some(8));

        fix.update_from_sentence(&Sentence::Rmc(RmcData {
            status: Some('A'),
            latitude: Some(48.1174),
            longitude: Some(11.5168),
            speed_knots: Some(22.4),
            course_deg: Some(84.4),
            ..Default::default()
        }));

        // RMC refreshed position and motion, GGA altitude survives
        assert_eq!(fix.latitude, Some(48.1174));
        assert_eq!(fix.altitude_m, Some(545.4));
        assert!((fix.speed_kmh().unwrap() - 22.4 * 1.852).abs() < 1e-9);
        assert!((fix.speed_mph().unwrap() - 22.4 * 1.15078).abs() < 1e-9);
        assert_eq!(fix.course_cardinal(), Some("E"));
    }

    #[test]
    fn test_vtg_updates_motion_only() {
        let mut fix = GpsFix {
            latitude: Some(1.0),
            longitude: Some(2.0),
            has_fix: true,
            ..Default::default()
        };
        fix.update_from_sentence(&Sentence::Vtg(VtgData {
            course_true: Some(54.7),
            speed_knots: Some(5.5),
            ..Default::default()
        }));
        assert_eq!(fix.latitude, Some(1.0));
        assert_eq!(fix.course_deg, Some(54.7));
    }

    #[test]
    fn test_void_rmc_clears_fix_flag() {
        let mut fix = GpsFix {
            has_fix: true,
            ..Default::default()
        };
        fix.update_from_sentence(&Sentence::Rmc(RmcData {
            status: Some('V'),
            ..Default::default()
        }));
        assert!(!fix.has_fix);
    }

    proptest::proptest! {
        #[test]
        fn prop_cardinal_is_total(deg in -7200.0f64..7200.0) {
            let dir = cardinal(deg);
            proptest::prop_assert!(CARDINALS.contains(&dir));
        }
    }
}
