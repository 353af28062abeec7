//! NMEA-0183 Sentence Decoding
//!
//! Sentences are framed as `$TTSSS,field,field,...*CS` where `TT` is the
//! talker (GP, GN, GL, ...), `SSS` is the sentence type and `CS` is the XOR
//! checksum of everything between `$` and `*`. The talker is ignored so that
//! multi-constellation receivers (`GN` prefix) decode the same way.

use crate::error::NmeaError;
use chrono::{NaiveDate, NaiveTime};

/// Decoded recommended-minimum data (RMC)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RmcData {
    /// UTC time of fix
    pub time: Option<NaiveTime>,
    /// Receiver status, 'A' = active fix, 'V' = void
    pub status: Option<char>,
    /// Latitude in signed degrees
    pub latitude: Option<f64>,
    /// Longitude in signed degrees
    pub longitude: Option<f64>,
    /// Speed over ground in knots
    pub speed_knots: Option<f64>,
    /// True course over ground in degrees
    pub course_deg: Option<f64>,
    /// UTC date of fix
    pub date: Option<NaiveDate>,
}

impl RmcData {
    /// Whether this sentence carries a valid fix
    pub fn has_fix(&self) -> bool {
        self.status == Some('A')
    }
}

/// Decoded fix data (GGA)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GgaData {
    /// UTC time of fix
    pub time: Option<NaiveTime>,
    /// Latitude in signed degrees
    pub latitude: Option<f64>,
    /// Longitude in signed degrees
    pub longitude: Option<f64>,
    /// Fix quality, 0 = invalid, 1 = GPS, 2 = DGPS
    pub fix_quality: u8,
    /// Number of satellites used
    pub satellites: Option<u32>,
    /// Horizontal dilution of precision
    pub hdop: Option<f64>,
    /// Antenna altitude above mean sea level (meters)
    pub altitude_m: Option<f64>,
}

impl GgaData {
    /// Whether this sentence carries a valid fix
    pub fn has_fix(&self) -> bool {
        self.fix_quality > 0
    }
}

/// Decoded course and speed data (VTG)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VtgData {
    /// True course over ground in degrees
    pub course_true: Option<f64>,
    /// Magnetic course over ground in degrees
    pub course_magnetic: Option<f64>,
    /// Speed over ground in knots
    pub speed_knots: Option<f64>,
    /// Speed over ground in km/h
    pub speed_kmh: Option<f64>,
}

/// Decoded satellites-in-view data (GSV)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GsvData {
    /// Number of satellites in view
    pub satellites_in_view: Option<u32>,
}

/// A decoded NMEA sentence
#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Rmc(RmcData),
    Gga(GgaData),
    Vtg(VtgData),
    Gsv(GsvData),
    /// Valid framing and checksum, but a type this crate does not decode
    Unsupported(String),
}

impl Sentence {
    /// Parse a raw NMEA line, validating framing and checksum
    pub fn parse(line: &str) -> Result<Sentence, NmeaError> {
        let payload = checked_payload(line)?;
        let fields: Vec<&str> = payload.split(',').collect();
        let tag = fields[0];

        // Strip the two-character talker prefix; "$GPRMC" and "$GNRMC"
        // decode identically.
        let kind = if tag.len() >= 5 { &tag[2..] } else { tag };

        match kind {
            "RMC" => Ok(Sentence::Rmc(parse_rmc(&fields)?)),
            "GGA" => Ok(Sentence::Gga(parse_gga(&fields)?)),
            "VTG" => Ok(Sentence::Vtg(parse_vtg(&fields)?)),
            "GSV" => Ok(Sentence::Gsv(parse_gsv(&fields)?)),
            other => Ok(Sentence::Unsupported(other.to_string())),
        }
    }
}

/// Validate `$...*CS` framing and return the payload between `$` and `*`
fn checked_payload(line: &str) -> Result<&str, NmeaError> {
    let line = line.trim();
    let body = line
        .strip_prefix('$')
        .ok_or_else(|| NmeaError::BadFraming(line.to_string()))?;

    let (payload, checksum) = match body.rsplit_once('*') {
        Some((payload, cs)) if cs.len() >= 2 => {
            let expected = u8::from_str_radix(&cs[..2], 16)
                .map_err(|_| NmeaError::BadFraming(line.to_string()))?;
            (payload, Some(expected))
        }
        Some(_) => return Err(NmeaError::BadFraming(line.to_string())),
        // Some receivers emit proprietary lines without checksums; accept them.
        None => (body, None),
    };

    if payload.is_empty() {
        return Err(NmeaError::BadFraming(line.to_string()));
    }

    if let Some(expected) = checksum {
        let actual = payload.bytes().fold(0u8, |acc, b| acc ^ b);
        if actual != expected {
            return Err(NmeaError::ChecksumMismatch { expected, actual });
        }
    }

    Ok(payload)
}

fn field<'a>(fields: &[&'a str], idx: usize) -> &'a str {
    fields.get(idx).copied().unwrap_or("")
}

fn opt_f64(
    fields: &[&str],
    idx: usize,
    sentence: &'static str,
    name: &'static str,
) -> Result<Option<f64>, NmeaError> {
    let raw = field(fields, idx);
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| NmeaError::BadField {
            sentence,
            field: name,
            value: raw.to_string(),
        })
}

fn opt_u32(
    fields: &[&str],
    idx: usize,
    sentence: &'static str,
    name: &'static str,
) -> Result<Option<u32>, NmeaError> {
    let raw = field(fields, idx);
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| NmeaError::BadField {
            sentence,
            field: name,
            value: raw.to_string(),
        })
}

/// Parse `hhmmss` or `hhmmss.sss` UTC time
fn opt_time(
    fields: &[&str],
    idx: usize,
    sentence: &'static str,
) -> Result<Option<NaiveTime>, NmeaError> {
    let raw = field(fields, idx);
    if raw.is_empty() {
        return Ok(None);
    }
    let bad = || NmeaError::BadField {
        sentence,
        field: "time",
        value: raw.to_string(),
    };

    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    if whole.len() != 6 {
        return Err(bad());
    }
    let h: u32 = whole[0..2].parse().map_err(|_| bad())?;
    let m: u32 = whole[2..4].parse().map_err(|_| bad())?;
    let s: u32 = whole[4..6].parse().map_err(|_| bad())?;
    let millis = if frac.is_empty() {
        0
    } else {
        let scaled = format!("{:0<3}", frac);
        scaled[..3].parse::<u32>().map_err(|_| bad())?
    };

    NaiveTime::from_hms_milli_opt(h, m, s, millis).map(Some).ok_or_else(bad)
}

/// Parse `ddmmyy` UTC date; two-digit years below 80 map to 20xx
fn opt_date(
    fields: &[&str],
    idx: usize,
    sentence: &'static str,
) -> Result<Option<NaiveDate>, NmeaError> {
    let raw = field(fields, idx);
    if raw.is_empty() {
        return Ok(None);
    }
    let bad = || NmeaError::BadField {
        sentence,
        field: "date",
        value: raw.to_string(),
    };
    if raw.len() != 6 {
        return Err(bad());
    }
    let d: u32 = raw[0..2].parse().map_err(|_| bad())?;
    let m: u32 = raw[2..4].parse().map_err(|_| bad())?;
    let y: i32 = raw[4..6].parse().map_err(|_| bad())?;
    let year = if y < 80 { 2000 + y } else { 1900 + y };
    NaiveDate::from_ymd_opt(year, m, d).map(Some).ok_or_else(bad)
}

/// Parse a `ddmm.mmmm` / `dddmm.mmmm` coordinate with its hemisphere field
/// into signed degrees
fn opt_coord(
    fields: &[&str],
    value_idx: usize,
    hemi_idx: usize,
    sentence: &'static str,
    name: &'static str,
) -> Result<Option<f64>, NmeaError> {
    let raw = field(fields, value_idx);
    let hemi = field(fields, hemi_idx);
    if raw.is_empty() || hemi.is_empty() {
        return Ok(None);
    }
    let bad = || NmeaError::BadField {
        sentence,
        field: name,
        value: format!("{},{}", raw, hemi),
    };

    // Minutes are always the last two integer digits plus the fraction;
    // the remaining leading digits are whole degrees.
    let dot = raw.find('.').unwrap_or(raw.len());
    if dot < 3 {
        return Err(bad());
    }
    let degrees: f64 = raw[..dot - 2].parse().map_err(|_| bad())?;
    let minutes: f64 = raw[dot - 2..].parse().map_err(|_| bad())?;
    let magnitude = degrees + minutes / 60.0;

    match hemi {
        "N" | "E" => Ok(Some(magnitude)),
        "S" | "W" => Ok(Some(-magnitude)),
        _ => Err(bad()),
    }
}

fn parse_rmc(fields: &[&str]) -> Result<RmcData, NmeaError> {
    Ok(RmcData {
        time: opt_time(fields, 1, "RMC")?,
        status: field(fields, 2).chars().next(),
        latitude: opt_coord(fields, 3, 4, "RMC", "latitude")?,
        longitude: opt_coord(fields, 5, 6, "RMC", "longitude")?,
        speed_knots: opt_f64(fields, 7, "RMC", "speed")?,
        course_deg: opt_f64(fields, 8, "RMC", "course")?,
        date: opt_date(fields, 9, "RMC")?,
    })
}

fn parse_gga(fields: &[&str]) -> Result<GgaData, NmeaError> {
    Ok(GgaData {
        time: opt_time(fields, 1, "GGA")?,
        latitude: opt_coord(fields, 2, 3, "GGA", "latitude")?,
        longitude: opt_coord(fields, 4, 5, "GGA", "longitude")?,
        fix_quality: opt_u32(fields, 6, "GGA", "quality")?.unwrap_or(0) as u8,
        satellites: opt_u32(fields, 7, "GGA", "satellites")?,
        hdop: opt_f64(fields, 8, "GGA", "hdop")?,
        altitude_m: opt_f64(fields, 9, "GGA", "altitude")?,
    })
}

fn parse_vtg(fields: &[&str]) -> Result<VtgData, NmeaError> {
    Ok(VtgData {
        course_true: opt_f64(fields, 1, "VTG", "course_true")?,
        course_magnetic: opt_f64(fields, 3, "VTG", "course_magnetic")?,
        speed_knots: opt_f64(fields, 5, "VTG", "speed_knots")?,
        speed_kmh: opt_f64(fields, 7, "VTG", "speed_kmh")?,
    })
}

fn parse_gsv(fields: &[&str]) -> Result<GsvData, NmeaError> {
    Ok(GsvData {
        satellites_in_view: opt_u32(fields, 3, "GSV", "satellites_in_view")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RMC: &str =
        "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
    const GGA: &str =
        "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const VTG: &str = "$GPVTG,054.7,T,034.4,M,005.5,N,010.2,K*48";
    const GSV: &str =
        "$GPGSV,2,1,08,01,40,083,46,02,17,308,41,12,07,344,39,14,22,228,45*75";

    #[test]
    fn test_rmc_decode() {
        let sentence = Sentence::parse(RMC).unwrap();
        let Sentence::Rmc(rmc) = sentence else {
            panic!("expected RMC");
        };
        assert!(rmc.has_fix());
        assert!((rmc.latitude.unwrap() - 48.1173).abs() < 1e-4);
        assert!((rmc.longitude.unwrap() - 11.516_666).abs() < 1e-4);
        assert!((rmc.speed_knots.unwrap() - 22.4).abs() < 1e-9);
        assert!((rmc.course_deg.unwrap() - 84.4).abs() < 1e-9);
        assert_eq!(rmc.date.unwrap(), NaiveDate::from_ymd_opt(1994, 3, 23).unwrap());
        assert_eq!(rmc.time.unwrap(), NaiveTime::from_hms_opt(12, 35, 19).unwrap());
    }

    #[test]
    fn test_gga_decode() {
        let Sentence::Gga(gga) = Sentence::parse(GGA).unwrap() else {
            panic!("expected GGA");
        };
        assert!(gga.has_fix());
        assert_eq!(gga.fix_quality, 1);
        assert_eq!(gga.satellites, Some(8));
        assert!((gga.hdop.unwrap() - 0.9).abs() < 1e-9);
        assert!((gga.altitude_m.unwrap() - 545.4).abs() < 1e-9);
    }

    #[test]
    fn test_vtg_decode() {
        let Sentence::Vtg(vtg) = Sentence::parse(VTG).unwrap() else {
            panic!("expected VTG");
        };
        assert!((vtg.course_true.unwrap() - 54.7).abs() < 1e-9);
        assert!((vtg.speed_knots.unwrap() - 5.5).abs() < 1e-9);
        assert!((vtg.speed_kmh.unwrap() - 10.2).abs() < 1e-9);
    }

    #[test]
    fn test_gsv_decode() {
        let Sentence::Gsv(gsv) = Sentence::parse(GSV).unwrap() else {
            panic!("expected GSV");
        };
        assert_eq!(gsv.satellites_in_view, Some(8));
    }

    #[test]
    fn test_gn_talker_accepted() {
        let line = RMC.replace("$GPRMC", "$GNRMC");
        // Checksum changes with the talker; recompute it.
        let payload = &line[1..line.rfind('*').unwrap()];
        let cs = payload.bytes().fold(0u8, |acc, b| acc ^ b);
        let line = format!("${}*{:02X}", payload, cs);
        assert!(matches!(Sentence::parse(&line), Ok(Sentence::Rmc(_))));
    }

    #[test]
    fn test_checksum_rejected() {
        let corrupted = RMC.replace("*6A", "*6B");
        assert!(matches!(
            Sentence::parse(&corrupted),
            Err(NmeaError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_framing() {
        assert!(matches!(
            Sentence::parse("GPRMC,123519,A"),
            Err(NmeaError::BadFraming(_))
        ));
    }

    #[test]
    fn test_unsupported_type() {
        let payload = "GPGLL,4916.45,N,12311.12,W,225444,A";
        let cs = payload.bytes().fold(0u8, |acc, b| acc ^ b);
        let line = format!("${}*{:02X}", payload, cs);
        assert_eq!(
            Sentence::parse(&line).unwrap(),
            Sentence::Unsupported("GLL".to_string())
        );
    }

    #[test]
    fn test_void_rmc_has_no_fix() {
        let payload = "GPRMC,123519,V,,,,,,,230394,,";
        let cs = payload.bytes().fold(0u8, |acc, b| acc ^ b);
        let line = format!("${}*{:02X}", payload, cs);
        let Sentence::Rmc(rmc) = Sentence::parse(&line).unwrap() else {
            panic!("expected RMC");
        };
        assert!(!rmc.has_fix());
        assert_eq!(rmc.latitude, None);
    }

    #[test]
    fn test_southern_western_hemispheres() {
        let payload = "GPGGA,123519,4807.038,S,01131.000,W,1,08,0.9,545.4,M,46.9,M,,";
        let cs = payload.bytes().fold(0u8, |acc, b| acc ^ b);
        let line = format!("${}*{:02X}", payload, cs);
        let Sentence::Gga(gga) = Sentence::parse(&line).unwrap() else {
            panic!("expected GGA");
        };
        assert!(gga.latitude.unwrap() < 0.0);
        assert!(gga.longitude.unwrap() < 0.0);
    }
}
