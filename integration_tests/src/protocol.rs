//! Position report format matching the firmware.
//!
//! The tracker logs every encoded payload on its console as
//! `beacon: <payload>`; these helpers pick such lines out and split the
//! payload into its fields.

#![allow(dead_code)]

/// Log prefix the firmware writes in front of each payload
pub const BEACON_PREFIX: &str = "beacon: ";

/// Report type for a position without timestamp
pub const POSITION_REPORT: char = '!';

/// Comment is only sent on every Nth beacon
pub const COMMENT_EVERY: usize = 4;

/// One decoded position report.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionReport {
    /// Latitude in degrees, negative south
    pub latitude: f64,
    /// Longitude in degrees, negative west
    pub longitude: f64,
    pub overlay: char,
    pub symbol: char,
    pub course_deg: u16,
    pub speed_knots: u16,
    pub altitude_ft: i32,
    /// Free text between the altitude and the telemetry
    pub comment: String,
    pub voltage_v: Option<f32>,
    pub current_ma: Option<f32>,
}

/// Extract the payload from a console line, if it carries one.
pub fn beacon_payload(line: &str) -> Option<&str> {
    let start = line.find(BEACON_PREFIX)? + BEACON_PREFIX.len();
    let payload = line[start..].trim_end();
    payload.starts_with(POSITION_REPORT).then_some(payload)
}

/// Parse `DDMM.hh` / `DDDMM.hh` plus hemisphere into signed degrees.
fn parse_coordinate(field: &str, degree_digits: usize, positive: char, negative: char) -> Result<f64, String> {
    let hemisphere = field
        .chars()
        .last()
        .ok_or_else(|| "empty coordinate".to_string())?;
    let digits = &field[..field.len() - 1];

    if !digits.is_ascii() || digits.len() < degree_digits + 4 || digits.as_bytes()[degree_digits + 2] != b'.' {
        return Err(format!("malformed coordinate {:?}", field));
    }
    let degrees: f64 = digits[..degree_digits]
        .parse()
        .map_err(|_| format!("bad degrees in {:?}", field))?;
    let minutes: f64 = digits[degree_digits..]
        .parse()
        .map_err(|_| format!("bad minutes in {:?}", field))?;
    if minutes >= 60.0 {
        return Err(format!("minutes out of range in {:?}", field));
    }

    let value = degrees + minutes / 60.0;
    match hemisphere {
        h if h == positive => Ok(value),
        h if h == negative => Ok(-value),
        other => Err(format!("bad hemisphere {:?}", other)),
    }
}

/// Split a number off the front of `text` at the first character that is
/// not part of it.
fn take_number(text: &str) -> (&str, &str) {
    let end = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text.split_at(end)
}

/// Telemetry values are left empty when no battery is connected.
fn optional_number(text: &str, context: &str) -> Result<Option<f32>, String> {
    if text.is_empty() {
        return Ok(None);
    }
    text.parse()
        .map(Some)
        .map_err(|_| format!("bad number {:?} in {:?}", text, context))
}

/// Parse a payload as written by the tracker.
pub fn parse_position(payload: &str) -> Result<PositionReport, String> {
    let body = payload
        .strip_prefix(POSITION_REPORT)
        .ok_or_else(|| format!("not a position report: {:?}", payload))?;

    let lat_end = body
        .find(['N', 'S'])
        .ok_or_else(|| "latitude hemisphere missing".to_string())?;
    let latitude = parse_coordinate(&body[..=lat_end], 2, 'N', 'S')?;

    let mut rest = body[lat_end + 1..].chars();
    let overlay = rest.next().ok_or_else(|| "overlay missing".to_string())?;
    let rest = rest.as_str();

    let lon_end = rest
        .find(['E', 'W'])
        .ok_or_else(|| "longitude hemisphere missing".to_string())?;
    let longitude = parse_coordinate(&rest[..=lon_end], 3, 'E', 'W')?;

    let mut rest = rest[lon_end + 1..].chars();
    let symbol = rest.next().ok_or_else(|| "symbol missing".to_string())?;
    let rest = rest.as_str();

    // CCC/SSS/A=AAAAAA
    let head = rest
        .get(..16)
        .filter(|head| head.is_ascii() && &head[3..4] == "/" && &head[7..10] == "/A=")
        .ok_or_else(|| format!("malformed course/speed/altitude: {:?}", rest))?;
    let course_deg = head[..3]
        .parse()
        .map_err(|_| format!("bad course {:?}", &head[..3]))?;
    let speed_knots = head[4..7]
        .parse()
        .map_err(|_| format!("bad speed {:?}", &head[4..7]))?;
    let altitude_ft = head[10..16]
        .parse()
        .map_err(|_| format!("bad altitude {:?}", &head[10..16]))?;
    let tail = &rest[16..];

    let (comment, telemetry) = match tail.find("VBat=") {
        Some(at) => (&tail[..at], &tail[at..]),
        None => (tail, ""),
    };

    let (voltage_v, current_ma) = if telemetry.is_empty() {
        (None, None)
    } else {
        let after = telemetry["VBat=".len()..].trim_start();
        let (volts, after) = take_number(after);
        let after = after.strip_prefix('V').unwrap_or(after);
        let current = match after.strip_prefix("Cur=") {
            Some(cur) => {
                let (amps, _) = take_number(cur.trim_start());
                optional_number(amps, telemetry)?
            }
            None => None,
        };
        (optional_number(volts, telemetry)?, current)
    };

    Ok(PositionReport {
        latitude,
        longitude,
        overlay,
        symbol,
        course_deg,
        speed_knots,
        altitude_ft,
        comment: comment.to_string(),
        voltage_v,
        current_ma,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picks_payload_from_log_line() {
        let line = "INFO - beacon: !4807.0N/01131.0E[084/022/A=001789\r";
        assert_eq!(beacon_payload(line), Some("!4807.0N/01131.0E[084/022/A=001789"));
        assert_eq!(beacon_payload("INFO - beacon: position ok"), None);
        assert_eq!(beacon_payload("INFO - config: loaded for DL1ABC-7"), None);
    }

    #[test]
    fn test_parses_full_report() {
        let report =
            parse_position("!4807.0N/01131.0E[084/022/A=001789LoRa BeaconVBat= 4.10VCur= -120mA")
                .unwrap();
        assert!((report.latitude - 48.1166).abs() < 0.001);
        assert!((report.longitude - 11.5166).abs() < 0.001);
        assert_eq!(report.overlay, '/');
        assert_eq!(report.symbol, '[');
        assert_eq!(report.course_deg, 84);
        assert_eq!(report.speed_knots, 22);
        assert_eq!(report.altitude_ft, 1789);
        assert_eq!(report.comment, "LoRa Beacon");
        assert_eq!(report.voltage_v, Some(4.10));
        assert_eq!(report.current_ma, Some(-120.0));
    }

    #[test]
    fn test_parses_southern_western_report_without_telemetry() {
        let report = parse_position("!3352.1234S/15112.5678W>360/000/A=-00012").unwrap();
        assert!(report.latitude < 0.0);
        assert!(report.longitude < 0.0);
        assert_eq!(report.altitude_ft, -12);
        assert_eq!(report.comment, "");
        assert_eq!(report.voltage_v, None);
    }

    #[test]
    fn test_empty_telemetry_without_battery() {
        let report = parse_position("!4807.0N/01131.0E[084/022/A=001789VBat= Cur= ").unwrap();
        assert_eq!(report.comment, "");
        assert_eq!(report.voltage_v, None);
        assert_eq!(report.current_ma, None);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_position("!garbage").is_err());
        assert!(parse_position("=4807.0N/01131.0E[").is_err());
        assert!(parse_position("!4807.0N/01131.0E[084-022/A=001789").is_err());
    }
}
