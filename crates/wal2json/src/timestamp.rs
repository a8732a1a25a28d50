//! Timestamp parsing for wal2json records.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parses the timestamp strings wal2json emits into a UTC datetime.
///
/// Supported shapes:
/// - ISO 8601 with offset: "2024-01-15T10:30:00Z", "2024-01-15 10:30:00+00"
/// - Plain wal2json: "2024-01-15 10:30:00", "1997-12-17 15:37:16.123456"
///   (interpreted as UTC since no zone is attached)
pub fn parse_wal2json_timestamp(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = input.parse::<DateTime<Utc>>() {
        return Some(dt);
    }

    // With an explicit offset such as "+00" or "+05:30"
    let offset_formats = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%#z"];
    for format in offset_formats {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for format in naive_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso8601_with_z() {
        let dt = parse_wal2json_timestamp("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_wal2json_with_offset() {
        let dt = parse_wal2json_timestamp("2024-01-15 10:30:00.123456+00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T10:30:00.123456+00:00");
    }

    #[test]
    fn test_naive_interpreted_as_utc() {
        let dt = parse_wal2json_timestamp("1997-12-17 15:37:16.123456").unwrap();
        assert_eq!(dt.to_rfc3339(), "1997-12-17T15:37:16.123456+00:00");
    }

    #[test]
    fn test_garbage_is_none() {
        assert!(parse_wal2json_timestamp("not a time").is_none());
    }
}
