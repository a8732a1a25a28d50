//! PostgreSQL epoch timestamp conversion.

use chrono::{DateTime, Duration, Utc};

/// Seconds between the Unix epoch and 2000-01-01T00:00:00Z, the epoch all
/// wire timestamps count microseconds from.
const PG_EPOCH_UNIX_SECS: i64 = 946_684_800;

fn pg_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(PG_EPOCH_UNIX_SECS, 0).expect("PostgreSQL epoch is in range")
}

/// Converts a wire timestamp (microseconds since 2000-01-01T00:00:00Z) to a
/// UTC datetime. Returns `None` when the offset lands outside chrono's
/// representable range.
pub fn pg_timestamp_to_datetime(micros: i64) -> Option<DateTime<Utc>> {
    pg_epoch().checked_add_signed(Duration::microseconds(micros))
}

/// Renders a wire timestamp as RFC 3339, falling back to the raw
/// microsecond count as a string when the conversion fails. Decoders never
/// abort on a timestamp they cannot place on the calendar.
pub fn format_pg_timestamp(micros: i64) -> String {
    match pg_timestamp_to_datetime(micros) {
        Some(dt) => dt.to_rfc3339(),
        None => micros.to_string(),
    }
}
