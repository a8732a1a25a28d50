//! LSN string handling.

/// Compares two LSN strings in `"segment/offset"` hex form.
///
/// Returns -1, 0 or 1. Unparseable inputs fall back to plain string
/// comparison.
pub fn compare_lsn(lsn1: &str, lsn2: &str) -> i32 {
    match (parse_lsn(lsn1), parse_lsn(lsn2)) {
        (Some((s1, o1)), Some((s2, o2))) => {
            if s1 < s2 || (s1 == s2 && o1 < o2) {
                -1
            } else if s1 == s2 && o1 == o2 {
                0
            } else {
                1
            }
        }
        _ => lsn1.cmp(lsn2) as i32,
    }
}

fn parse_lsn(lsn: &str) -> Option<(u64, u64)> {
    let (segment, offset) = lsn.split_once('/')?;
    Some((
        u64::from_str_radix(segment, 16).ok()?,
        u64::from_str_radix(offset, 16).ok()?,
    ))
}
