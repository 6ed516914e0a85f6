//! Semantic equality for strings the API re-serializes.
//!
//! The API echoes durations and JSON documents back in its own canonical
//! spelling ("168h" comes back as "168h0m0s", object keys get reordered).
//! These predicates let the bridge keep the user's spelling whenever the
//! server's value means the same thing.
//!
//! All predicates are total: anything that fails to parse is simply
//! unequal unless byte-equal.

/// Same duration, or byte-equal (which covers both empty).
pub fn duration_equal(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (parse_duration(a), parse_duration(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Structurally equal JSON, or byte-equal.
pub fn json_equal(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (
        serde_json::from_str::<serde_json::Value>(a),
        serde_json::from_str::<serde_json::Value>(b),
    ) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// Same instant in RFC 3339, or byte-equal.
pub fn timestamp_equal(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (
        chrono::DateTime::parse_from_rfc3339(a),
        chrono::DateTime::parse_from_rfc3339(b),
    ) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// Parse a duration such as `"1h30m"`, `"1.5h"` or `"300ms"` into
/// nanoseconds.
///
/// Accepts an optional sign followed by one or more decimal numbers, each
/// with a unit: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A bare `"0"`
/// is also accepted.
pub fn parse_duration(s: &str) -> Option<i128> {
    let (negative, mut rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if rest == "0" {
        return Some(0);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let scale: i128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            _ => return None,
        };
        total = total.checked_add(scaled(number, scale)?)?;
        rest = tail;
    }

    Some(if negative { -total } else { total })
}

/// `number` (possibly fractional) times `scale`, truncating below 1ns.
fn scaled(number: &str, scale: i128) -> Option<i128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.contains('.') {
        return None;
    }

    let whole: i128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut value = whole.checked_mul(scale)?;

    let mut place = scale;
    for digit in fraction.chars() {
        place /= 10;
        if place == 0 {
            break;
        }
        value += i128::from(digit.to_digit(10)?) * place;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i128 = 3_600 * 1_000_000_000;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("168h"), Some(168 * HOUR));
        assert_eq!(parse_duration("168h0m0s"), Some(168 * HOUR));
        assert_eq!(parse_duration("1.5h"), Some(HOUR + HOUR / 2));
        assert_eq!(parse_duration("1h30m"), Some(HOUR + HOUR / 2));
        assert_eq!(parse_duration("300ms"), Some(300_000_000));
        assert_eq!(parse_duration("2us"), Some(2_000));
        assert_eq!(parse_duration("-5m"), Some(-300 * 1_000_000_000));
        assert_eq!(parse_duration("0"), Some(0));
    }

    #[test]
    fn test_parse_duration_rejects() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("24"), None);
        assert_eq!(parse_duration("h"), None);
        assert_eq!(parse_duration("1d"), None);
        assert_eq!(parse_duration("1.2.3h"), None);
        assert_eq!(parse_duration("."), None);
    }

    #[test]
    fn test_duration_equal() {
        assert!(duration_equal("168h", "168h0m0s"));
        assert!(duration_equal("24h", "1440m"));
        assert!(duration_equal("", ""));
        assert!(!duration_equal("24h", "25h"));
        assert!(!duration_equal("24h", ""));
        // Unparseable values are only equal to themselves.
        assert!(duration_equal("forever", "forever"));
        assert!(!duration_equal("forever", "24h"));
    }

    #[test]
    fn test_json_equal() {
        assert!(json_equal(r#"{"a":1,"b":[1,2]}"#, r#"{ "b": [1, 2], "a": 1 }"#));
        assert!(!json_equal(r#"{"a":1}"#, r#"{"a":2}"#));
        assert!(!json_equal(r#"{"a":1}"#, "not json"));
        assert!(json_equal("not json", "not json"));
        assert!(!json_equal(r#"[1,2]"#, r#"[2,1]"#));
    }

    #[test]
    fn test_timestamp_equal() {
        assert!(timestamp_equal(
            "2024-05-01T10:00:00Z",
            "2024-05-01T10:00:00.000+00:00"
        ));
        assert!(!timestamp_equal("2024-05-01T10:00:00Z", "2024-05-01T10:00:01Z"));
        assert!(!timestamp_equal("yesterday", "2024-05-01T10:00:00Z"));
    }
}
