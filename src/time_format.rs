/// Formats milliseconds as zero-padded `HH:MM:SS`. Sub-second remainders are
/// truncated; hours are not capped at 99.
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Inverse of [`format_duration`]. Anything that is not three non-negative
/// integer fields separated by `:` parses to zero.
pub fn parse_duration(value: &str) -> u64 {
    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.len() != 3 {
        return 0;
    }

    let mut fields = [0u64; 3];
    for (slot, part) in fields.iter_mut().zip(parts.iter()) {
        match part.parse::<u64>() {
            Ok(v) => *slot = v,
            Err(_) => return 0,
        }
    }

    let [h, m, s] = fields;
    h.saturating_mul(3600)
        .saturating_add(m.saturating_mul(60))
        .saturating_add(s)
        .saturating_mul(1000)
}

pub fn truncate_label(value: &str, max_chars: usize) -> String {
    let count = value.chars().count();
    if count <= max_chars {
        return value.to_string();
    }

    if max_chars <= 3 {
        return value.chars().take(max_chars).collect();
    }

    let prefix: String = value.chars().take(max_chars - 3).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_whole_seconds() {
        assert_eq!(format_duration(7_325_000), "02:02:05");
        assert_eq!(format_duration(125_000), "00:02:05");
        assert_eq!(format_duration(0), "00:00:00");
    }

    #[test]
    fn test_format_truncates_sub_second() {
        assert_eq!(format_duration(1_999), "00:00:01");
    }

    #[test]
    fn test_format_hours_past_99() {
        assert_eq!(format_duration(100 * 3600 * 1000), "100:00:00");
    }

    #[test]
    fn test_parse_inverse_of_format() {
        assert_eq!(parse_duration("02:02:05"), 7_325_000);
        assert_eq!(parse_duration(&format_duration(3_723_000)), 3_723_000);
    }

    #[test]
    fn test_parse_malformed_is_zero() {
        assert_eq!(parse_duration(""), 0);
        assert_eq!(parse_duration("12:34"), 0);
        assert_eq!(parse_duration("aa:bb:cc"), 0);
        assert_eq!(parse_duration("-1:00:00"), 0);
        assert_eq!(parse_duration("01:02:03:04"), 0);
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short", 10), "short");
        assert_eq!(truncate_label("a long task name", 8), "a lon...");
        assert_eq!(truncate_label("abcdef", 3), "abc");
    }
}
