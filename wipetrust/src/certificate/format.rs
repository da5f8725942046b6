// Human-readable formatting of derived certificate fields.

/// Placeholder for any value the wipe engine did not report.
pub const UNKNOWN: &str = "Unknown";

const CAPACITY_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Format a byte count with base-1024 units and one decimal place, using the
/// smallest unit whose value is below 1024. Zero means "not reported".
///
/// ```
/// use wipetrust::certificate::format::format_capacity;
/// assert_eq!(format_capacity(500 * 1024 * 1024 * 1024), "500.0 GB");
/// assert_eq!(format_capacity(0), "Unknown");
/// ```
pub fn format_capacity(bytes: u64) -> String {
    if bytes == 0 {
        return UNKNOWN.to_string();
    }
    let mut value = bytes as f64;
    for unit in &CAPACITY_UNITS[..CAPACITY_UNITS.len() - 1] {
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1} {}", CAPACITY_UNITS[CAPACITY_UNITS.len() - 1])
}

/// Format an elapsed time in seconds, one decimal place, on a
/// seconds / minutes / hours ladder. Negative spans are reported as unknown.
pub fn format_duration(seconds: i64) -> String {
    if seconds < 0 {
        return UNKNOWN.to_string();
    }
    let secs = seconds as f64;
    if secs < 60.0 {
        format!("{secs:.1} seconds")
    } else if secs < 3600.0 {
        format!("{:.1} minutes", secs / 60.0)
    } else {
        format!("{:.1} hours", secs / 3600.0)
    }
}

/// Overwrite passes implied by a method label when none were reported.
pub fn pass_count_for_method(method: &str) -> u32 {
    if method.contains("7-pass") {
        7
    } else if method.contains("3-pass") {
        3
    } else {
        1
    }
}

/// `value` if present and non-blank, otherwise "Unknown".
pub fn or_unknown(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_ladder() {
        assert_eq!(format_capacity(0), "Unknown");
        assert_eq!(format_capacity(1), "1.0 B");
        assert_eq!(format_capacity(1023), "1023.0 B");
        assert_eq!(format_capacity(1024), "1.0 KB");
        assert_eq!(format_capacity(1536), "1.5 KB");
        assert_eq!(format_capacity(500 * 1024u64.pow(3)), "500.0 GB");
        assert_eq!(format_capacity(2 * 1024u64.pow(4)), "2.0 TB");
        assert_eq!(format_capacity(3 * 1024u64.pow(5)), "3.0 PB");
    }

    #[test]
    fn capacity_stays_in_petabytes_past_the_ladder() {
        assert_eq!(format_capacity(2048 * 1024u64.pow(5)), "2048.0 PB");
    }

    #[test]
    fn marketing_sized_ssd() {
        // 500 GB as sold is ~465.8 GiB.
        assert_eq!(format_capacity(500_107_862_016), "465.8 GB");
    }

    #[test]
    fn duration_ladder() {
        assert_eq!(format_duration(42), "42.0 seconds");
        assert_eq!(format_duration(1110), "18.5 minutes");
        assert_eq!(format_duration(5400), "1.5 hours");
        assert_eq!(format_duration(-1), "Unknown");
    }

    #[test]
    fn pass_count_from_label() {
        assert_eq!(pass_count_for_method("DoD 5220.22-M 7-pass"), 7);
        assert_eq!(pass_count_for_method("Gutmann 3-pass"), 3);
        assert_eq!(pass_count_for_method("Single Pass"), 1);
        assert_eq!(pass_count_for_method("NIST SP 800-88 Rev. 1"), 1);
    }

    #[test]
    fn blank_values_become_unknown() {
        assert_eq!(or_unknown(None), "Unknown");
        assert_eq!(or_unknown(Some("  ")), "Unknown");
        assert_eq!(or_unknown(Some("SSD")), "SSD");
    }
}
