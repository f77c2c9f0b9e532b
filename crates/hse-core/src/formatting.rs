/// Format a count with thousands separators.
///
/// # Examples
///
/// ```
/// use hse_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1234), "1,234");
/// assert_eq!(format_count(1234567), "1,234,567");
/// ```
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// `part / whole` as a whole-number percentage, rounded to nearest.
///
/// Returns `0` if `whole` is zero.
///
/// # Examples
///
/// ```
/// use hse_core::formatting::percentage;
///
/// assert_eq!(percentage(1, 3), 33);
/// assert_eq!(percentage(2, 3), 67);
/// assert_eq!(percentage(0, 0), 0);
/// ```
pub fn percentage(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    let raw = (part as f64 / whole as f64) * 100.0;
    raw.round().clamp(0.0, 100.0) as u32
}

/// Cut `text` to at most `max_chars` characters, appending `"..."`.
///
/// Empty input stays empty; non-empty input always gets the suffix so
/// sample listings read uniformly.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
