//! Human-readable rendering of second counts for timer announcements.

const LEVELS: &[(u64, &str)] = &[
    (31_536_000, "year"),
    (86_400, "day"),
    (3_600, "hour"),
    (60, "minute"),
    (1, "second"),
];

/// Renders a duration in seconds as e.g. "1 hour 20 minutes", consuming
/// the largest units first. Zero-valued units are skipped entirely, and
/// zero seconds renders as "no time".
pub fn human_time(total_secs: u64) -> String {
    let mut remaining = total_secs;
    let mut parts: Vec<String> = Vec::new();
    for &(unit_secs, unit_name) in LEVELS {
        let n = remaining / unit_secs;
        if n == 0 {
            continue;
        }
        remaining -= n * unit_secs;
        if n == 1 {
            parts.push(format!("1 {unit_name}"));
        } else {
            parts.push(format!("{n} {unit_name}s"));
        }
    }
    if parts.is_empty() {
        "no time".to_string()
    } else {
        parts.join(" ")
    }
}

/// Like [`human_time`], but amounts beyond `cap` render as a vague phrase.
/// Timer notices echo the requested amount, which may exceed the clamp
/// applied to the timer itself.
pub fn human_time_capped(total_secs: u64, cap: u64) -> String {
    if total_secs > cap {
        "a large amount of time".to_string()
    } else {
        human_time(total_secs)
    }
}
