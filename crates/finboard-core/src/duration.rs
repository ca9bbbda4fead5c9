//! Execution time formatting for completion notices.

/// Format a millisecond duration rounded to whole seconds.
///
/// `4200.0` → `"4 seconds"`, `61_000.0` → `"1 minute 1 second"`,
/// `3_720_000.0` → `"1 hour 2 minutes"`. Sub-second and invalid inputs
/// yield `"less than a second"`.
pub fn format_duration_ms(ms: f64) -> String {
    if !ms.is_finite() || ms < 500.0 {
        return "less than a second".to_string();
    }
    let total = (ms / 1000.0).round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;

    // Seconds are noise at hour scale.
    let seconds = if hours > 0 { 0 } else { total % 60 };

    [(hours, "hour"), (minutes, "minute"), (seconds, "second")]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| plural(n, unit))
        .collect::<Vec<_>>()
        .join(" ")
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 { format!("1 {unit}") } else { format!("{n} {unit}s") }
}
