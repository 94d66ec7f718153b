/// Compact count for display: `950`, `1.5k`, `2k`, `3.2M`.
pub fn format_count(n: u64) -> String {
    match n {
        0..=999 => n.to_string(),
        1_000..=999_949 => with_suffix(n as f64 / 1_000.0, "k"),
        _ => with_suffix(n as f64 / 1_000_000.0, "M"),
    }
}

fn with_suffix(value: f64, suffix: &str) -> String {
    let rounded = format!("{:.1}", value);
    let trimmed = rounded.strip_suffix(".0").unwrap_or(&rounded);
    format!("{}{}", trimmed, suffix)
}
