use chrono::{Duration, NaiveDateTime};

/// Truncate a string to a maximum length in characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional due date, e.g. "Mar 01, 2025"
pub fn format_due_date(due: Option<NaiveDateTime>) -> String {
    match due {
        Some(dt) => dt.format("%b %d, %Y").to_string(),
        None => "-".to_string(),
    }
}

/// Human-readable time left in a session: "1h 05m", "12m", "under a minute"
pub fn format_remaining(remaining: Duration) -> String {
    let minutes = remaining.num_minutes();
    if minutes < 1 {
        "under a minute".to_string()
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    }
}
