// Humanized "Last synced" text
use chrono::NaiveDateTime;

pub fn last_synced_text(last_synced_on: Option<NaiveDateTime>, now: NaiveDateTime) -> String {
    match last_synced_on {
        Some(ts) => format!("Last synced {}", time_ago(ts, now)),
        None => "Last synced never".to_string(),
    }
}

/// Relative description of `ts` as seen from `now`
pub fn time_ago(ts: NaiveDateTime, now: NaiveDateTime) -> String {
    let seconds = (now - ts).num_seconds();
    if seconds < 60 {
        // Clock skew between the site and this host shows up as future timestamps
        return "just now".to_string();
    }

    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    match () {
        _ if minutes < 2 => "1 minute ago".to_string(),
        _ if minutes < 60 => format!("{} minutes ago", minutes),
        _ if hours < 2 => "1 hour ago".to_string(),
        _ if hours < 24 => format!("{} hours ago", hours),
        _ if days < 2 => "yesterday".to_string(),
        _ if days < 7 => format!("{} days ago", days),
        _ if days < 14 => "1 week ago".to_string(),
        _ if days < 31 => format!("{} weeks ago", days / 7),
        _ if days < 62 => "1 month ago".to_string(),
        _ if days < 365 => format!("{} months ago", days / 30),
        _ if days < 730 => "1 year ago".to_string(),
        _ => format!("{} years ago", days / 365),
    }
}
