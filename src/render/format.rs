
use chrono::{Utc, DateTime, Duration};

pub fn format_date_time(datetime: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let d = now.signed_duration_since(*datetime);
    if d.num_days() > 365 {
        datetime.format("%b %d %Y").to_string()
    } else if d.num_days() > 0 {
        datetime.format("%b %d").to_string()
    } else if d.num_hours() > 0 {
        format!("{}h ago", d.num_hours())
    } else {
        "just now".to_string()
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

fn rounded_div(value: i64, by: i64) -> i64 {
    (value + by / 2) / by
}

/// Rough, human wording for a span of time, e.g. "about 3 hours".
pub fn format_distance(distance: Duration) -> String {
    let minutes = rounded_div(distance.num_seconds().abs(), 60);
    match minutes {
        0 => "less than a minute".to_string(),
        1..=44 => plural(minutes, "minute"),
        45..=89 => "about 1 hour".to_string(),
        90..=1439 => format!("about {}", plural(rounded_div(minutes, 60), "hour")),
        1440..=2519 => "1 day".to_string(),
        2520..=43199 => plural(rounded_div(minutes, 1440), "day"),
        43200..=525599 => plural(rounded_div(minutes, 43200), "month"),
        _ => format!("about {}", plural(minutes / 525600, "year")),
    }
}

pub fn format_period(hours: u32) -> String {
    plural(i64::from(hours), "hour")
}
