use chrono::{DateTime, Utc};

const COMPASS_POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

pub fn format_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - timestamp).num_seconds();
    if seconds < 0 {
        return "just now".to_owned();
    }

    match seconds {
        0..=59 => format!("{seconds} s ago"),
        60..=3_599 => format!("{} min ago", seconds / 60),
        3_600..=86_399 => format!("{} h {} min ago", seconds / 3_600, (seconds % 3_600) / 60),
        _ => format!("{} d ago", seconds / 86_400),
    }
}

pub fn compass_point(heading_deg: f64) -> &'static str {
    let normalized = heading_deg.rem_euclid(360.0);
    let index = ((normalized + 22.5) / 45.0).floor() as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Aging,
    Stale,
    Unknown,
}

pub fn freshness(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Freshness {
    let Some(timestamp) = timestamp else {
        return Freshness::Unknown;
    };

    match (now - timestamp).num_seconds() {
        i64::MIN..120 => Freshness::Fresh,
        120..600 => Freshness::Aging,
        _ => Freshness::Stale,
    }
}
