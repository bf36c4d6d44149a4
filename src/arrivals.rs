//! Pure formatting of predictions into fixed-width display rows.

use crate::prediction::Prediction;

/// Sort position for countdowns that are neither "DUE" nor whole minutes.
pub const UNKNOWN_SORT_KEY: i64 = i64::MAX;
/// Shown when a stop name is missing from the feed.
pub const STOP_PLACEHOLDER: &str = "CTA Bus Tracker";
pub const CLOCK_PLACEHOLDER: &str = "--:--";
/// Width of the route column.
pub const ROUTE_WIDTH: usize = 3;

const DUE: &str = "DUE";
const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Urgency key: DUE first, then ascending minutes, everything else last.
pub fn sort_key(p: &Prediction) -> i64 {
    let countdown = p.countdown.trim();
    if countdown.eq_ignore_ascii_case(DUE) {
        return i64::MIN;
    }
    countdown.parse::<i64>().unwrap_or(UNKNOWN_SORT_KEY)
}

/// Stable sort by `sort_key`.
pub fn sort_predictions(preds: &mut [Prediction]) {
    preds.sort_by_key(sort_key);
}

/// Clip or right-pad `text` to exactly `width` characters.
pub fn fit(text: &str, width: usize) -> String {
    let clipped: String = text.chars().take(width).collect();
    format!("{:<width$}", clipped, width = width)
}

/// `h:mmam` / `h:mmpm`, no leading zero on the hour.
pub fn hm12(hour: u32, minute: u32) -> String {
    let h = match hour % 12 {
        0 => 12,
        h => h,
    };
    let meridiem = if hour % 24 < 12 { "am" } else { "pm" };
    format!("{}:{:02}{}", h, minute, meridiem)
}

/// `hm12` for a local epoch timestamp.
pub fn clock_from_epoch(epoch: i64) -> String {
    let secs = epoch.rem_euclid(SECS_PER_DAY);
    hm12((secs / 3600) as u32, ((secs % 3600) / 60) as u32)
}

/// Hour and minute out of a `YYYYMMDD HH:MM` stamp.
fn stamp_hm(stamp: &str) -> Option<(u32, u32)> {
    if stamp.len() < 14 {
        return None;
    }
    let hour: u32 = stamp.get(9..11)?.parse().ok()?;
    let minute: u32 = stamp.get(12..14)?.parse().ok()?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}

/// Arrival clock time for a row. `now` is the trusted local epoch, or `None`
/// while the wall clock has not been synced.
pub fn clock_text(p: &Prediction, now: Option<i64>) -> String {
    if let Some((h, m)) = p.predicted_timestamp.as_deref().and_then(stamp_hm) {
        return hm12(h, m);
    }
    let arrival = match (now, p.countdown.trim().parse::<i64>()) {
        (Some(now), Ok(minutes)) => minutes.checked_mul(60).and_then(|s| now.checked_add(s)),
        _ => None,
    };
    arrival
        .map(clock_from_epoch)
        .unwrap_or_else(|| CLOCK_PLACEHOLDER.to_string())
}

/// One fixed-width row: route(3) + destination(width) + countdown + clock.
pub fn format_line(p: &Prediction, dest_width: usize, now: Option<i64>) -> String {
    let countdown = match p.countdown.trim() {
        "" => "--",
        c => c,
    };
    format!(
        "{}{} {} {}",
        fit(&p.route, ROUTE_WIDTH),
        fit(&p.destination, dest_width),
        countdown,
        clock_text(p, now)
    )
}

/// Widest row `format_line` produces for a three-character countdown.
pub fn line_width(dest_width: usize) -> usize {
    ROUTE_WIDTH + dest_width + " DUE ".len() + "12:59pm".len()
}

/// Sort a fetched set and format the first `max` rows.
pub fn arrival_lines(
    preds: &mut [Prediction],
    max: usize,
    dest_width: usize,
    now: Option<i64>,
) -> Vec<String> {
    sort_predictions(preds);
    preds
        .iter()
        .take(max)
        .map(|p| format_line(p, dest_width, now))
        .collect()
}

/// NB/SB/EB/WB from the first record's direction, `??` otherwise.
pub fn direction_abbrev(preds: &[Prediction]) -> &'static str {
    let Some(first) = preds.first() else {
        return "??";
    };
    let dir = first.direction.to_ascii_uppercase();
    [("NORTH", "NB"), ("SOUTH", "SB"), ("EAST", "EB"), ("WEST", "WB")]
        .iter()
        .find(|(word, _)| dir.contains(word))
        .map(|(_, abbrev)| *abbrev)
        .unwrap_or("??")
}

pub fn stop_name(preds: &[Prediction]) -> String {
    preds
        .first()
        .map(|p| p.stop_name.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(STOP_PLACEHOLDER)
        .to_string()
}
