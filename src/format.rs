//! Pure display helpers: dates, scores, addresses, tag labels.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Timelike};

/// Vote totals are fixed-point with 18 decimals.
pub const SCORE_SCALE: i128 = 1_000_000_000_000_000_000;

/// Net score rounding policy: ceiling (toward positive infinity) after
/// scaling, so `1.5` shows as `2` and `-0.5` shows as `0`.
pub const NET_SCORE_ROUNDING: &str = "ceil";

pub const TAG_LABEL_MAX_CHARS: usize = 12;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub fn day_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&day) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// `Mon D<suffix> YYYY h:mm am/pm`, 12-hour clock.
pub fn format_display_date(at: NaiveDateTime) -> String {
    let month = MONTHS[at.month0() as usize];
    let day = at.day();
    let (is_pm, hour12) = at.hour12();
    format!(
        "{month} {day}{suffix} {year} {hour12}:{minute:02} {ampm}",
        suffix = day_suffix(day),
        year = at.year(),
        minute = at.minute(),
        ampm = if is_pm { "pm" } else { "am" },
    )
}

/// Chain timestamp (seconds) to wall-clock time at `offset`.
pub fn chain_time_to_local(timestamp: i64, offset: FixedOffset) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(timestamp, 0).map(|utc| utc.with_timezone(&offset).naive_local())
}

/// `(upvotes - downvotes) / 10^18`, rounded per [`NET_SCORE_ROUNDING`].
pub fn net_score(upvotes: u128, downvotes: u128) -> i128 {
    let raw = if upvotes >= downvotes {
        i128::try_from(upvotes - downvotes).unwrap_or(i128::MAX)
    } else {
        i128::try_from(downvotes - upvotes).map(|d| -d).unwrap_or(i128::MIN)
    };
    ceil_div(raw, SCORE_SCALE)
}

fn ceil_div(n: i128, d: i128) -> i128 {
    let q = n / d;
    if n % d > 0 {
        q + 1
    } else {
        q
    }
}

/// `0x1234...abcd`; short inputs are returned unchanged.
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub fn truncate_tag(name: &str) -> String {
    name.chars().take(TAG_LABEL_MAX_CHARS).collect()
}
