//! Elapsed-hours computation.
//!
//! Neither entry point can fail: anything unusable resolves to 0 hours.
use crate::util::{parse_timestamp_safe, round2};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventDuration {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub hours: f64,
    pub valid: bool,
}

/// Hours between two raw timestamp cells, rounded to 2 decimals.
///
/// Unparseable timestamps or `end < start` give 0 hours with `valid = false`;
/// the event still counts, it just contributes no duration.
pub fn hours_between(start: Option<&str>, end: Option<&str>) -> EventDuration {
    let start = parse_timestamp_safe(start);
    let end = parse_timestamp_safe(end);
    let (hours, valid) = match (start, end) {
        (Some(s), Some(e)) if e >= s => (round2((e - s).num_seconds() as f64 / 3600.0), true),
        _ => (0.0, false),
    };
    EventDuration {
        start,
        end,
        hours,
        valid,
    }
}

/// Parse a free-form elapsed-time cell into hours, rounded to 2 decimals.
///
/// Accepts `H:MM[:SS[.fff]]` (hours may exceed 24), an optional
/// `N day(s)[,]` prefix, and unit forms like `2h 30m` or `1d4h`.
/// Returns 0 for anything else, and for negative spans.
pub fn parse_elapsed_hours(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }
    let seconds = parse_clock(s)
        .or_else(|| parse_days_and_clock(s))
        .or_else(|| parse_units(s))
        .unwrap_or(0.0);
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0.0;
    }
    round2(seconds / 3600.0)
}

fn parse_clock(s: &str) -> Option<f64> {
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let parts: Vec<&str> = s.split(':').collect();
    let (h, m, sec) = match parts.as_slice() {
        [h, m] => (*h, *m, "0"),
        [h, m, sec] => (*h, *m, *sec),
        _ => return None,
    };
    let h: u64 = h.trim().parse().ok()?;
    let m: u64 = m.trim().parse().ok()?;
    let sec: f64 = sec.trim().parse().ok()?;
    if m >= 60 || !(0.0..60.0).contains(&sec) {
        return None;
    }
    let whole = h.checked_mul(3600)?.checked_add(m * 60)?;
    let total = whole as f64 + sec;
    Some(if negative { -total } else { total })
}

fn parse_days_and_clock(s: &str) -> Option<f64> {
    let mut words = s.splitn(3, char::is_whitespace);
    let days: f64 = words.next()?.parse().ok()?;
    let unit = words.next()?.trim_end_matches(',');
    if !unit.eq_ignore_ascii_case("day") && !unit.eq_ignore_ascii_case("days") {
        return None;
    }
    let clock = match words.next().map(str::trim) {
        Some(rest) if !rest.is_empty() => parse_clock(rest)?,
        _ => 0.0,
    };
    Some(days * 86_400.0 + clock)
}

fn parse_units(s: &str) -> Option<f64> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact.to_ascii_lowercase();
    let mut total = 0.0;
    let mut number = String::new();
    let mut seen_unit = false;
    let mut chars = compact.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            continue;
        }
        let mut unit = c.to_string();
        while let Some(next) = chars.peek() {
            if next.is_ascii_alphabetic() {
                unit.push(*next);
                chars.next();
            } else {
                break;
            }
        }
        let scale = match unit.as_str() {
            "d" | "day" | "days" => 86_400.0,
            "h" | "hr" | "hrs" | "hour" | "hours" => 3_600.0,
            "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
            "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
            _ => return None,
        };
        let value: f64 = number.parse().ok()?;
        total += value * scale;
        number.clear();
        seen_unit = true;
    }
    if !number.is_empty() || !seen_unit {
        return None;
    }
    Some(total)
}
