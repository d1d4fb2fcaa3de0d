//! Resolution of free-form deadline text into concrete dates.
//!
//! [`resolve`] turns the raw `dateExpression` cell of a task row plus a
//! reference date into a calendar date, or `None` when the text carries no
//! recognizable date. Callers must treat `None` as "unknown", never as
//! past or future.
//!
//! The vocabulary is bilingual: Indonesian relative words and weekday
//! names are matched alongside their English counterparts, with the
//! Indonesian forms keeping precedence.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex_lite::Regex;

use crate::calendar::{add_days, nearest_weekday, weekday_index};

/// Weekday aliases in the 0 = Sunday .. 6 = Saturday scheme. The first
/// alias contained in the text wins, in this order.
const WEEKDAY_ALIASES: &[(&str, u32)] = &[
    ("minggu", 0),
    ("senin", 1),
    ("selasa", 2),
    ("rabu", 3),
    ("kamis", 4),
    ("jumat", 5),
    ("jum'at", 5),
    ("sabtu", 6),
    ("sunday", 0),
    ("monday", 1),
    ("tuesday", 2),
    ("wednesday", 3),
    ("thursday", 4),
    ("friday", 5),
    ("saturday", 6),
];

/// Month-name formats tried as a last resort against the whole
/// normalized text, e.g. "25 december 2025" or "dec 25 2025".
const FALLBACK_FORMATS: &[&str] = &["%d %B %Y", "%B %d %Y", "%d %b %Y", "%b %d %Y"];

fn sebelum_jam_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"sebelum\s+jam\s+[^,;]*").expect("sebelum-jam regex must compile")
    })
}

fn pukul_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"pukul\s+[^,;]*").expect("pukul regex must compile"))
}

fn jam_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bjam\s+\d{1,2}(:\d{2})?\b").expect("jam regex must compile"))
}

fn at_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bat\s+\d{1,2}(:\d{2})?\s*(am|pm)?\b").expect("at-time regex must compile")
    })
}

fn punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[,()]").expect("punctuation regex must compile"))
}

fn iso_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("iso regex must compile"))
}

fn day_month_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})\b").expect("d/m/y regex must compile")
    })
}

fn day_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})[/-](\d{1,2})\b").expect("d/m regex must compile"))
}

fn besok_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bbesok\b").expect("besok regex must compile"))
}

fn today_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\btoday\b").expect("today regex must compile"))
}

fn tomorrow_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\btomorrow\b").expect("tomorrow regex must compile"))
}

fn day_after_tomorrow_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bday\s+after\s+tomorrow\b").expect("day-after-tomorrow regex must compile")
    })
}

fn next_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bnext\b").expect("next regex must compile"))
}

/// Lowercase the text and strip clock-time phrases and stray
/// punctuation, leaving the date-bearing part of the expression.
fn normalize(raw: &str) -> String {
    let mut s = raw.trim().to_lowercase();
    for re in [
        sebelum_jam_re(),
        pukul_re(),
        jam_re(),
        at_time_re(),
        punctuation_re(),
    ] {
        s = re.replace_all(&s, "").into_owned();
    }
    s.trim().to_string()
}

/// Resolve a raw date expression against `base`.
///
/// Matching runs in a fixed precedence order: ISO date, day-first
/// numeric with year, day-first numeric without year, relative words,
/// weekday names with an optional forward qualifier, month-name
/// formats. A rule that matches text but produces an impossible date
/// (month 13) yields nothing and the later rules still get a chance.
pub fn resolve(raw: &str, base: NaiveDate) -> Option<NaiveDate> {
    let s = normalize(raw);
    if s.is_empty() {
        return None;
    }
    iso_date(&s)
        .or_else(|| day_month_year(&s))
        .or_else(|| day_month(&s, base))
        .or_else(|| relative_word(&s, base))
        .or_else(|| weekday_name(&s, base))
        .or_else(|| month_name(&s))
}

fn iso_date(s: &str) -> Option<NaiveDate> {
    let caps = iso_re().captures(s)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn day_month_year(s: &str) -> Option<NaiveDate> {
    let caps = day_month_year_re().captures(s)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    // two-digit years are shorthand for the 2000s
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn day_month(s: &str, base: NaiveDate) -> Option<NaiveDate> {
    let caps = day_month_re().captures(s)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(base.year(), month, day)
}

fn relative_word(s: &str, base: NaiveDate) -> Option<NaiveDate> {
    if s.contains("hari ini") {
        return Some(base);
    }
    if besok_re().is_match(s) {
        return Some(add_days(base, 1));
    }
    if s.contains("lusa") {
        return Some(add_days(base, 2));
    }
    if today_re().is_match(s) {
        return Some(base);
    }
    if day_after_tomorrow_re().is_match(s) {
        return Some(add_days(base, 2));
    }
    if tomorrow_re().is_match(s) {
        return Some(add_days(base, 1));
    }
    None
}

fn weekday_name(s: &str, base: NaiveDate) -> Option<NaiveDate> {
    for &(alias, target) in WEEKDAY_ALIASES {
        if !s.contains(alias) {
            continue;
        }
        let mut date = nearest_weekday(base, target);
        // "rabu depan" said on a Monday means next week's Wednesday,
        // but said on a Thursday the nearest hit is already a week out.
        // Advance only while the hit is still later in the base's own
        // Sunday-indexed week.
        let forward = s.contains("depan") || next_re().is_match(s);
        if forward && weekday_index(date) >= weekday_index(base) && date > base {
            date = add_days(date, 7);
        }
        return Some(date);
    }
    None
}

fn month_name(s: &str) -> Option<NaiveDate> {
    FALLBACK_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}
