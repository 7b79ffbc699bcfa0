use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(am|pm)").unwrap());
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2}(?::\d{2})?(?:\s*[ap]m)?)\s*[-\x{2013}\x{2014}]\s*(\d{1,2}(?::\d{2})?\s*[ap]m)")
        .unwrap()
});
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[ap]m").unwrap());
static DOTTED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b([ap])\.m\b\.?").unwrap());
static NOON_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bnoon\b").unwrap());
static MIDNIGHT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bmidnight\b").unwrap());
static PLAY_FREE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\(play free\)").unwrap());
static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__.*?__").unwrap());
static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,\n]+").unwrap());

const NO_SESSION: &[&str] = &["", "n/a", "-", "\u{2014}"];

/// Minutes in a day; an explicit midnight end maps here.
pub const END_OF_DAY: u16 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: u16,
    pub end: u16,
}

/// Parse one clock time such as "9:30 am" or "12 PM" into minutes since
/// midnight. The am/pm marker is mandatory.
pub fn parse_time(token: &str) -> Option<u16> {
    let s = token
        .trim()
        .to_lowercase()
        .replace('\u{2013}', "-")
        .replace('\u{a0}', " ");
    let s = DOTTED_RE.replace_all(&s, "${1}m");

    let caps = TIME_RE.captures(&s)?;
    let hour: u16 = caps[1].parse().ok()?;
    let minute: u16 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if !(1..=12).contains(&hour) || minute > 59 {
        return None;
    }

    let hour = match (&caps[3], hour) {
        ("am", 12) => 0,
        ("pm", 12) => 12,
        ("pm", h) => h + 12,
        (_, h) => h,
    };
    Some(hour * 60 + minute)
}

/// Parse a schedule cell holding zero or more ranges, e.g.
/// "Noon - 1 pm, 4:30 - 9 pm". Tokens that don't parse are dropped.
pub fn parse_ranges(cell_text: &str) -> Vec<TimeRange> {
    let text = cell_text.trim().replace('\u{a0}', " ");
    if NO_SESSION.contains(&text.to_lowercase().as_str()) {
        return Vec::new();
    }

    let text = NOON_RE.replace_all(&text, "12:00 pm");
    let text = MIDNIGHT_RE.replace_all(&text, "12:00 am");
    let text = PLAY_FREE_RE.replace_all(&text, "");
    let text = EMPHASIS_RE.replace_all(&text, "");
    let text = DOTTED_RE.replace_all(&text, "${1}m");

    SPLIT_RE
        .split(&text)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(parse_range_token)
        .collect()
}

fn parse_range_token(part: &str) -> Option<TimeRange> {
    let caps = RANGE_RE.captures(part)?;
    let end_str = caps[2].trim();
    let mut start_str = caps[1].trim().to_string();

    // "9:30 - 11 am": the start borrows the end's marker
    if !MARKER_RE.is_match(&start_str) {
        let marker = MARKER_RE.find(end_str)?;
        start_str.push(' ');
        start_str.push_str(marker.as_str());
    }

    let start = parse_time(&start_str)?;
    let end = match parse_time(end_str)? {
        0 => END_OF_DAY,
        e => e,
    };
    Some(TimeRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u16, end: u16) -> TimeRange {
        TimeRange { start, end }
    }

    #[test]
    fn clock_times() {
        assert_eq!(parse_time("12:00 am"), Some(0));
        assert_eq!(parse_time("12:30 pm"), Some(750));
        assert_eq!(parse_time("9am"), Some(540));
        assert_eq!(parse_time("  4:45 PM "), Some(16 * 60 + 45));
        assert_eq!(parse_time("11:59 pm"), Some(1439));
        assert_eq!(parse_time("7 p.m."), Some(19 * 60));
    }

    #[test]
    fn clock_time_failures() {
        assert_eq!(parse_time("garbage"), None);
        assert_eq!(parse_time("9:30"), None);
        assert_eq!(parse_time(""), None);
        assert_eq!(parse_time("13 pm"), None);
        assert_eq!(parse_time("9:75 am"), None);
    }

    #[test]
    fn noon_range() {
        assert_eq!(parse_ranges("Noon - 1 pm"), vec![range(720, 780)]);
    }

    #[test]
    fn shared_marker_and_multiple_ranges() {
        assert_eq!(
            parse_ranges("9:30 - 11 am, 4:30 - 9 pm"),
            vec![range(570, 660), range(990, 1260)]
        );
    }

    #[test]
    fn empty_cells() {
        assert!(parse_ranges("n/a").is_empty());
        assert!(parse_ranges("N/A").is_empty());
        assert!(parse_ranges("").is_empty());
        assert!(parse_ranges(" - ").is_empty());
        assert!(parse_ranges("\u{2014}").is_empty());
    }

    #[test]
    fn play_free_annotation_stripped() {
        assert_eq!(parse_ranges("1 - 2 pm (play free)"), vec![range(780, 840)]);
    }

    #[test]
    fn emphasis_markers_stripped() {
        assert_eq!(
            parse_ranges("__Cancelled Oct 14__ 6 - 7:30 pm"),
            vec![range(1080, 1170)]
        );
    }

    #[test]
    fn malformed_token_dropped_others_kept() {
        assert_eq!(
            parse_ranges("closed, 10 - 11:30 am\ncall ahead"),
            vec![range(600, 690)]
        );
    }

    #[test]
    fn en_dash_and_newline_separators() {
        assert_eq!(
            parse_ranges("7 \u{2013} 8 am\n12:15 \u{2013} 1 pm"),
            vec![range(420, 480), range(735, 780)]
        );
    }

    #[test]
    fn midnight_end_is_end_of_day() {
        assert_eq!(parse_ranges("10 pm - midnight"), vec![range(1320, END_OF_DAY)]);
    }

    #[test]
    fn noon_is_word_bounded() {
        assert!(parse_ranges("Afternoons - 2 pm").is_empty());
    }

    #[test]
    fn inverted_range_kept_as_parsed() {
        assert_eq!(parse_ranges("11 pm - 9 am"), vec![range(1380, 540)]);
    }

    #[test]
    fn start_with_own_marker() {
        assert_eq!(parse_ranges("11:30 am - 1 pm"), vec![range(690, 780)]);
    }
}
