use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::columns::{contains_any, DAYS};
use super::{cell_sessions, Session};

/// One column boundary: any whitespace run holding a tab, or two or more
/// whitespace characters (`&nbsp;` included).
static COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\t\s*|\s{2,}").unwrap());

const MIN_HEADER_DAYS: usize = 3;

/// Best-effort extraction from flat text laid out like a table: a header
/// line naming the weekdays, then one line per activity with columns
/// separated by tabs or runs of spaces. Lines that don't fit are dropped.
pub fn extract_text_block<S: AsRef<str>>(raw_text: &str, row_keywords: &[S]) -> Vec<Session> {
    let lines: Vec<&str> = raw_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let Some((header_at, days)) = lines
        .iter()
        .enumerate()
        .find_map(|(i, line)| header_days(line).map(|days| (i, days)))
    else {
        return Vec::new();
    };
    debug!("Text header: {}", lines[header_at]);

    let mut sessions = Vec::new();
    for line in &lines[header_at + 1..] {
        if !contains_any(line, row_keywords) {
            continue;
        }
        let cols: Vec<&str> = COLUMN_RE.split(line).map(str::trim).collect();
        let Some((label, cells)) = cols.split_first() else {
            continue;
        };
        debug!("  line: {}", label);
        for (cell, &day) in cells.iter().zip(&days) {
            sessions.extend(cell_sessions(day, label, cell));
        }
    }
    sessions
}

/// Weekdays named in `line`, left to right, if there are enough of them
/// to call it a header.
fn header_days(line: &str) -> Option<Vec<u8>> {
    let lower = line.to_lowercase();
    let mut found: Vec<(usize, u8)> = DAYS
        .iter()
        .enumerate()
        .filter_map(|(i, d)| lower.find(&d.to_lowercase()).map(|pos| (pos, i as u8)))
        .collect();
    if found.len() < MIN_HEADER_DAYS {
        return None;
    }
    found.sort_unstable();
    Some(found.into_iter().map(|(_, day)| day).collect())
}
