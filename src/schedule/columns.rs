use std::collections::BTreeMap;

/// Canonical weekday names; the index is the day number used in sessions.
pub const DAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Column index -> day index, iterated in column order.
pub type DayColumnMap = BTreeMap<usize, u8>;

/// First weekday named anywhere in `text`, case-insensitive.
pub fn day_in(text: &str) -> Option<u8> {
    let lower = text.to_lowercase();
    DAYS.iter()
        .position(|d| lower.contains(&d.to_lowercase()))
        .map(|i| i as u8)
}

/// Map header cells to weekdays. Cells naming no day are left out, so the
/// map may be partial or empty.
pub fn map_columns<S: AsRef<str>>(header_cells: &[S]) -> DayColumnMap {
    header_cells
        .iter()
        .enumerate()
        .filter_map(|(col, cell)| day_in(cell.as_ref()).map(|day| (col, day)))
        .collect()
}

/// Does the row label name one of the wanted activities?
pub fn is_relevant<S: AsRef<str>>(row_label: &str, keywords: &[S]) -> bool {
    contains_any(row_label, keywords)
}

/// Case-insensitive substring test against a keyword list.
pub fn contains_any<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .any(|k| lower.contains(&k.as_ref().to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_with_gaps() {
        let map = map_columns(&["Activity", "Monday", "Tuesday", "", "Friday"]);
        assert_eq!(map, BTreeMap::from([(1, 1), (2, 2), (4, 5)]));
    }

    #[test]
    fn header_case_and_decoration() {
        let map = map_columns(&["", "SUNDAY Jan 5", "monday\n(holiday hours)"]);
        assert_eq!(map, BTreeMap::from([(1, 0), (2, 1)]));
    }

    #[test]
    fn repeated_day_maps_each_column() {
        let map = map_columns(&["Monday AM", "Monday PM"]);
        assert_eq!(map, BTreeMap::from([(0, 1), (1, 1)]));
    }

    #[test]
    fn no_days_is_empty() {
        assert!(map_columns(&["Facility", "Hours"]).is_empty());
        assert!(map_columns::<&str>(&[]).is_empty());
    }

    #[test]
    fn row_filter() {
        assert!(is_relevant("Public Swim (Lengths)", &["public swim"]));
        assert!(!is_relevant("Lane Swim", &["public swim"]));
        assert!(is_relevant("FAMILY SKATE", &["public skate", "family skate"]));
        assert!(!is_relevant("Anything", &[] as &[&str]));
    }
}
