use tracing::debug;

use super::columns::{contains_any, is_relevant, map_columns};
use super::document::Table;
use super::{cell_sessions, Session};

/// Pull sessions for the wanted rows out of one schedule table.
///
/// The first row is the header whatever its markup. Tables that never
/// mention a row keyword, or whose header names no weekday, yield nothing.
pub fn extract_table<S: AsRef<str>>(table: &Table, row_keywords: &[S]) -> Vec<Session> {
    if !contains_any(&table.text, row_keywords) {
        return Vec::new();
    }
    debug!(
        "Table: {}",
        table.caption.as_deref().unwrap_or("(no caption)")
    );

    let Some((header, body)) = table.rows.split_first() else {
        return Vec::new();
    };
    let col_to_day = map_columns(header);
    if col_to_day.is_empty() {
        debug!("  no weekday header, skipped");
        return Vec::new();
    }

    let mut sessions = Vec::new();
    for row in body {
        let Some(label) = row.first() else {
            continue;
        };
        let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
        if !is_relevant(&label, row_keywords) {
            continue;
        }
        debug!("  row: {}", label);

        for (&col, &day) in &col_to_day {
            // ragged rows: only the missing columns are lost
            let Some(cell) = row.get(col) else {
                continue;
            };
            sessions.extend(cell_sessions(day, &label, cell));
        }
    }
    sessions
}

/// Run [`extract_table`] over every table and concatenate the results.
pub fn extract_tables<S: AsRef<str>>(tables: &[Table], row_keywords: &[S]) -> Vec<Session> {
    tables
        .iter()
        .flat_map(|t| extract_table(t, row_keywords))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SWIM: &[&str] = &["public swim", "wave swim"];

    fn table(rows: &[&[&str]]) -> Table {
        Table::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn session(day: u8, label: &str, start: u16, end: u16, play_free: bool) -> Session {
        Session {
            day,
            label: label.into(),
            start,
            end,
            play_free,
        }
    }

    #[test]
    fn two_day_table() {
        let t = table(&[
            &["Activity", "Sunday", "Monday"],
            &["Public Swim", "9 - 11 am", "noon - 1 pm"],
        ]);
        assert_eq!(
            extract_table(&t, SWIM),
            vec![
                session(0, "Public Swim", 540, 660, false),
                session(1, "Public Swim", 720, 780, false),
            ]
        );
    }

    #[test]
    fn irrelevant_rows_skipped() {
        let t = table(&[
            &["Activity", "Sunday"],
            &["Lane swim", "6 - 9 am"],
            &["Aquafit", "10 - 11 am"],
            &["Wave swim", "2 - 4 pm"],
        ]);
        assert_eq!(
            extract_table(&t, SWIM),
            vec![session(0, "Wave swim", 840, 960, false)]
        );
    }

    #[test]
    fn guard_rejects_unrelated_table() {
        let t = table(&[
            &["Facility", "Monday", "Tuesday"],
            &["Front desk", "6 am - 10 pm", "6 am - 10 pm"],
        ]);
        assert!(extract_table(&t, SWIM).is_empty());
    }

    #[test]
    fn no_day_header_skipped() {
        let t = table(&[
            &["Public swim", "Fee"],
            &["Public swim", "9 - 10 am"],
        ]);
        assert!(extract_table(&t, SWIM).is_empty());
    }

    #[test]
    fn ragged_row_keeps_present_columns() {
        let t = table(&[
            &["Activity", "Monday", "Tuesday", "Wednesday"],
            &["Public swim", "7 - 8 pm"],
        ]);
        assert_eq!(
            extract_table(&t, SWIM),
            vec![session(1, "Public swim", 1140, 1200, false)]
        );
    }

    #[test]
    fn play_free_and_multiple_ranges() {
        let t = table(&[
            &["", "Saturday"],
            &["Public swim", "1 - 2 pm (play free), 3 - 4 pm (play free)"],
        ]);
        assert_eq!(
            extract_table(&t, SWIM),
            vec![
                session(6, "Public swim", 780, 840, true),
                session(6, "Public swim", 900, 960, true),
            ]
        );
    }

    #[test]
    fn tables_concatenated_in_order() {
        let a = table(&[&["Activity", "Friday"], &["Public swim", "6 - 7 pm"]]);
        let b = table(&[&["Activity", "Friday"], &["Public swim", "6 - 7 pm"]]);
        let sessions = extract_tables(&[a, b], SWIM);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0], sessions[1]);
    }
}
