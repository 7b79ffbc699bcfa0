pub mod columns;
pub mod document;
pub mod orchestrator;
pub mod table;
pub mod text_block;
pub mod time;

use serde::{Deserialize, Serialize};

pub use document::Document;
pub use orchestrator::{extract_sessions, ExtractionStrategy, Orchestrator};
pub use time::TimeRange;

/// One drop-in window on one weekday. `day` counts from Sunday = 0,
/// `start`/`end` are minutes since midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub day: u8,
    pub label: String,
    pub start: u16,
    pub end: u16,
    #[serde(rename = "playFree")]
    pub play_free: bool,
}

/// Turn one schedule cell into sessions for `day`.
///
/// The "play free" marker is read from the raw cell, before the range
/// parser strips the annotation.
pub(crate) fn cell_sessions(day: u8, label: &str, cell: &str) -> Vec<Session> {
    let play_free = cell.to_lowercase().contains("play free");
    time::parse_ranges(cell)
        .into_iter()
        .map(|r| Session {
            day,
            label: label.to_string(),
            start: r.start,
            end: r.end,
            play_free,
        })
        .collect()
}
