use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::schedule::columns::contains_any;
use crate::schedule::{Document, Orchestrator, Session};
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VenueKind {
    Pool,
    Rink,
}

impl VenueKind {
    pub const ALL: [VenueKind; 2] = [VenueKind::Pool, VenueKind::Rink];

    pub fn as_str(self) -> &'static str {
        match self {
            VenueKind::Pool => "pool",
            VenueKind::Rink => "rink",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pool" => Some(VenueKind::Pool),
            "rink" => Some(VenueKind::Rink),
            _ => None,
        }
    }
}

impl fmt::Display for VenueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the venue list for one kind comes from.
#[derive(Debug, Clone)]
pub enum VenueSource {
    Fixed(Vec<Venue>),
    Discover { index_url: String },
}

/// What one venue page gave up.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VenueScan {
    pub sessions: Vec<Session>,
    pub wave: bool,
}

/// Extract sessions from one fetched venue page.
///
/// Pages that never mention the kind's check keywords are not parsed.
/// `wave` is only ever set for pools.
pub fn scan_venue(
    html: &str,
    kind: VenueKind,
    settings: &Settings,
    orchestrator: &Orchestrator,
) -> VenueScan {
    let keywords = &settings.keywords;
    let wave = kind == VenueKind::Pool && contains_any(html, &keywords.wave_keywords);

    if !contains_any(html, keywords.check_keywords(kind)) {
        debug!("No relevant sessions mentioned, skipping");
        return VenueScan {
            sessions: Vec::new(),
            wave,
        };
    }

    let doc = Document::parse(html);
    let sessions = orchestrator.extract(&doc, keywords.row_keywords(kind));
    info!("-> {} sessions", sessions.len());
    VenueScan { sessions, wave }
}
