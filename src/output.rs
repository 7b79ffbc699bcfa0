use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::Session;
use crate::venue::{Venue, VenueKind, VenueScan};

/// The persisted schedule artifact other tooling reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleData {
    pub scraped_at: DateTime<Utc>,
    pub pools: Vec<VenueSchedule>,
    pub rinks: Vec<VenueSchedule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueSchedule {
    pub id: String,
    pub name: String,
    pub address: String,
    /// Pools only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave: Option<bool>,
    pub url: String,
    pub sessions: Vec<Session>,
}

impl ScheduleData {
    pub fn new(scraped_at: DateTime<Utc>) -> Self {
        ScheduleData {
            scraped_at,
            pools: Vec::new(),
            rinks: Vec::new(),
        }
    }

    /// Record a scanned venue. Venues without sessions are left out.
    pub fn push(&mut self, kind: VenueKind, venue: Venue, scan: VenueScan) {
        if scan.sessions.is_empty() {
            return;
        }
        let entry = VenueSchedule {
            id: venue.id,
            name: venue.name,
            address: venue.address,
            wave: (kind == VenueKind::Pool).then_some(scan.wave),
            url: venue.url,
            sessions: scan.sessions,
        };
        match kind {
            VenueKind::Pool => self.pools.push(entry),
            VenueKind::Rink => self.rinks.push(entry),
        }
    }

    pub fn venues(&self, kind: VenueKind) -> &[VenueSchedule] {
        match kind {
            VenueKind::Pool => &self.pools,
            VenueKind::Rink => &self.rinks,
        }
    }

    pub fn session_count(&self, kind: VenueKind) -> usize {
        self.venues(kind).iter().map(|v| v.sessions.len()).sum()
    }

    pub fn total_sessions(&self) -> usize {
        VenueKind::ALL.iter().map(|&k| self.session_count(k)).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_json()? + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
