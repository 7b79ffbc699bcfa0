use std::path::Path;

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::venue::{Venue, VenueKind};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS venues (
            id         INTEGER PRIMARY KEY,
            kind       TEXT NOT NULL CHECK(kind IN ('pool','rink')),
            slug       TEXT NOT NULL,
            name       TEXT NOT NULL,
            url        TEXT UNIQUE NOT NULL,
            address    TEXT NOT NULL DEFAULT '',
            fetched    BOOLEAN NOT NULL DEFAULT 0,
            fetched_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_venues_fetched ON venues(fetched);

        CREATE TABLE IF NOT EXISTS page_data (
            id         INTEGER PRIMARY KEY,
            venue_id   INTEGER NOT NULL REFERENCES venues(id),
            url        TEXT NOT NULL,
            html       TEXT,
            status     INTEGER,
            error      TEXT,
            latency_ms INTEGER,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_page_data_venue ON page_data(venue_id);
        ",
    )?;
    Ok(())
}

/// A venue row with its DB id.
#[derive(Debug, Clone)]
pub struct StoredVenue {
    pub id: i64,
    pub kind: VenueKind,
    pub venue: Venue,
}

/// One fetch attempt, successful or not.
#[derive(Debug, Clone)]
pub struct PageRow {
    pub venue_id: i64,
    pub url: String,
    pub html: Option<String>,
    pub status: Option<i64>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

/// Latest successfully fetched page of a venue.
#[derive(Debug, Clone)]
pub struct StoredPage {
    pub venue: Venue,
    pub html: String,
}

pub struct Stats {
    pub total: i64,
    pub fetched: i64,
    pub unfetched: i64,
    pub pages: i64,
    pub errors: i64,
}

/// Insert venues, skipping URLs already known. Returns the number inserted.
pub fn insert_venues(conn: &Connection, kind: VenueKind, venues: &[Venue]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO venues (kind, slug, name, url, address) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let mut inserted = 0;
    for v in venues {
        inserted += stmt.execute(params![kind.as_str(), v.id, v.name, v.url, v.address])?;
    }
    Ok(inserted)
}

pub fn fetch_unfetched(conn: &Connection, limit: Option<usize>) -> Result<Vec<StoredVenue>> {
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    let mut stmt = conn.prepare(
        "SELECT id, kind, slug, name, url, address FROM venues
         WHERE fetched = 0 ORDER BY id LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        let kind: String = row.get(1)?;
        Ok((
            row.get::<_, i64>(0)?,
            kind,
            Venue {
                id: row.get(2)?,
                name: row.get(3)?,
                url: row.get(4)?,
                address: row.get(5)?,
            },
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, kind, venue) = row?;
        if let Some(kind) = VenueKind::parse(&kind) {
            out.push(StoredVenue { id, kind, venue });
        }
    }
    Ok(out)
}

pub fn save_page(conn: &Connection, row: &PageRow) -> Result<()> {
    conn.execute(
        "INSERT INTO page_data (venue_id, url, html, status, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![row.venue_id, row.url, row.html, row.status, row.error, row.latency_ms],
    )?;
    conn.execute(
        "UPDATE venues SET fetched = 1, fetched_at = datetime('now') WHERE id = ?1",
        params![row.venue_id],
    )?;
    Ok(())
}

/// Latest page with HTML for every venue of `kind`, in venue insertion order.
pub fn fetch_pages(conn: &Connection, kind: VenueKind) -> Result<Vec<StoredPage>> {
    let mut stmt = conn.prepare(
        "SELECT v.slug, v.name, v.url, v.address, p.html
         FROM venues v
         JOIN page_data p ON p.id = (
             SELECT MAX(id) FROM page_data WHERE venue_id = v.id AND html IS NOT NULL
         )
         WHERE v.kind = ?1
         ORDER BY v.id",
    )?;
    let rows = stmt.query_map(params![kind.as_str()], |row| {
        Ok(StoredPage {
            venue: Venue {
                id: row.get(0)?,
                name: row.get(1)?,
                url: row.get(2)?,
                address: row.get(3)?,
            },
            html: row.get(4)?,
        })
    })?;
    let pages = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(pages)
}

/// Mark every venue unfetched so the next fetch refreshes all pages.
pub fn reset_fetched(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("UPDATE venues SET fetched = 0", [])?)
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<i64> {
        Ok(conn
            .query_row(sql, [], |r| r.get::<_, i64>(0))
            .optional()?
            .unwrap_or(0))
    };
    let total = count("SELECT COUNT(*) FROM venues")?;
    let fetched = count("SELECT COUNT(*) FROM venues WHERE fetched = 1")?;
    Ok(Stats {
        total,
        fetched,
        unfetched: total - fetched,
        pages: count("SELECT COUNT(*) FROM page_data WHERE html IS NOT NULL")?,
        errors: count("SELECT COUNT(*) FROM page_data WHERE error IS NOT NULL")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn venue(id: &str) -> Venue {
        Venue {
            id: id.into(),
            name: format!("{} pool", id),
            url: format!("https://example.org/place-listing/{}", id),
            address: String::new(),
        }
    }

    #[test]
    fn insert_is_idempotent() {
        let conn = memory_db();
        assert_eq!(insert_venues(&conn, VenueKind::Pool, &[venue("a"), venue("b")]).unwrap(), 2);
        assert_eq!(insert_venues(&conn, VenueKind::Pool, &[venue("b"), venue("c")]).unwrap(), 1);
        assert_eq!(fetch_unfetched(&conn, None).unwrap().len(), 3);
        assert_eq!(fetch_unfetched(&conn, Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn unfetched_venues_carry_their_kind() {
        let conn = memory_db();
        insert_venues(&conn, VenueKind::Pool, &[venue("p")]).unwrap();
        insert_venues(&conn, VenueKind::Rink, &[venue("r")]).unwrap();
        let kinds: Vec<(String, VenueKind)> = fetch_unfetched(&conn, None)
            .unwrap()
            .into_iter()
            .map(|s| (s.venue.id, s.kind))
            .collect();
        assert_eq!(kinds, vec![("p".into(), VenueKind::Pool), ("r".into(), VenueKind::Rink)]);
    }

    #[test]
    fn latest_successful_page_wins() {
        let conn = memory_db();
        insert_venues(&conn, VenueKind::Rink, &[venue("r")]).unwrap();
        let id = fetch_unfetched(&conn, None).unwrap()[0].id;

        let page = |html: Option<&str>| PageRow {
            venue_id: id,
            url: "https://example.org/place-listing/r".into(),
            html: html.map(String::from),
            status: Some(200),
            error: if html.is_some() { None } else { Some("HTTP 503".into()) },
            latency_ms: Some(10),
        };
        save_page(&conn, &page(Some("<p>old</p>"))).unwrap();
        save_page(&conn, &page(Some("<p>new</p>"))).unwrap();
        save_page(&conn, &page(None)).unwrap();

        let pages = fetch_pages(&conn, VenueKind::Rink).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].html, "<p>new</p>");
        assert!(fetch_pages(&conn, VenueKind::Pool).unwrap().is_empty());

        let stats = get_stats(&conn).unwrap();
        assert_eq!((stats.total, stats.fetched, stats.pages, stats.errors), (1, 1, 2, 1));
        assert!(fetch_unfetched(&conn, None).unwrap().is_empty());
        assert_eq!(reset_fetched(&conn).unwrap(), 1);
    }
}
