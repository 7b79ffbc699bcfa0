use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::schedule::orchestrator::DEFAULT_CONTAINERS;
use crate::venue::{Venue, VenueKind, VenueSource};

const DEFAULT_CONFIG_FILE: &str = "dropin.toml";

/// Keyword lists steering extraction. Matching is case-insensitive.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    #[serde(rename = "swimKeywords", alias = "swimkeywords")]
    pub swim_keywords: Vec<String>,
    #[serde(rename = "skateKeywords", alias = "skatekeywords")]
    pub skate_keywords: Vec<String>,
    #[serde(rename = "waveKeywords", alias = "wavekeywords")]
    pub wave_keywords: Vec<String>,
    /// A pool page must mention one of these before it is parsed.
    #[serde(rename = "poolCheckKeywords", alias = "poolcheckkeywords")]
    pub pool_check_keywords: Vec<String>,
    #[serde(rename = "rinkCheckKeywords", alias = "rinkcheckkeywords")]
    pub rink_check_keywords: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        KeywordConfig {
            swim_keywords: strings(&["public swim", "wave swim"]),
            skate_keywords: strings(&[
                "public skate",
                "public skating",
                "family skate",
                "family skating",
                "50+ skate",
            ]),
            wave_keywords: strings(&["wave pool", "wave tank", "splash wave", "wave swim"]),
            pool_check_keywords: strings(&["public swim", "wave swim"]),
            rink_check_keywords: strings(&[
                "public skate",
                "public skating",
                "family skate",
                "family skating",
            ]),
        }
    }
}

impl KeywordConfig {
    pub fn row_keywords(&self, kind: VenueKind) -> &[String] {
        match kind {
            VenueKind::Pool => &self.swim_keywords,
            VenueKind::Rink => &self.skate_keywords,
        }
    }

    pub fn check_keywords(&self, kind: VenueKind) -> &[String] {
        match kind {
            VenueKind::Pool => &self.pool_check_keywords,
            VenueKind::Rink => &self.rink_check_keywords,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub keywords: KeywordConfig,
    pub base_url: String,
    pub pool_index_url: String,
    pub rink_index_url: String,
    /// Substring identifying venue links on an index page.
    pub listing_pattern: String,
    /// Fixed venue lists; when empty the index page is crawled instead.
    pub pools: Vec<Venue>,
    pub rinks: Vec<Venue>,
    pub container_selectors: Vec<String>,
    pub db_path: PathBuf,
    pub output: PathBuf,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            keywords: KeywordConfig::default(),
            base_url: "https://ottawa.ca".into(),
            pool_index_url: "https://ottawa.ca/en/recreation-and-parks/swimming/\
                             drop-swimming-and-aquafitness/drop-ins-indoor-pool-locations"
                .into(),
            rink_index_url: "https://ottawa.ca/en/recreation-and-parks/skating/\
                             drop-skating/drop-skating-locations"
                .into(),
            listing_pattern: "place-listing".into(),
            pools: Vec::new(),
            rinks: Vec::new(),
            container_selectors: strings(DEFAULT_CONTAINERS),
            db_path: "data/dropin.sqlite".into(),
            output: "schedule_data.json".into(),
            concurrency: 4,
            timeout_secs: 30,
            max_retries: 3,
            base_backoff_ms: 2000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36"
                .into(),
        }
    }
}

impl Settings {
    /// Defaults, then `path` (or `dropin.toml` if present), then
    /// `DROPIN_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("DROPIN").try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize::<Settings>()
            .context("Invalid configuration")?;
        Ok(settings)
    }

    pub fn venue_source(&self, kind: VenueKind) -> VenueSource {
        let (fixed, index_url) = match kind {
            VenueKind::Pool => (&self.pools, &self.pool_index_url),
            VenueKind::Rink => (&self.rinks, &self.rink_index_url),
        };
        if fixed.is_empty() {
            VenueSource::Discover {
                index_url: index_url.clone(),
            }
        } else {
            VenueSource::Fixed(fixed.clone())
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_known_keywords() {
        let s = Settings::default();
        assert_eq!(s.keywords.row_keywords(VenueKind::Pool), ["public swim", "wave swim"]);
        assert!(s.keywords.skate_keywords.contains(&"50+ skate".to_string()));
        assert!(!s.keywords.check_keywords(VenueKind::Rink).contains(&"50+ skate".to_string()));
        assert!(s.pool_index_url.ends_with("/drop-ins-indoor-pool-locations"));
    }

    #[test]
    fn toml_file_overrides() {
        let dir = std::env::temp_dir().join(format!("dropin-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("custom.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
concurrency = 2

[keywords]
swimKeywords = ["public swim"]

[[pools]]
id = "example-pool"
name = "Example Pool"
url = "https://example.org/place-listing/example-pool"
"#
        )
        .unwrap();

        let s = Settings::load(Some(path.as_path())).unwrap();
        assert_eq!(s.concurrency, 2);
        assert_eq!(s.keywords.swim_keywords, ["public swim"]);
        assert_eq!(s.keywords.wave_keywords, KeywordConfig::default().wave_keywords);
        match s.venue_source(VenueKind::Pool) {
            VenueSource::Fixed(v) => assert_eq!(v[0].id, "example-pool"),
            other => panic!("expected fixed venues, got {:?}", other),
        }
        assert!(matches!(s.venue_source(VenueKind::Rink), VenueSource::Discover { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }
}
