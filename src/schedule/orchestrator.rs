use itertools::Itertools;
use tracing::debug;

use super::columns::contains_any;
use super::document::Document;
use super::table::extract_tables;
use super::text_block::extract_text_block;
use super::Session;

/// Container selectors tried by the text fallback, most specific first.
pub const DEFAULT_CONTAINERS: &[&str] = &[
    "[class*='schedule']",
    "[id*='schedule']",
    ".field--name-body",
    "main",
    "[role='main']",
    "article",
    "#main-content",
];

/// One way of getting sessions out of a venue page.
pub trait ExtractionStrategy {
    fn name(&self) -> &'static str;
    fn extract(&self, doc: &Document, row_keywords: &[String]) -> Vec<Session>;
}

/// Structured `<table>` markup. Authoritative when it yields anything.
pub struct TableStrategy;

impl ExtractionStrategy for TableStrategy {
    fn name(&self) -> &'static str {
        "table"
    }

    fn extract(&self, doc: &Document, row_keywords: &[String]) -> Vec<Session> {
        extract_tables(&doc.tables(), row_keywords)
    }
}

/// Flat text of the smallest page regions that mention a row keyword.
pub struct ContainerTextStrategy {
    pub selectors: Vec<String>,
    pub max_candidates: usize,
}

impl Default for ContainerTextStrategy {
    fn default() -> Self {
        ContainerTextStrategy {
            selectors: DEFAULT_CONTAINERS.iter().map(|s| s.to_string()).collect(),
            max_candidates: 3,
        }
    }
}

impl ExtractionStrategy for ContainerTextStrategy {
    fn name(&self) -> &'static str {
        "container-text"
    }

    fn extract(&self, doc: &Document, row_keywords: &[String]) -> Vec<Session> {
        doc.containers(&self.selectors)
            .into_iter()
            .filter(|text| contains_any(text, row_keywords))
            .sorted_by_key(String::len)
            .take(self.max_candidates)
            .map(|text| extract_text_block(&text, row_keywords))
            .find(|sessions| !sessions.is_empty())
            .unwrap_or_default()
    }
}

/// Whole-page text, the last resort.
pub struct FullTextStrategy;

impl ExtractionStrategy for FullTextStrategy {
    fn name(&self) -> &'static str {
        "full-text"
    }

    fn extract(&self, doc: &Document, row_keywords: &[String]) -> Vec<Session> {
        extract_text_block(&doc.visible_text(), row_keywords)
    }
}

/// Ordered strategy chain; the first non-empty result wins.
pub struct Orchestrator {
    strategies: Vec<Box<dyn ExtractionStrategy + Send + Sync>>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Orchestrator::with_containers(
            DEFAULT_CONTAINERS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl Orchestrator {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy + Send + Sync>>) -> Self {
        Orchestrator { strategies }
    }

    /// Table, then container text over `selectors`, then full page text.
    pub fn with_containers(selectors: Vec<String>) -> Self {
        Orchestrator::new(vec![
            Box::new(TableStrategy),
            Box::new(ContainerTextStrategy {
                selectors,
                ..Default::default()
            }),
            Box::new(FullTextStrategy),
        ])
    }

    pub fn extract(&self, doc: &Document, row_keywords: &[String]) -> Vec<Session> {
        for strategy in &self.strategies {
            let sessions = strategy.extract(doc, row_keywords);
            if !sessions.is_empty() {
                debug!("{} -> {} sessions", strategy.name(), sessions.len());
                return sessions;
            }
            debug!("{} -> nothing", strategy.name());
        }
        Vec::new()
    }
}

/// Parse `html` and run the default strategy chain over it.
pub fn extract_sessions(html: &str, row_keywords: &[String]) -> Vec<Session> {
    Orchestrator::default().extract(&Document::parse(html), row_keywords)
}
