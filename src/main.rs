use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use tracing::{info, warn};

use dropin_schedules::db;
use dropin_schedules::discover::discover_venues;
use dropin_schedules::fetch::{self, HttpFetcher};
use dropin_schedules::output::ScheduleData;
use dropin_schedules::schedule::Orchestrator;
use dropin_schedules::settings::Settings;
use dropin_schedules::venue::{scan_venue, VenueKind, VenueSource};

#[derive(Parser)]
#[command(name = "dropin_schedules", about = "Drop-in swim and skate schedule scraper")]
struct Cli {
    /// Config file (default: ./dropin.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve pool and rink venue lists and store them
    Init,
    /// Fetch unfetched venue pages
    Fetch {
        /// Max pages to fetch (default: all unfetched)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Refetch every venue, not just new ones
        #[arg(long)]
        refresh: bool,
    },
    /// Extract sessions from stored pages and write the schedule JSON
    Extract {
        /// Output path (default from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Init + fetch + extract in one go
    Run {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show page store statistics
    Stats,
    /// Extract sessions from a local HTML file and print them as JSON
    Parse {
        file: PathBuf,
        #[arg(short, long, value_enum, default_value = "pool")]
        kind: KindArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Pool,
    Rink,
}

impl From<KindArg> for VenueKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Pool => VenueKind::Pool,
            KindArg::Rink => VenueKind::Rink,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Init => {
            let conn = open_db(&settings)?;
            init_venues(&conn, &settings).await
        }
        Commands::Fetch { limit, refresh } => {
            let conn = open_db(&settings)?;
            if refresh {
                db::reset_fetched(&conn)?;
            }
            fetch_venues(&conn, &settings, limit).await
        }
        Commands::Extract { output } => {
            let conn = open_db(&settings)?;
            extract_and_write(&conn, &settings, output)
        }
        Commands::Run { limit, output } => {
            let conn = open_db(&settings)?;
            init_venues(&conn, &settings).await?;
            fetch_venues(&conn, &settings, limit).await?;
            extract_and_write(&conn, &settings, output)
        }
        Commands::Stats => {
            let conn = open_db(&settings)?;
            let s = db::get_stats(&conn)?;
            println!("Venues:    {}", s.total);
            println!("Fetched:   {}", s.fetched);
            println!("Unfetched: {}", s.unfetched);
            println!("Pages:     {}", s.pages);
            println!("Errors:    {}", s.errors);
            Ok(())
        }
        Commands::Parse { file, kind } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let orchestrator = Orchestrator::with_containers(settings.container_selectors.clone());
            let scan = scan_venue(&html, kind.into(), &settings, &orchestrator);
            println!("{}", serde_json::to_string_pretty(&scan)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn open_db(settings: &Settings) -> anyhow::Result<Connection> {
    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

async fn init_venues(conn: &Connection, settings: &Settings) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::new(settings)?;
    for kind in VenueKind::ALL {
        let venues = match settings.venue_source(kind) {
            VenueSource::Fixed(venues) => venues,
            VenueSource::Discover { index_url } => {
                discover_venues(
                    &fetcher,
                    &index_url,
                    kind,
                    &settings.base_url,
                    &settings.listing_pattern,
                )
                .await?
            }
        };

        if venues.is_empty() {
            match kind {
                VenueKind::Pool => bail!("Could not discover any pools"),
                VenueKind::Rink => {
                    warn!("Could not discover any rinks (non-fatal)");
                    continue;
                }
            }
        }
        let inserted = db::insert_venues(conn, kind, &venues)?;
        println!("Stored {} new {} venues ({} listed)", inserted, kind, venues.len());
    }
    Ok(())
}

async fn fetch_venues(
    conn: &Connection,
    settings: &Settings,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let venues = db::fetch_unfetched(conn, limit)?;
    if venues.is_empty() {
        println!("No unfetched venues. Run 'init' first or use --refresh.");
        return Ok(());
    }
    println!("Fetching {} venue pages...", venues.len());
    let fetcher = Arc::new(HttpFetcher::new(settings)?);
    let stats = fetch::fetch_pages_streaming(conn, fetcher, venues, settings.concurrency).await?;
    println!(
        "Fetched {} pages ({} ok, {} errors).",
        stats.total, stats.ok, stats.errors
    );
    Ok(())
}

fn extract_and_write(
    conn: &Connection,
    settings: &Settings,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let orchestrator = Orchestrator::with_containers(settings.container_selectors.clone());
    let mut data = ScheduleData::new(Utc::now());

    for kind in VenueKind::ALL {
        let pages = db::fetch_pages(conn, kind)?;
        if pages.is_empty() {
            continue;
        }

        let pb = ProgressBar::new(pages.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb.set_message(format!("{}s", kind));

        let scans: Vec<_> = pages
            .par_iter()
            .map(|page| {
                let _span = tracing::info_span!("venue", id = %page.venue.id).entered();
                let scan = scan_venue(&page.html, kind, settings, &orchestrator);
                pb.inc(1);
                scan
            })
            .collect();
        pb.finish_and_clear();

        for (page, scan) in pages.into_iter().zip(scans) {
            data.push(kind, page.venue, scan);
        }
    }

    let path = output.unwrap_or_else(|| settings.output.clone());
    data.write(&path)?;
    info!("Wrote {}", path.display());

    for kind in VenueKind::ALL {
        let venues = data.venues(kind);
        println!(
            "{}s: {} venues, {} session slots",
            kind,
            venues.len(),
            data.session_count(kind)
        );
        for v in venues {
            println!("  * {}: {} sessions", v.name, v.sessions.len());
        }
    }

    if data.total_sessions() == 0 {
        bail!("No sessions scraped at all");
    }
    Ok(())
}
