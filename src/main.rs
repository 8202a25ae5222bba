//! CLI entry point: loads the feed group configuration, then either runs
//! the fetch-parse-aggregate-write pipeline once or hands it to the
//! scheduler for repeated runs.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rss_aggregator::config::load_groups;
use rss_aggregator::pipeline::{run_once, PipelineOptions};
use rss_aggregator::scheduler::run_schedule;
use rss_aggregator::storage::Database;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "yaml_config/rss_config.yaml";
const CACHE_DB_PATH: &str = "cache/rss_cache.db";
const OUTPUT_ROOT: &str = "rss_feeds";

#[derive(Parser, Debug)]
#[command(name = "rss-aggregator", about = "Configuration-driven RSS/Atom feed aggregator")]
struct Args {
    /// Enable conditional GETs and cross-run output merging (default: off)
    #[arg(short = 'c', long = "caching")]
    caching: bool,

    /// Emit full Atom documents instead of entries-only (default: off)
    #[arg(short = 'v', long = "valid_rss")]
    valid_rss: bool,

    /// Use an existing config file instead of the default path
    #[arg(short = 'y', long = "yaml", value_name = "PATH")]
    yaml: Option<PathBuf>,

    /// Load the config and skip the pipeline entirely
    #[arg(long = "no_parsing")]
    no_parsing: bool,

    /// Run the pipeline every INTERVAL seconds for TOTAL seconds total
    #[arg(short = 's', long = "scheduler", num_args = 2, value_names = ["TOTAL", "INTERVAL"])]
    scheduler: Option<Vec<u64>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let run_id = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let _log_guard = init_logging(&run_id)?;

    let config_path = args
        .yaml
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let groups = match load_groups(&config_path) {
        Ok(groups) => groups,
        Err(e) => {
            tracing::error!(error = %e, path = %config_path.display(), "config load failed, aborting");
            return Err(e.into());
        }
    };
    tracing::info!(groups = groups.len(), path = %config_path.display(), "configuration loaded");

    if args.no_parsing {
        tracing::info!("--no_parsing set, skipping the pipeline");
        println!("Loaded {} group(s); skipping pipeline (--no_parsing).", groups.len());
        return Ok(());
    }

    let client = build_http_client()?;

    if let Some(parent) = Path::new(CACHE_DB_PATH).parent() {
        std::fs::create_dir_all(parent).context("failed to create cache directory")?;
    }

    if let Some(values) = &args.scheduler {
        let total = Duration::from_secs(values[0]);
        let interval = Duration::from_secs(values[1]);
        run_schedule(
            &groups,
            &client,
            CACHE_DB_PATH,
            Path::new(OUTPUT_ROOT),
            args.valid_rss,
            total,
            interval,
        )
        .await?;
        return Ok(());
    }

    let cache = Database::open(CACHE_DB_PATH)
        .await
        .context("failed to open cache database")?;

    let output_dir = Path::new(OUTPUT_ROOT).join(format!("run_{run_id}"));
    let options = PipelineOptions {
        caching: args.caching,
        full_document: args.valid_rss,
    };

    run_once(&groups, &client, &cache, options, &output_dir).await;
    println!(
        "Wrote feeds for {} group(s) to {}",
        groups.len(),
        output_dir.display()
    );

    Ok(())
}

fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("rss-aggregator/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

/// Opens `logs/log_<run-id>.log` and installs a non-blocking, file-backed
/// `tracing` subscriber formatting each event as `<timestamp> - <LEVEL> -
/// <message>`. The returned guard must be held for the process lifetime —
/// dropping it early truncates buffered log lines.
fn init_logging(run_id: &str) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all("logs").context("failed to create logs directory")?;
    let log_path = PathBuf::from("logs").join(format!("log_{run_id}.log"));
    let file = std::fs::File::create(&log_path)
        .with_context(|| format!("failed to create log file '{}'", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .event_format(PlainFormat)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();

    Ok(guard)
}

/// Renders each log event as a single `<timestamp> - <LEVEL> - <message>`
/// line, matching the line-oriented format this pipeline's run logs use.
struct PlainFormat;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for PlainFormat
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        write!(writer, "{} - {} - ", Utc::now().to_rfc3339(), event.metadata().level())?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
