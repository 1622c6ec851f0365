//! Campus-Harvest main entry point
//!
//! This is the command-line interface for the Campus-Harvest crawler.

use campus_harvest::config::{load_config_with_hash, BrowserMode, Config};
use campus_harvest::crawler::crawl;
use campus_harvest::output::{export_extracted, load_statistics, print_report, print_statistics};
use campus_harvest::storage::{Checkpoint, SqliteStorage};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Campus-Harvest: a resumable college-website crawler
///
/// Campus-Harvest walks a college website wave by wave, downloads its
/// documents, extracts page text, tables, images and videos, and checkpoints
/// everything so an interrupted crawl picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "campus-harvest")]
#[command(version)]
#[command(about = "A resumable college-website crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URL to crawl from (repeatable; overrides the config seeds)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a fresh crawl, discarding the saved checkpoint
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export"])]
    dry_run: bool,

    /// Show statistics from the checkpoint and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export"])]
    stats: bool,

    /// Write the extracted data store to FILE as JSON and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["dry_run", "stats"])]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, &cli.seeds)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(path) = &cli.export {
        handle_export(&config, path)?;
    } else {
        handle_crawl(config, &config_hash, &cli.seeds, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("campus_harvest=info,warn"),
            1 => EnvFilter::new("campus_harvest=debug,info"),
            2 => EnvFilter::new("campus_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn effective_seeds(config: &Config, cli_seeds: &[String]) -> Vec<String> {
    if cli_seeds.is_empty() {
        config.crawler.seeds.clone()
    } else {
        cli_seeds.to_vec()
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, cli_seeds: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Campus-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Site domains: {}", config.crawler.site_domains.join(", "));
    println!("  Settle delay: {}ms", config.crawler.settle_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Checkpoint every {} entries",
        config.crawler.checkpoint_interval
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nStorage:");
    println!("  Checkpoint: {}", config.storage.checkpoint_path);
    println!("  Downloads: {}", config.storage.download_folder);
    println!("  Tables: {}", config.storage.tables_folder);

    println!("\nBrowser:");
    match config.browser.mode {
        BrowserMode::Chromium => println!(
            "  Chromium ({})",
            if config.browser.headless { "headless" } else { "headed" }
        ),
        BrowserMode::Http => println!("  Plain HTTP"),
    }

    println!("\nFormats:");
    println!("  Documents: {}", config.formats.documents.join(", "));
    println!("  Images: {}", config.formats.images.join(", "));
    println!("  Videos: {}", config.formats.videos.join(", "));
    println!(
        "  YouTube metadata: {}",
        if config.video.api_key().is_some() { "enabled" } else { "disabled" }
    );

    let seeds = effective_seeds(config, cli_seeds);
    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URLs", seeds.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the checkpoint
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Checkpoint: {}\n", config.storage.checkpoint_path);

    let storage = SqliteStorage::new(Path::new(&config.storage.checkpoint_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export mode: writes extracted records as JSON
fn handle_export(config: &Config, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let storage = SqliteStorage::new(Path::new(&config.storage.checkpoint_path))?;
    let state = storage.load_state()?;
    let count = export_extracted(&state, path)?;

    println!("✓ Exported {} records to: {}", count, path.display());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: &str,
    cli_seeds: &[String],
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    } else {
        tracing::info!("Starting crawl (will resume from the checkpoint if one exists)");
    }

    if effective_seeds(&config, cli_seeds).is_empty() {
        return Err("no seed URLs: pass --seed or set crawler.seeds in the config".into());
    }

    match crawl(config, config_hash, cli_seeds, fresh).await {
        Ok(reports) => {
            for report in &reports {
                print_report(report);
                println!();
            }
            tracing::info!("Crawl completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
