// src/bin/cli.rs

//! pagesync CLI
//!
//! One-shot extraction plus administration and scheduling of sync configs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use pagesync::{
    error::{AppError, Result},
    models::{Config, ConfigId, ConfigUpdate, ExtractionRules, NewSyncConfig},
    pipeline::{BatchPipeline, Scheduler},
    services::{OutputFormat, build_sink, render, validate_selector},
    storage::{LocalStore, SyncStore},
};

/// pagesync - URL content extraction and change sync
#[derive(Parser, Debug)]
#[command(
    name = "pagesync",
    version,
    about = "Extract text from URL sets and publish changes on a schedule"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "pagesync.toml")]
    config: PathBuf,

    /// Override the state file from the configuration
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Default)]
struct SelectorArgs {
    /// Content selector (repeatable)
    #[arg(long = "content-selector")]
    content: Vec<String>,

    /// Selector for code blocks
    #[arg(long = "code-selector")]
    code: Option<String>,

    /// Selector for elements to drop
    #[arg(long = "exclude-selector")]
    exclude: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a URL set once and write the results
    Extract {
        /// URLs to extract
        urls: Vec<String>,

        /// Read additional URLs from a file, one per line
        #[arg(long)]
        urls_file: Option<PathBuf>,

        #[command(flatten)]
        selectors: SelectorArgs,

        /// Keep only content containing this text (case-insensitive)
        #[arg(long)]
        query: Option<String>,

        /// Content filter as kind=value (min_length, max_length, contains, excludes)
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,

        /// Output format: json, jsonl, txt, md, html
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create a sync configuration
    Create {
        /// Publishing target identifier
        #[arg(long)]
        doc_id: String,

        /// Title prefix of published pages
        #[arg(long)]
        name: String,

        /// Minutes between passes
        #[arg(long, default_value_t = 60)]
        interval: u32,

        #[command(flatten)]
        selectors: SelectorArgs,
    },

    /// Track URLs for a sync configuration
    AddUrls {
        id: ConfigId,

        urls: Vec<String>,

        /// Read additional URLs from a file, one per line
        #[arg(long)]
        urls_file: Option<PathBuf>,
    },

    /// Change the active flag or interval of a sync configuration
    Update {
        id: ConfigId,

        #[arg(long)]
        active: Option<bool>,

        #[arg(long)]
        interval: Option<u32>,
    },

    /// Show one configuration, or all of them
    Status { id: Option<ConfigId> },

    /// Run one scheduler tick and wait for its passes
    Sync,

    /// Run the scheduling loop until Ctrl-C
    Run,

    /// Validate the configuration file and optional selectors
    Validate {
        /// Selectors to check against the selector grammar
        selectors: Vec<String>,
    },
}

fn parse_filter(raw: &str) -> std::result::Result<(String, String), String> {
    let (kind, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected kind=value, got '{raw}'"))?;
    Ok((kind.trim().to_string(), value.to_string()))
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Collect URLs from arguments and an optional file, skipping blank lines.
fn collect_urls(mut urls: Vec<String>, file: Option<&Path>) -> Result<Vec<String>> {
    if let Some(path) = file {
        let content = std::fs::read_to_string(path)?;
        urls.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from),
        );
    }
    if urls.is_empty() {
        return Err(AppError::validation("no URLs given"));
    }
    Ok(urls)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_store(cli_store: Option<PathBuf>, config: &Config) -> Result<Arc<dyn SyncStore>> {
    let path = cli_store.unwrap_or_else(|| config.storage.path.clone());
    Ok(Arc::new(LocalStore::open(path).await?))
}

fn build_scheduler(config: &Config, store: Arc<dyn SyncStore>) -> Result<Scheduler> {
    let pipeline = BatchPipeline::from_config(config)?;
    let sink = build_sink(&config.sink)?;
    Ok(Scheduler::new(
        store,
        sink,
        pipeline,
        config.scheduler.clone(),
    ))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        log::debug!("No config at {}, using defaults", cli.config.display());
        Config::default()
    };
    if !matches!(cli.command, Command::Validate { .. }) {
        config.validate()?;
    }

    match cli.command {
        Command::Extract {
            urls,
            urls_file,
            selectors,
            query,
            filters,
            format,
            output,
        } => {
            let urls = collect_urls(urls, urls_file.as_deref())?;

            let mut rules = ExtractionRules::new();
            for selector in selectors.content {
                rules = rules.with_content_selector(selector);
            }
            if let Some(selector) = selectors.code {
                rules = rules.with_code_selector(selector);
            }
            if let Some(selector) = selectors.exclude {
                rules = rules.with_exclude_selector(selector);
            }
            if let Some(query) = query {
                rules = rules.with_search_query(query);
            }
            for (kind, value) in filters {
                rules = rules.with_filter(kind, value);
            }

            let pipeline = BatchPipeline::from_config(&config)?;
            let report = pipeline.run(&urls, &rules).await?;
            log::info!(
                "{} URLs processed: {} failed, {} filtered",
                report.progress.processed_urls,
                report.progress.failed_urls,
                report.progress.filtered_urls
            );

            let rendered = render(&report.results, format)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    log::info!("Wrote {} output to {}", format, path.display());
                }
                None => print!("{rendered}"),
            }
        }

        Command::Create {
            doc_id,
            name,
            interval,
            selectors,
        } => {
            let store = open_store(cli.store, &config).await?;
            let mut new = NewSyncConfig::new(doc_id, name, interval);
            // Several content selectors become one selector list
            new.content_selector =
                (!selectors.content.is_empty()).then(|| selectors.content.join(", "));
            new.code_selector = selectors.code;
            new.exclude_selector = selectors.exclude;

            let created = store.create_config(new).await?;
            log::info!("Created sync config {}", created.id);
            print_json(&created)?;
        }

        Command::AddUrls {
            id,
            urls,
            urls_file,
        } => {
            let store = open_store(cli.store, &config).await?;
            let urls = collect_urls(urls, urls_file.as_deref())?;
            let added = store.add_urls(id, &urls).await?;
            log::info!(
                "Config {}: {} new URLs tracked ({} already present)",
                id,
                added,
                urls.len() - added
            );
        }

        Command::Update {
            id,
            active,
            interval,
        } => {
            let store = open_store(cli.store, &config).await?;
            let update = ConfigUpdate {
                active,
                sync_interval: interval,
            };
            let updated = store.update_config(id, update).await?;
            print_json(&updated)?;
        }

        Command::Status { id } => {
            let store = open_store(cli.store, &config).await?;
            match id {
                Some(id) => print_json(&store.status(id).await?)?,
                None => {
                    let now = Utc::now();
                    for sync in store.list_configs().await? {
                        println!(
                            "{:>4}  {:<24} every {:>4} min  {:<8} last sync: {}",
                            sync.id,
                            sync.base_page_name,
                            sync.sync_interval,
                            if !sync.active {
                                "inactive"
                            } else if sync.is_due(now) {
                                "due"
                            } else {
                                "idle"
                            },
                            sync
                                .last_sync
                                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                                .unwrap_or_else(|| "never".to_string())
                        );
                    }
                }
            }
        }

        Command::Sync => {
            let store = open_store(cli.store, &config).await?;
            let scheduler = build_scheduler(&config, store)?;
            let summaries = scheduler.run_once(Utc::now()).await?;
            if summaries.is_empty() {
                log::info!("No configs were due");
            }
            print_json(&summaries)?;
        }

        Command::Run => {
            let store = open_store(cli.store, &config).await?;
            let scheduler = build_scheduler(&config, store)?;
            scheduler
                .run(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        log::error!("Cannot listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await?;
        }

        Command::Validate { selectors } => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            for selector in &selectors {
                validate_selector(selector)?;
                log::info!("✓ Selector OK: {}", selector);
            }

            log::info!("All validations passed!");
        }
    }

    Ok(())
}
