use anyhow::Context;
use cartelera_scraper::app::ports::HttpClientPort;
use cartelera_scraper::config::Settings;
use cartelera_scraper::constants::{DEFAULT_CONFIG_PATH, MOVIES_DIR};
use cartelera_scraper::image_fetcher::ImageFetcher;
use cartelera_scraper::infra::http_client::{build_client, ReqwestHttp};
use cartelera_scraper::infra::page_fetcher::HttpPageFetcher;
use cartelera_scraper::parser::ListingExtractor;
use cartelera_scraper::record_store::load_processed;
use cartelera_scraper::storage::build_backend;
use cartelera_scraper::{logging, PipelineOptions, ScraperOrchestrator};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cartelera_scraper")]
#[command(about = "Scrape a movie listing page into local or object storage")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML settings file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the output directory (local root, or key prefix in the bucket)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the listing page (default)
    Run {
        /// Listing URL, overrides WebPage.BaseUrl
        #[arg(long)]
        url: Option<String>,
        /// Maximum number of entries, overrides WebPage.AmountOfMovies
        #[arg(long)]
        max_entries: Option<usize>,
        /// Skip entries already persisted by an earlier run
        #[arg(long)]
        skip_processed: bool,
    },
    /// List record ids already persisted in the configured storage
    Processed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging("logs");

    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    if let Some(dir) = cli.output_dir {
        settings.storage.output_dir = dir;
    }

    let client = build_client(settings.http.timeout_seconds, &settings.http.user_agent)?;
    let backend = build_backend(&settings.storage_config())
        .await
        .context("initializing storage backend")?;

    match cli.command.unwrap_or(Commands::Run {
        url: None,
        max_entries: None,
        skip_processed: false,
    }) {
        Commands::Processed => {
            let processed = load_processed(backend.as_ref(), MOVIES_DIR).await;
            for id in processed.iter() {
                println!("{id}");
            }
        }
        Commands::Run {
            url,
            max_entries,
            skip_processed,
        } => {
            let listing_url = url.unwrap_or_else(|| settings.web_page.base_url.clone());
            let options = PipelineOptions {
                max_entries: max_entries.unwrap_or(settings.web_page.amount_of_movies),
                skip_already_processed: skip_processed || settings.storage.skip_already_processed,
                ..PipelineOptions::default()
            };
            anyhow::ensure!(options.max_entries > 0, "--max-entries must be positive");

            let http: Arc<dyn HttpClientPort> = Arc::new(ReqwestHttp::new(client));
            let orchestrator = ScraperOrchestrator::new(
                Arc::new(HttpPageFetcher::new(http.clone())),
                backend,
                ImageFetcher::new(http),
                ListingExtractor::new()?,
                options,
            );

            info!("Scraper initialized. Storage: {}", settings.storage.kind);
            match orchestrator.run(&listing_url).await {
                Ok(summary) => {
                    println!("\n📊 Run results for {}:", summary.listing_url);
                    println!("   Entries found: {}", summary.entries_found);
                    println!("   Considered: {}", summary.entries_considered);
                    println!("   Persisted: {}", summary.persisted);
                    println!("   Skipped: {}", summary.skipped);
                    println!("   Failed: {}", summary.failed);
                    if !summary.errors.is_empty() {
                        println!("\n⚠️  Errors encountered:");
                        for error in &summary.errors {
                            println!("   - {}", error);
                        }
                    }
                }
                Err(e) => {
                    error!("Run aborted: {}", e);
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}
