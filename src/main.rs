//! Counsel CLI
//!
//! Command-line interface for ingesting cases, querying them and serving
//! the suggestion API.

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use counsel_suggest::api::MatchesResponse;
use counsel_suggest::ingest::read_cases_from_path;
use counsel_suggest::pipeline::{build_embedder, build_store};
use counsel_suggest::{
    ApiServer, AppConfig, AppState, Embedder, Error, Ingestor, Pipeline, Result, RetrievalPolicy,
    Retriever,
};

#[derive(Parser)]
#[command(name = "counsel")]
#[command(author, version, about = "Retrieval-augmented counseling suggestions", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.toml")]
        output: String,
    },

    /// Ingest a CSV file with `context` and `response` columns
    Ingest {
        /// CSV file to ingest
        file: String,
    },

    /// Show stored cases similar to a query
    Matches {
        query: String,

        /// Number of neighbours to request (defaults to config)
        #[arg(long)]
        top_k: Option<usize>,

        /// Similarity floor (defaults to config)
        #[arg(long)]
        threshold: Option<f32>,
    },

    /// Generate a grounded suggestion for a query
    Suggest { query: String },

    /// Run the HTTP API
    Serve {
        /// HTTP API listen address (defaults to config)
        #[arg(long)]
        addr: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| Error::Api(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            info!("Initializing new configuration at: {}", output);
            AppConfig::default().save(&output)?;
            info!("Configuration saved successfully");
        }

        Commands::Ingest { file } => {
            let config = AppConfig::load_or_default(&cli.config)?;
            let rows = read_cases_from_path(&file)?;
            let expected = rows.len();
            info!("Read {} rows from {}", expected, file);

            let embedder = build_embedder(&config)?;
            let store = build_store(&config, embedder.dimensions())?;
            let ingestor = Ingestor::with_batch_size(embedder, store, config.ingest.batch_size);
            match ingestor.ingest(rows).await {
                Ok(inserted) => {
                    println!("Uploaded and inserted {} entries.", inserted);
                }
                Err(Error::Upsert { inserted, source }) => {
                    warn!(
                        "Ingestion stopped after {} of {} entries; re-run the remaining {} rows",
                        inserted,
                        expected,
                        expected - inserted
                    );
                    return Err(Error::Upsert { inserted, source });
                }
                Err(e) => return Err(e),
            }
        }

        Commands::Matches {
            query,
            top_k,
            threshold,
        } => {
            let config = AppConfig::load_or_default(&cli.config)?;
            let embedder = build_embedder(&config)?;
            let store = build_store(&config, embedder.dimensions())?;
            let retriever = Retriever::new(embedder, store);

            let defaults = RetrievalPolicy::from(&config.retrieval);
            let policy = RetrievalPolicy {
                top_k: top_k.unwrap_or(defaults.top_k).max(1),
                threshold: threshold.unwrap_or(defaults.threshold),
            };
            let matches = retriever.retrieve_with(&query, policy).await?;
            print_json(&MatchesResponse::new(query, matches, policy.threshold))?;
        }

        Commands::Suggest { query } => {
            let config = AppConfig::load_or_default(&cli.config)?;
            let pipeline = Pipeline::from_config(&config)?;
            let result = pipeline.composer.compose(&query).await?;
            print_json(&result)?;
        }

        Commands::Serve { addr } => {
            info!("Starting suggestion service...");
            let config = AppConfig::load_or_default(&cli.config)?;
            let addr = addr.unwrap_or_else(|| config.api.listen_address.clone());

            let pipeline = Pipeline::from_config(&config)?;
            let mut state = AppState::new(pipeline);
            match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => state = state.with_metrics(handle),
                Err(e) => warn!("Metrics disabled: {}", e),
            }

            info!("API address: {}", addr);
            ApiServer::with_state(config.api.clone(), state)
                .run(&addr)
                .await?;
            info!("Service stopped");
        }
    }

    Ok(())
}
