use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use prettytable::{Cell, Row, Table};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use newsline::app_api::app_api_loop;
use newsline::event::{Event, LlmEventExtractor};
use newsline::logging::configure_logging;
use newsline::news::NewsApiSource;
use newsline::summary::LlmSummarizer;
use newsline::vector::{MiniLmConfig, MiniLmEmbedder};
use newsline::{ServiceConfig, Timeline, TimelinePipeline, TimelineService};

#[derive(Parser)]
#[clap(name = "newsline", about = "Generate news timelines from a topic query")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (defaults to PORT or 8000)
        #[clap(short, long)]
        port: Option<u16>,
    },

    /// Generate one timeline and print it
    Generate {
        /// Topic to build the timeline for
        #[clap(required = true)]
        query: String,

        /// JSON file with pre-extracted events, skipping retrieval and extraction
        #[clap(short, long)]
        events: Option<PathBuf>,

        /// Output format
        #[clap(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Number of time windows
        #[clap(short, long)]
        windows: Option<usize>,

        /// Use article snippets from the search results instead of full text
        #[clap(long)]
        snippets: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();
    let cli = Cli::parse();
    let mut config = ServiceConfig::from_env();

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            let service = Arc::new(build_service(&config).await?);
            app_api_loop(service, port).await
        }
        Commands::Generate {
            query,
            events,
            format,
            windows,
            snippets,
        } => {
            if let Some(windows) = windows {
                config.pipeline.window_count = windows.max(1);
            }
            config.news_snippets_only |= snippets;

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_err() {
                    error!("Failed to listen for ctrl-c");
                }
                on_ctrl_c.cancel();
            });

            let timeline = match events {
                Some(path) => {
                    let events = read_events(&path)?;
                    info!("Loaded {} events from {}", events.len(), path.display());
                    build_pipeline(&config)
                        .await?
                        .generate_from_events(&query, events, cancel)
                        .await?
                }
                None => {
                    build_service(&config)
                        .await?
                        .generate_timeline(&query, cancel)
                        .await?
                }
            };

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&timeline)?),
                OutputFormat::Table => print_table(&timeline),
            }
            Ok(())
        }
    }
}

async fn build_pipeline(config: &ServiceConfig) -> Result<TimelinePipeline> {
    let client = config.llm_client();
    let embedder = MiniLmEmbedder::load(
        MiniLmConfig::default().with_model_dir(&config.embedding_model_dir),
    )
    .await
    .context("Failed to load the embedding model")?;

    Ok(TimelinePipeline::new(
        Arc::new(LlmEventExtractor::new(config.extraction_params(&client))),
        Arc::new(embedder),
        Arc::new(LlmSummarizer::new(config.summary_params(&client))),
        config.pipeline.clone(),
    ))
}

async fn build_service(config: &ServiceConfig) -> Result<TimelineService> {
    let api_key = config
        .newsapi_key
        .as_deref()
        .context("NEWSAPI_KEY must be set to retrieve articles")?;
    let mut source = NewsApiSource::new(api_key, config.news_page_size)?;
    if config.news_snippets_only {
        info!("Using NewsAPI snippets only");
        source = source.snippets_only();
    }
    Ok(TimelineService::new(
        Arc::new(source),
        build_pipeline(config).await?,
    ))
}

fn read_events(path: &PathBuf) -> Result<Vec<Event>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let events: Vec<Event> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse events in {}", path.display()))?;
    Ok(events)
}

fn print_table(timeline: &Timeline) {
    println!("Timeline for: {}", timeline.query);

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Time window"),
        Cell::new("Substory"),
        Cell::new("Events"),
        Cell::new("Summary"),
    ]));

    for window in &timeline.windows {
        for substory in &window.substories {
            let events = substory
                .events
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            table.add_row(Row::new(vec![
                Cell::new(&window.time_window()),
                Cell::new(substory.title.as_deref().unwrap_or("")),
                Cell::new(&events),
                Cell::new(&substory.summary),
            ]));
        }
    }

    table.printstd();
}
