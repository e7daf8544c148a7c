use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use worldpress_ingest::adapters::AdapterSet;
use worldpress_ingest::alerts::AlertMatcher;
use worldpress_ingest::ingester::ArticleIngester;
use worldpress_ingest::orchestrator::FetchOrchestrator;
use worldpress_ingest::store::PgStore;
use worldpress_ingest::types::FetchConfig;

#[derive(Parser)]
#[command(name = "worldpress-ingest")]
#[command(about = "News ingestion pipeline: fetch, dedup, classify, score, alert")]
struct Cli {
    /// Postgres connection string. Falls back to DATABASE_URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every enabled source, then evaluate alert rules once.
    FetchAll,
    /// Fetch a single source by id.
    FetchSource { source_id: Uuid },
    /// Evaluate alert rules against recently created articles.
    EvaluateAlerts,
    /// Insert starter categories and sources.
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let store = Arc::new(
        PgStore::connect(&cli.database_url)
            .await
            .context("failed to connect to database")?,
    );

    match cli.command {
        Command::FetchAll => {
            let orchestrator = build_orchestrator(&store)?;
            let results = orchestrator.fetch_all().await;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::FetchSource { source_id } => {
            let orchestrator = build_orchestrator(&store)?;
            let result = orchestrator.fetch_source(source_id).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::EvaluateAlerts => {
            let matcher = AlertMatcher::new(store.clone(), store.clone(), store.clone());
            let created = matcher.evaluate_new_articles().await?;
            info!("Created {} notifications", created);
        }
        Command::Seed => {
            worldpress_ingest::seed::seed(store.pool()).await?;
            info!("Seed complete");
        }
    }

    Ok(())
}

fn build_orchestrator(store: &Arc<PgStore>) -> anyhow::Result<Arc<FetchOrchestrator>> {
    let adapters = Arc::new(AdapterSet::new(FetchConfig::default())?);
    let ingester = Arc::new(ArticleIngester::new(store.clone(), store.clone()));
    let matcher = Arc::new(AlertMatcher::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));

    Ok(Arc::new(FetchOrchestrator::new(
        store.clone(),
        store.clone(),
        adapters,
        ingester,
        matcher,
    )))
}
