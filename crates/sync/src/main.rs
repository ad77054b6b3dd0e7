//! Folio sync
//!
//! Runs one embedding sync pass against PostgreSQL and prints the
//! summary as JSON:
//! 1. Selects stale published records per kind
//! 2. Generates vectors (provider or hash fallback)
//! 3. Stores them and refreshes recommendations

use clap::Parser;
use folio_common::{
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, Repository},
    metrics, ContentKind, ContentStore, EmbeddingGenerator, StalenessPolicy, VERSION,
};
use folio_sync::{BatchSync, EmbeddingProcessor, SyncOptions};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "folio-sync", version, about = "Embed stale content records")]
struct Args {
    /// Kinds to process (posts, notes, activities); all when omitted
    #[arg(long, value_delimiter = ',')]
    kinds: Vec<String>,

    /// Maximum records per kind
    #[arg(long)]
    limit: Option<usize>,

    /// Re-embed every published record
    #[arg(long)]
    force: bool,

    /// Also refresh vectors older than the refresh interval
    #[arg(long)]
    refresh_expired: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    info!("Starting folio-sync v{}", VERSION);

    let kinds = args
        .kinds
        .iter()
        .map(|k| ContentKind::parse(k))
        .collect::<Result<Vec<_>, _>>()?;
    let limit = args
        .limit
        .unwrap_or(config.retrieval.default_sync_limit)
        .clamp(1, config.retrieval.max_sync_limit.max(1));

    metrics::register_metrics();

    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    let store: Arc<dyn ContentStore> = Arc::new(Repository::new(db));

    let generator = EmbeddingGenerator::from_config(&config)?;
    let canonical = generator.canonical_model();
    info!(
        model = %canonical.name,
        dimensions = canonical.dimensions,
        provider = generator.has_provider(),
        "Embedding generator ready"
    );

    let policy = StalenessPolicy::new(canonical, config.refresh_after());
    let processor = EmbeddingProcessor::new(
        store,
        generator,
        policy,
        config.retrieval.recommendation_count,
    );
    let sync = BatchSync::new(Arc::new(processor));

    let options = SyncOptions {
        kinds,
        limit_per_kind: limit,
        force: args.force,
        refresh_expired: args.refresh_expired,
    };
    let summary = sync.run(&options).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    // Logs go to stderr so stdout carries only the summary
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}
