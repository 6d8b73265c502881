use clap::Parser;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use strand_graph::{into_client_events, StreamPump};
use strand_persist::{InMemoryRunStore, RunRecorder};
use strand_replay::{config::Config, replay};

/// Replay a recorded agent execution stream through the translator and
/// print the client protocol as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "strand-replay", version, about)]
struct Cli {
    /// Recorded upstream chunks (JSON lines), or `-` for stdin.
    #[arg(long, default_value = "-")]
    chunks: String,

    /// Prior conversation turns (JSON array or JSON lines).
    #[arg(long)]
    history: Option<PathBuf>,

    /// Run id to record under; random when omitted.
    #[arg(long, env = "STRAND_RUN_ID")]
    run_id: Option<String>,

    /// Extra config file layered over config/default.toml.
    #[arg(long, env = "STRAND_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    let history = match &cli.history {
        Some(path) => replay::read_history(path).await?,
        None => Vec::new(),
    };
    tracing::info!(messages = history.len(), "History loaded");

    let memory_store = Arc::new(InMemoryRunStore::new());
    let recorder = build_recorder(&config, &memory_store).await?;

    let mut pump = StreamPump::new(Arc::new(config.stream.clone())).with_recorder(recorder);
    if let Some(run_id) = &cli.run_id {
        pump = pump.with_run_id(run_id.clone());
    }
    let run_id = pump.run_id().to_string();

    let upstream = if cli.chunks == "-" {
        replay::chunk_stream(BufReader::new(tokio::io::stdin())).boxed()
    } else {
        let file = tokio::fs::File::open(&cli.chunks)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", cli.chunks, e))?;
        replay::chunk_stream(BufReader::new(file)).boxed()
    };

    tracing::info!(run_id = %run_id, source = %cli.chunks, "Replaying stream");

    let mut stdout = tokio::io::stdout();
    let mut events = into_client_events(pump.run(history, upstream));
    while let Some(event) = events.next().await {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
    }
    stdout.flush().await?;

    let timeline = memory_store.timeline(&run_id).await;
    if !timeline.is_empty() {
        tracing::info!(run_id = %run_id, entries = timeline.len(), "Timeline recorded in memory");
    }

    Ok(())
}

async fn build_recorder(
    config: &Config,
    memory_store: &Arc<InMemoryRunStore>,
) -> anyhow::Result<Arc<dyn RunRecorder>> {
    #[cfg(feature = "mongodb")]
    if let (Some(mongodb), Some(uri)) = (&config.mongodb, &config.mongodb_uri) {
        tracing::info!(database = %mongodb.database, "Connecting to MongoDB");
        let store = strand_persist::MongoRunStore::connect(uri, &mongodb.database).await?;
        tracing::info!("MongoDB connected");
        return Ok(Arc::new(store));
    }

    if config.mongodb.is_some() {
        tracing::warn!("[mongodb] configured but unavailable (feature disabled or MONGODB_URI unset), using in-memory store");
    }

    Ok(memory_store.clone())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout carries protocol events only
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
