use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

use docqa_cli::{
    AskOptions, EMBED_BATCH_SIZE, Settings, ask_once, init_logging, parse_filter, print_stats,
    read_corpus, run_interactive, run_then_shutdown, seed_index,
};
use docqa_providers::{build_embedder, build_generator};
use docqa_rag::{EngineContext, QueryEngine};

#[derive(Parser)]
#[command(name = "docqa", version)]
#[command(about = "Answer questions from your documents with cited sources", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./docqa.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSONL corpus to index at startup, one {id, text, metadata} object per line
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Per-question deadline in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Restrict retrieval to chunks whose metadata has key=value (repeatable)
    #[arg(long = "filter", global = true)]
    filters: Vec<String>,

    /// Print answers and stats as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question and exit
    Ask { question: String },
    /// Print index and model statistics
    Stats,
}

async fn build_engine(cli: &Cli) -> Result<QueryEngine> {
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    let policy = settings.engine.retry_policy();

    let embedder = build_embedder(&settings.embedder, policy.clone())?;
    let generator = build_generator(&settings.generator, policy)?;
    let context = EngineContext::in_memory(settings.engine, embedder, generator)?;

    if let Some(path) = &cli.corpus {
        let records = read_corpus(path)
            .with_context(|| format!("failed to read corpus {}", path.display()))?;
        let written = seed_index(
            records,
            context.embedder().as_ref(),
            context.index().as_ref(),
            EMBED_BATCH_SIZE,
        )
        .await?;
        info!(chunks = written, corpus = %path.display(), "index seeded");
    }

    Ok(QueryEngine::new(context))
}

async fn dispatch(cli: &Cli, engine: &QueryEngine, options: &AskOptions) -> Result<ExitCode> {
    match &cli.command {
        Some(Commands::Ask { question }) => {
            if ask_once(engine, question, options, cli.json).await? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Some(Commands::Stats) => {
            print_stats(engine, cli.json).await?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            run_interactive(engine, options).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let engine = build_engine(&cli).await?;
    let options = AskOptions {
        timeout: cli.timeout.map(Duration::from_secs),
        filter: parse_filter(&cli.filters)?,
    };

    run_then_shutdown(&engine, dispatch(&cli, &engine, &options)).await
}
