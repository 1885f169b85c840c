use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reelsearch_core::config::DEFAULT_PARALLELISM;
use reelsearch_core::{Engine, EngineConfig, Field, Query, SortOrder};
use tracing_subscriber::{fmt, EnvFilter};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "reelsearch")]
#[command(about = "Load a movie catalogue into an in-memory index and query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Catalogue CSV path
    #[arg(long, env = "REELSEARCH_SOURCE")]
    source: PathBuf,
    /// Number of parallel loader workers
    #[arg(long, default_value_t = DEFAULT_PARALLELISM)]
    parallelism: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the catalogue and print the generation summary
    Load {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Load the catalogue and run one query
    Query {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        language: Option<String>,
        /// Space separated keywords matched against every field
        #[arg(long)]
        keywords: Option<String>,
        /// rating_asc or rating_desc
        #[arg(long)]
        sort: Option<SortOrder>,
        /// Maximum records to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Load the catalogue and serve a JSONL file of queries on the worker pool
    Batch {
        #[command(flatten)]
        source: SourceArgs,
        /// One JSON query per line
        #[arg(long)]
        queries: PathBuf,
        /// Worker pool size (defaults to the number of CPUs)
        #[arg(long)]
        workers: Option<usize>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Load { source } => {
            let engine = load_engine(&source, None)?;
            let summary = engine.summary().context("no generation after load")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::Query { source, genre, year, language, keywords, sort, limit } => {
            let engine = load_engine(&source, None)?;
            let mut query = Query::new();
            for (field, value) in [(Field::Genre, genre), (Field::Year, year), (Field::Language, language)] {
                if let Some(value) = value {
                    query = query.filter(field, value);
                }
            }
            if let Some(keywords) = keywords {
                query = query.keywords(&keywords);
            }
            query.sort = sort;

            let results = engine.query(&query)?;
            tracing::info!(hits = results.len(), "query complete");
            for record in results.iter().take(limit) {
                println!("{}", serde_json::to_string(record)?);
            }
            Ok(())
        }
        Commands::Batch { source, queries, workers } => run_batch(&source, &queries, workers),
    }
}

fn load_engine(source: &SourceArgs, workers: Option<usize>) -> Result<Engine> {
    let mut config = EngineConfig { parallelism: source.parallelism, ..EngineConfig::default() };
    if let Some(workers) = workers {
        config.pool_size = workers;
    }
    let engine = Engine::new(config);
    engine
        .load(&source.source)
        .with_context(|| format!("loading {}", source.source.display()))?;
    Ok(engine)
}

fn run_batch(source: &SourceArgs, queries: &Path, workers: Option<usize>) -> Result<()> {
    let engine = Arc::new(load_engine(source, workers)?);
    let pool = engine.worker_pool()?;
    let reader = BufReader::new(File::open(queries).with_context(|| format!("opening {}", queries.display()))?);

    let mut submitted = 0usize;
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let query: Query = match serde_json::from_str(&line) {
            Ok(q) => q,
            Err(err) => {
                tracing::warn!(line = n + 1, error = %err, "skipping invalid query");
                continue;
            }
        };
        let engine = engine.clone();
        pool.submit(move || match engine.query(&query) {
            Ok(results) => {
                let out = serde_json::json!({ "line": n + 1, "hits": results.len(), "ids": results.ids() });
                println!("{out}");
            }
            Err(err) => tracing::warn!(line = n + 1, error = %err, "query failed"),
        })?;
        submitted += 1;
    }

    pool.shutdown();
    tracing::info!(submitted, workers = pool.size(), "batch complete");
    Ok(())
}
