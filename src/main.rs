use anyhow::{Context, Result};
use askblog::answer::{answer, GeminiClient};
use askblog::embeddings::{OllamaEmbedder, QueryEmbeddingCache};
use askblog::progress::LogProgress;
use askblog::{Config, Pipeline};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "askblog", version, about = "Ask questions over a blog via a locally built semantic index")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refetch blog posts and rebuild the vector index
    Refresh {
        /// Override the configured page budget for link discovery
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Ask a question against the indexed blog content
    Ask {
        /// The question to answer
        question: String,
    },
    /// Delete the cached link list and vector index
    Clear,
    /// Show cache status
    Status,
}

/// Build the configured Ollama embedder with an optional query-embedding cache
fn build_embedder(config: &Config) -> Result<OllamaEmbedder> {
    let embedder = OllamaEmbedder::new(
        config.embeddings.host.clone(),
        config.embeddings.model.clone(),
        config.embeddings.dimension,
        Duration::from_secs(config.blog.request_timeout_secs),
    )?;

    Ok(if config.embeddings.cache_capacity > 0 {
        embedder.with_cache(Arc::new(QueryEmbeddingCache::new(
            config.embeddings.cache_capacity,
        )))
    } else {
        embedder
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let cli = Cli::parse();
    let mut config = Config::load().context("Failed to load configuration")?;

    match cli.command {
        Command::Refresh { max_pages } => {
            if let Some(n) = max_pages {
                config.blog.max_pages = n;
                config.validate()?;
            }
            let embedder = build_embedder(&config)?;
            let mut pipeline = Pipeline::new(config)?;
            let progress = LogProgress;

            let index = pipeline
                .get_or_build_index(&embedder, true, Some(&progress))
                .await
                .context("Refresh failed")?;
            log::info!("Refresh complete: {} chunks indexed", index.len());
        }
        Command::Ask { question } => {
            let api_key = config.api_key()?;
            let gemini = GeminiClient::new(
                api_key,
                config.answer.model.clone(),
                config.answer.temperature,
            )?;
            let embedder = build_embedder(&config)?;
            let top_k = config.answer.top_k;
            let mut pipeline = Pipeline::new(config)?;
            let progress = LogProgress;

            let index = pipeline
                .get_or_build_index(&embedder, false, Some(&progress))
                .await
                .context("Could not load or build the index")?;

            let result = answer(&question, &index, &embedder, &gemini, top_k)
                .await
                .context("Answering failed")?;

            println!("{}", result.answer);
            if !result.sources.is_empty() {
                println!("\nSources:");
                for source in &result.sources {
                    println!("  - {}", source);
                }
            }
        }
        Command::Clear => {
            let mut pipeline = Pipeline::new(config)?;
            pipeline.clear_caches()?;
            println!("Caches cleared.");
        }
        Command::Status => {
            let pipeline = Pipeline::new(config)?;
            let cache = pipeline.cache();
            println!("Cache root:  {}", cache.root().display());
            println!(
                "Link cache:  {}",
                if cache.has_link_cache() {
                    format!("present ({} links)", cache.load_links()?.len())
                } else {
                    "absent".to_string()
                }
            );
            println!(
                "Index cache: {}",
                if cache.has_index_cache() {
                    let index = cache.load_index_raw()?;
                    format!(
                        "present ({} entries, {} dims, model {})",
                        index.len(),
                        index.dimension(),
                        index.model()
                    )
                } else {
                    "absent".to_string()
                }
            );
        }
    }

    Ok(())
}
