use crate::cache::CacheStore;
use crate::config::Config;
use crate::discover::discover_links;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::ingest::{ingest, split_documents};
use crate::progress::{report, ProgressSink};
use reqwest::Client;
use std::time::Duration;

/// Orchestrator state. Transitions are strictly sequential; the terminal
/// steady state is `Ready`, from which answering may be invoked repeatedly
/// without a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Cold,
    Clearing,
    Discovering,
    Ingesting,
    Indexing,
    Ready,
}

/// Sequences discovery, ingestion, chunking and index construction, and
/// decides between a cached load and a full rebuild.
///
/// Owns the cache store for the session; only one refresh can be in flight
/// because every operation takes `&mut self`. Caches are written only after
/// their build step fully completes, so a failed refresh leaves the system
/// `Cold` with no partial artifacts, never a corrupt cache.
pub struct Pipeline {
    config: Config,
    cache: CacheStore,
    client: Client,
    state: PipelineState,
}

impl Pipeline {
    /// Validate configuration and set up the pipeline. No I/O happens here
    /// beyond building the HTTP client.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.blog.request_timeout_secs))
            .build()?;

        let cache = CacheStore::new(config.build_dir());
        let state = if cache.has_link_cache() && cache.has_index_cache() {
            PipelineState::Ready
        } else {
            PipelineState::Cold
        };

        Ok(Self {
            config,
            cache,
            client,
            state,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Return a ready-to-query index, loading from cache when possible.
    ///
    /// With `force_refresh` both caches are cleared first and everything is
    /// rebuilt from the live site. Without it, a fully cached session loads
    /// the index directly; otherwise a build runs (reusing a surviving link
    /// cache from an earlier, partially completed refresh).
    pub async fn get_or_build_index(
        &mut self,
        provider: &dyn EmbeddingProvider,
        force_refresh: bool,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<VectorIndex> {
        if force_refresh {
            self.state = PipelineState::Clearing;
            self.cache.clear_all()?;
            report(progress, "Cleared cache files.");
            self.state = PipelineState::Cold;
        }

        if !force_refresh && self.cache.has_index_cache() {
            report(progress, "Loading vector store from disk...");
            let index = self.cache.load_index(provider)?;
            self.state = PipelineState::Ready;
            return Ok(index);
        }

        match self.rebuild(provider, progress).await {
            Ok(index) => {
                self.state = PipelineState::Ready;
                Ok(index)
            }
            Err(e) => {
                self.state = PipelineState::Cold;
                Err(e)
            }
        }
    }

    /// Delete both caches; the next `get_or_build_index` starts cold
    pub fn clear_caches(&mut self) -> Result<()> {
        self.state = PipelineState::Clearing;
        self.cache.clear_all()?;
        self.state = PipelineState::Cold;
        Ok(())
    }

    async fn rebuild(
        &mut self,
        provider: &dyn EmbeddingProvider,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<VectorIndex> {
        self.state = PipelineState::Discovering;
        let links = if self.cache.has_link_cache() {
            log::info!("Reusing cached link list");
            self.cache.load_links()?
        } else {
            let links = discover_links(
                &self.client,
                &self.config.blog.start_url,
                self.config.blog.max_pages,
                Duration::from_millis(self.config.blog.fetch_delay_ms),
                progress,
            )
            .await?;
            self.cache.save_links(&links)?;
            links
        };

        self.state = PipelineState::Ingesting;
        let documents = ingest(&self.client, &links, progress).await?;

        report(progress, "Splitting documents into chunks...");
        let chunks = split_documents(
            &documents,
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap,
        )?;
        log::info!("Split {} documents into {} chunks", documents.len(), chunks.len());

        self.state = PipelineState::Indexing;
        let index = VectorIndex::build(chunks, provider, progress).await?;
        self.cache.save_index(&index)?;

        Ok(index)
    }
}
