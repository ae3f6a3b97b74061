use crate::embeddings::EmbeddingProvider;
use crate::error::{AskblogError, Result};
use crate::index::{VectorIndex, INDEX_FORMAT_VERSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Version of the persisted link-list format
pub const LINKS_FORMAT_VERSION: u32 = 1;

const LINKS_FILE: &str = "links.json";
const INDEX_FILE: &str = "index.json";

/// Versioned envelope for the persisted link list
#[derive(Serialize, Deserialize)]
struct LinksFile {
    version: u32,
    urls: Vec<String>,
}

/// Durable storage for the discovered link list and the built vector index.
///
/// Both artifacts live under one root directory, created lazily on first
/// write. Writes go through a temp file and an atomic rename, so an artifact
/// is either fully present and valid or absent; there is no half-written
/// state for a loader to trip over. Artifacts are plain versioned JSON, so
/// cache files can be inspected and validated without executing anything.
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn links_path(&self) -> PathBuf {
        self.root.join(LINKS_FILE)
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn has_link_cache(&self) -> bool {
        self.links_path().is_file()
    }

    pub fn has_index_cache(&self) -> bool {
        self.index_path().is_file()
    }

    /// Load the persisted link list
    pub fn load_links(&self) -> Result<Vec<String>> {
        let path = self.links_path();
        let data = fs::read_to_string(&path)
            .map_err(|e| cache_error(&path, &format!("unreadable: {}", e)))?;
        let file: LinksFile = serde_json::from_str(&data)
            .map_err(|e| cache_error(&path, &format!("malformed JSON: {}", e)))?;

        if file.version != LINKS_FORMAT_VERSION {
            return Err(cache_error(
                &path,
                &format!(
                    "unsupported format version {} (expected {})",
                    file.version, LINKS_FORMAT_VERSION
                ),
            ));
        }

        Ok(file.urls)
    }

    /// Persist the link list, preserving order exactly
    pub fn save_links(&self, urls: &[String]) -> Result<()> {
        let file = LinksFile {
            version: LINKS_FORMAT_VERSION,
            urls: urls.to_vec(),
        };
        self.write_atomic(&self.links_path(), &file)?;
        log::debug!("Saved {} links to {}", urls.len(), self.links_path().display());
        Ok(())
    }

    /// Load the persisted vector index without provider validation.
    ///
    /// Checks the format version only; useful for inspecting a cache (entry
    /// counts, model, dimension) when no provider is at hand.
    pub fn load_index_raw(&self) -> Result<VectorIndex> {
        let path = self.index_path();
        let data = fs::read_to_string(&path)
            .map_err(|e| cache_error(&path, &format!("unreadable: {}", e)))?;
        let index: VectorIndex = serde_json::from_str(&data)
            .map_err(|e| cache_error(&path, &format!("malformed JSON: {}", e)))?;

        if index.version() != INDEX_FORMAT_VERSION {
            return Err(cache_error(
                &path,
                &format!(
                    "unsupported format version {} (expected {})",
                    index.version(),
                    INDEX_FORMAT_VERSION
                ),
            ));
        }

        Ok(index)
    }

    /// Load the persisted vector index and validate it against the embedding
    /// provider that will serve queries. A model or dimension mismatch is
    /// fatal here, at load, not at the first query.
    pub fn load_index(&self, provider: &dyn EmbeddingProvider) -> Result<VectorIndex> {
        let path = self.index_path();
        let index = self.load_index_raw()?;

        if index.model() != provider.model() {
            return Err(cache_error(
                &path,
                &format!(
                    "stale: index was built with embedding model '{}' but provider is '{}'",
                    index.model(),
                    provider.model()
                ),
            ));
        }

        if index.dimension() != provider.dimension() {
            return Err(cache_error(
                &path,
                &format!(
                    "stale: index embeddings are {}-dimensional but provider '{}' produces {} dimensions",
                    index.dimension(),
                    provider.model(),
                    provider.dimension()
                ),
            ));
        }

        Ok(index)
    }

    /// Persist a fully built vector index
    pub fn save_index(&self, index: &VectorIndex) -> Result<()> {
        self.write_atomic(&self.index_path(), index)?;
        log::debug!(
            "Saved index with {} entries to {}",
            index.len(),
            self.index_path().display()
        );
        Ok(())
    }

    /// Delete both caches. Idempotent: absent artifacts are not an error.
    pub fn clear_all(&self) -> Result<()> {
        for path in [self.links_path(), self.index_path()] {
            match fs::remove_file(&path) {
                Ok(()) => log::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(AskblogError::Io(e)),
            }
        }
        Ok(())
    }

    /// Serialize to a temp file in the cache root, then rename into place
    fn write_atomic<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        let json = serde_json::to_string(value)
            .map_err(|e| AskblogError::Cache(format!("serialization failed: {}", e)))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn cache_error(path: &Path, detail: &str) -> AskblogError {
    AskblogError::Cache(format!(
        "{} is {}; run `askblog refresh` to rebuild the cache",
        path.display(),
        detail
    ))
}
