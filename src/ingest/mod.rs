pub mod chunker;
pub mod extract;

pub use chunker::{split_documents, Chunk};
pub use extract::extract_document;

use crate::error::{AskblogError, Result};
use crate::progress::{report, ProgressSink};
use reqwest::Client;

/// A fetched blog post, normalized to readable text.
///
/// Transient: exists only during one ingestion pass and feeds the chunker.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
}

/// Fetch and normalize the given post URLs into text documents.
///
/// A URL that fails to load or yields no readable text is dropped with a
/// warning; the batch only fails when every URL failed, since an empty
/// document set cannot produce a usable index. Output preserves input order
/// and every document keeps its source URL for later attribution.
pub async fn ingest(
    client: &Client,
    urls: &[String],
    progress: Option<&dyn ProgressSink>,
) -> Result<Vec<Document>> {
    report(
        progress,
        &format!("Loading and parsing {} blog posts...", urls.len()),
    );

    let mut documents = Vec::new();
    for url in urls {
        match fetch_document(client, url).await {
            Ok(doc) => documents.push(doc),
            Err(e) => log::warn!("Skipping {}: {}", url, e),
        }
    }

    if documents.is_empty() && !urls.is_empty() {
        return Err(AskblogError::Parse(format!(
            "None of the {} post URLs could be ingested",
            urls.len()
        )));
    }

    log::info!("Ingested {} of {} posts", documents.len(), urls.len());
    Ok(documents)
}

async fn fetch_document(client: &Client, url: &str) -> Result<Document> {
    let html = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    extract_document(url, &html)
}
