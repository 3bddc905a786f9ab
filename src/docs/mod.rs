pub mod decode;
pub mod fetch;
pub mod title;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::error::{RagError, Result};
use decode::DocumentKind;
use fetch::SourceFetcher;
use types::{CorpusDocument, SourceRef};

/// Loads the corpus fresh for one question. Nothing survives the invocation.
pub struct DocumentStore {
    fetcher: Arc<dyn SourceFetcher>,
    concurrency: usize,
}

impl DocumentStore {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch and decode every source concurrently.
    ///
    /// All-or-nothing: the first fetch or decode failure aborts the whole load
    /// and the in-flight loads are dropped. Documents come back in `sources` order.
    pub async fn load_all(&self, sources: &[SourceRef]) -> Result<Vec<CorpusDocument>> {
        let mut seen = HashSet::new();
        if let Some(dup) = sources.iter().find(|s| !seen.insert(*s)) {
            return Err(RagError::config(format!("duplicate corpus source: {}", dup)));
        }

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let loads = sources.iter().map(|source| {
            let permits = permits.clone();
            async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| RagError::fetch(source.as_str(), e.to_string()))?;
                self.load_one(source).await
            }
        });

        let docs = try_join_all(loads).await?;
        info!(count = docs.len(), "corpus loaded");
        Ok(docs)
    }

    async fn load_one(&self, source: &SourceRef) -> Result<CorpusDocument> {
        let fetched = self.fetcher.fetch(source).await?;
        let digest = blake3::hash(&fetched.bytes).to_hex().to_string();
        let kind = DocumentKind::detect(fetched.content_type.as_deref(), source);

        // PDF decoding is CPU-bound; keep it off the async workers.
        let owned_source = source.clone();
        let pages = tokio::task::spawn_blocking(move || {
            decode::decode_pages(&owned_source, kind, &fetched.bytes)
        })
        .await
        .map_err(|e| RagError::decode(source.as_str(), format!("decoder task failed: {}", e)))??;

        let doc = build_document(source.clone(), &pages, digest)?;
        info!(
            source = %doc.source_id,
            title = %doc.title,
            pages = doc.pages,
            body_len = doc.body.len(),
            digest = %doc.digest,
            "document loaded"
        );
        Ok(doc)
    }
}

/// Assemble a [`CorpusDocument`] from decoded pages.
pub fn build_document(
    source_id: SourceRef,
    pages: &[String],
    digest: String,
) -> Result<CorpusDocument> {
    let first = pages
        .first()
        .ok_or_else(|| RagError::decode(source_id.as_str(), "document has no pages"))?;

    let title = title::derive_title(first);
    if title.is_empty() {
        return Err(RagError::decode(
            source_id.as_str(),
            "first page yields an empty title",
        ));
    }

    let body: String = pages.iter().map(|p| title::page_body(p)).collect();
    debug!(source = %source_id, %title, "title derived");

    Ok(CorpusDocument {
        source_id,
        title,
        body,
        pages: pages.len(),
        digest,
    })
}
