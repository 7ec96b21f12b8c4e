//! One-shot knowledge ingestion: fetch, split, embed, index

mod index;
mod loader;
mod splitter;

pub use index::{SearchHit, VectorIndex};
pub use loader::{Document, fetch_document};
pub use splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, TextSplitter};

use anyhow::Context;
use sage_ai::Embedder;
use std::sync::Arc;

/// Searchable chunks of one document
pub struct KnowledgeBase {
    source: String,
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
}

impl KnowledgeBase {
    /// Split and embed an already loaded document
    pub async fn build(
        document: Document,
        splitter: &TextSplitter,
        embedder: Arc<dyn Embedder>,
    ) -> anyhow::Result<Self> {
        let chunks = splitter.split(&document.text);
        anyhow::ensure!(!chunks.is_empty(), "{} produced no chunks", document.source);

        let vectors = embedder
            .embed_batch(&chunks)
            .await
            .context("failed to embed document chunks")?;
        anyhow::ensure!(
            vectors.len() == chunks.len(),
            "embedder returned {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        );

        let mut index = VectorIndex::new();
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            index.insert(chunk, vector)?;
        }
        tracing::info!(source = %document.source, chunks = index.len(), "document indexed");

        Ok(Self {
            source: document.source,
            index,
            embedder,
        })
    }

    /// Fetch `url` and index it
    pub async fn ingest(
        client: &reqwest::Client,
        url: &str,
        splitter: &TextSplitter,
        embedder: Arc<dyn Embedder>,
    ) -> anyhow::Result<Self> {
        let document = fetch_document(client, url).await?;
        Self::build(document, splitter, embedder).await
    }

    /// Chunks most similar to `query`, best first
    pub async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<SearchHit>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .context("failed to embed query")?;
        Ok(self.index.search(&vector, k))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_ai::HashEmbedder;

    const ARTICLE: &str = "AI agents are systems that can reason and act on your behalf.\n\n\
        Copilot Studio lets businesses build their own agents.\n\n\
        The bakery sells bread and croissants every morning.";

    async fn knowledge() -> KnowledgeBase {
        let document = Document {
            source: "test://article".into(),
            text: ARTICLE.into(),
        };
        let splitter = TextSplitter::new(70, 10).unwrap();
        KnowledgeBase::build(document, &splitter, Arc::new(HashEmbedder::default()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_indexes_every_chunk() {
        let kb = knowledge().await;
        assert_eq!(kb.len(), 3);
        assert_eq!(kb.source(), "test://article");
    }

    #[tokio::test]
    async fn test_search_prefers_matching_chunk() {
        let kb = knowledge().await;
        let hits = kb.search("bread croissants bakery", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text.contains("bakery"));
    }

    #[tokio::test]
    async fn test_build_rejects_empty_document() {
        let document = Document {
            source: "empty".into(),
            text: "   ".into(),
        };
        let result = KnowledgeBase::build(
            document,
            &TextSplitter::default(),
            Arc::new(HashEmbedder::default()),
        )
        .await;
        assert!(result.is_err());
    }
}
