//! In-memory vector index with brute-force cosine similarity search

/// A single hit returned from a search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Position of the chunk in ingestion order
    pub chunk: usize,
    pub score: f64,
    pub text: String,
}

#[derive(Debug, Clone)]
struct IndexedChunk {
    text: String,
    embedding: Vec<f32>,
}

/// Chunks and their embeddings. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dimensions: Option<usize>,
    entries: Vec<IndexedChunk>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk. Every embedding must have the width of the first one.
    pub fn insert(&mut self, text: String, embedding: Vec<f32>) -> anyhow::Result<()> {
        let width = *self.dimensions.get_or_insert(embedding.len());
        anyhow::ensure!(
            embedding.len() == width,
            "embedding has {} dimensions, index expects {}",
            embedding.len(),
            width
        );
        self.entries.push(IndexedChunk { text, embedding });
        Ok(())
    }

    /// The `k` nearest chunks to `query`, best first. Ties keep ingestion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        if self.is_empty() || k == 0 {
            return Vec::new();
        }
        let mut scored: Vec<SearchHit> = self
            .entries
            .iter()
            .enumerate()
            .map(|(chunk, entry)| SearchHit {
                chunk,
                score: cosine_similarity(query, &entry.embedding),
                text: entry.text.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cosine similarity; 0.0 for mismatched widths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_orders_by_similarity() {
        let mut index = VectorIndex::new();
        index.insert("east".into(), vec![1.0, 0.0]).unwrap();
        index.insert("north".into(), vec![0.0, 1.0]).unwrap();
        index.insert("north-east".into(), vec![1.0, 1.0]).unwrap();

        let hits = index.search(&[0.9, 0.1], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "east");
        assert_eq!(hits[1].text, "north-east");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_insert_rejects_mixed_widths() {
        let mut index = VectorIndex::new();
        index.insert("a".into(), vec![1.0, 0.0]).unwrap();
        assert!(index.insert("b".into(), vec![1.0]).is_err());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_cosine_edge_cases() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[2.0, 0.0], &[5.0, 0.0]) - 1.0).abs() < 1e-9);
    }
}
