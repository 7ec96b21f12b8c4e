//! Text embedding backends
//!
//! - `HuggingFaceEmbedder` calls the hosted feature-extraction pipeline for a
//!   sentence-transformer model (all-MiniLM-L6-v2 by default).
//! - `HashEmbedder` is an offline bag-of-words hashing embedder. Texts that
//!   share vocabulary land close together, which is enough for keyword-level
//!   retrieval without network access.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Error, Result};

/// Default sentence-transformer model
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Output width of all-MiniLM-L6-v2
pub const MINILM_DIMENSIONS: usize = 384;

const HF_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference/models";

/// Converts text into fixed-width vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; the output has one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("no vector returned".into()))
    }

    /// Width of the vectors this embedder produces
    fn dimensions(&self) -> usize;
}

/// Hosted Hugging Face inference embedder
pub struct HuggingFaceEmbedder {
    client: reqwest::Client,
    token: Option<String>,
    url: String,
    batch_size: usize,
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
}

impl HuggingFaceEmbedder {
    pub fn new(model: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            url: format!("{}/{}/pipeline/feature-extraction", HF_INFERENCE_URL, model),
            batch_size: 32,
        }
    }

    /// Override the endpoint (self-hosted text-embeddings-inference, etc.)
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut req = self
            .client
            .post(&self.url)
            .json(&FeatureExtractionRequest { inputs });
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status, body));
        }

        let body: serde_json::Value = response.json().await?;
        parse_feature_extraction(&body, inputs.len())
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            tracing::debug!(batch = batch.len(), "embedding batch");
            out.extend(self.request(batch).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        MINILM_DIMENSIONS
    }
}

/// Parse a feature-extraction response.
///
/// Sentence-transformer pipelines return one pooled vector per input. Raw
/// transformer pipelines return token-level vectors, which are mean-pooled here.
fn parse_feature_extraction(body: &serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let rows = body
        .as_array()
        .ok_or_else(|| Error::Embedding(format!("expected an array, got: {}", body)))?;
    if rows.len() != expected {
        return Err(Error::Embedding(format!(
            "expected {} vectors, got {}",
            expected,
            rows.len()
        )));
    }

    rows.iter()
        .map(|row| {
            let items = row
                .as_array()
                .ok_or_else(|| Error::Embedding("vector is not an array".into()))?;
            if items.first().is_some_and(|v| v.is_array()) {
                let tokens = items
                    .iter()
                    .map(to_floats)
                    .collect::<Result<Vec<_>>>()?;
                Ok(mean_pool(&tokens))
            } else {
                to_floats(row)
            }
        })
        .collect()
}

fn to_floats(value: &serde_json::Value) -> Result<Vec<f32>> {
    value
        .as_array()
        .ok_or_else(|| Error::Embedding("vector is not an array".into()))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| Error::Embedding("non-numeric vector component".into()))
        })
        .collect()
}

fn mean_pool(tokens: &[Vec<f32>]) -> Vec<f32> {
    let width = tokens.first().map_or(0, Vec::len);
    let mut pooled = vec![0.0f32; width];
    for token in tokens {
        for (acc, v) in pooled.iter_mut().zip(token) {
            *acc += v;
        }
    }
    let n = tokens.len().max(1) as f32;
    pooled.iter_mut().for_each(|v| *v /= n);
    pooled
}

/// Offline embedder hashing lowercase word tokens into signed buckets.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(MINILM_DIMENSIONS)
    }
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h % self.dimensions as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_hash_embedder_is_deterministic_and_normalized() {
        let e = HashEmbedder::default();
        let a = e.embed("AI agents automate work").await.unwrap();
        let b = e.embed("AI agents automate work").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), MINILM_DIMENSIONS);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hash_embedder_shared_words_score_higher() {
        let e = HashEmbedder::default();
        let q = e.embed_text("what are AI agents");
        let near = e.embed_text("AI agents are systems that act on your behalf");
        let far = e.embed_text("the recipe needs flour and butter");
        assert!(cosine(&q, &near) > cosine(&q, &far));
    }

    #[test]
    fn test_hash_embedder_empty_text_is_zero() {
        let v = HashEmbedder::new(8).embed_text("   ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_parse_pooled_vectors() {
        let body = serde_json::json!([[0.1, 0.2], [0.3, 0.4]]);
        let v = parse_feature_extraction(&body, 2).unwrap();
        assert_eq!(v, vec![vec![0.1f32, 0.2], vec![0.3f32, 0.4]]);
    }

    #[test]
    fn test_parse_token_vectors_are_mean_pooled() {
        let body = serde_json::json!([[[1.0, 0.0], [3.0, 2.0]]]);
        let v = parse_feature_extraction(&body, 1).unwrap();
        assert_eq!(v, vec![vec![2.0f32, 1.0]]);
    }

    #[test]
    fn test_parse_rejects_count_mismatch_and_errors() {
        assert!(parse_feature_extraction(&serde_json::json!([[0.1]]), 2).is_err());
        assert!(
            parse_feature_extraction(&serde_json::json!({"error": "loading"}), 1).is_err()
        );
    }
}
