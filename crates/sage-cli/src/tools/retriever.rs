//! Document retriever tool over the ingested article

use async_trait::async_trait;
use sage_agent::{Tool, ToolResult, query_schema};
use std::sync::Arc;

use crate::knowledge::KnowledgeBase;

pub const RETRIEVER_NAME: &str = "document_retriever";
pub const RETRIEVER_DESCRIPTION: &str =
    "Retrieves relevant documents about AI agents from Microsoft news article";

/// Number of chunks returned per query
pub const DEFAULT_RETRIEVER_K: usize = 4;

/// Similarity search over the knowledge base.
///
/// If ingestion failed at startup the tool stays registered and answers every
/// call with the ingestion error.
pub struct RetrieverTool {
    knowledge: Result<Arc<KnowledgeBase>, String>,
    k: usize,
}

impl RetrieverTool {
    pub fn new(knowledge: Arc<KnowledgeBase>, k: usize) -> Self {
        Self {
            knowledge: Ok(knowledge),
            k: k.max(1),
        }
    }

    /// A retriever whose document could not be loaded
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            knowledge: Err(reason.into()),
            k: DEFAULT_RETRIEVER_K,
        }
    }
}

#[async_trait]
impl Tool for RetrieverTool {
    fn name(&self) -> &str {
        RETRIEVER_NAME
    }

    fn description(&self) -> &str {
        RETRIEVER_DESCRIPTION
    }

    fn parameters_schema(&self) -> serde_json::Value {
        query_schema("What to look up in the article")
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolResult {
        let query = match arguments.get("query").and_then(|v| v.as_str()) {
            Some(q) => q,
            None => return ToolResult::error("Missing 'query' argument"),
        };

        let knowledge = match &self.knowledge {
            Ok(kb) => kb,
            Err(reason) => {
                return ToolResult::error(format!("The document is not available: {}", reason));
            }
        };

        match knowledge.search(query, self.k).await {
            Ok(hits) if hits.is_empty() => ToolResult::error("No relevant passages found"),
            Ok(hits) => {
                tracing::debug!(query, hits = hits.len(), "retrieved chunks");
                let passages: Vec<String> = hits.into_iter().map(|h| h.text).collect();
                ToolResult::text(passages.join("\n\n"))
            }
            Err(e) => ToolResult::error(format!("Retrieval failed: {:#}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{Document, TextSplitter};
    use sage_ai::HashEmbedder;

    async fn retriever(k: usize) -> RetrieverTool {
        let document = Document {
            source: "test".into(),
            text: "Agents plan multi-step work.\n\nAgents call tools.\n\nCats sleep all day.".into(),
        };
        let kb = KnowledgeBase::build(
            document,
            &TextSplitter::new(30, 0).unwrap(),
            Arc::new(HashEmbedder::default()),
        )
        .await
        .unwrap();
        RetrieverTool::new(Arc::new(kb), k)
    }

    #[tokio::test]
    async fn test_returns_k_passages_joined() {
        let tool = retriever(2).await;
        let result = tool
            .execute(serde_json::json!({"query": "agents tools"}))
            .await;
        assert!(!result.is_error);
        let text = result.text_content();
        assert_eq!(text.split("\n\n").count(), 2);
        assert!(text.starts_with("Agents call tools."));
    }

    #[tokio::test]
    async fn test_unavailable_reports_reason() {
        let tool = RetrieverTool::unavailable("HTTP 503");
        let result = tool.execute(serde_json::json!({"query": "x"})).await;
        assert!(result.is_error);
        assert!(result.text_content().contains("HTTP 503"));
    }
}
