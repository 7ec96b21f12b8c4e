//! The agent's toolset: document retriever, Wikipedia, arXiv, web search

mod arxiv;
mod retriever;
mod web_search;
mod wikipedia;

pub use arxiv::ArxivTool;
pub use retriever::{DEFAULT_RETRIEVER_K, RetrieverTool};
pub use web_search::{DEFAULT_MAX_RESULTS, DEFAULT_TOPIC, WebSearchTool};
pub use wikipedia::WikipediaTool;

use sage_agent::{BoxedTool, ToolRegistry};
use std::sync::Arc;

use crate::config::Settings;
use crate::knowledge::KnowledgeBase;

/// Results per Wikipedia/arXiv query
pub const DEFAULT_TOP_K: usize = 3;
/// Character cap on Wikipedia/arXiv output
pub const DEFAULT_DOC_CHARS_MAX: usize = 500;

/// Register the four tools in their fixed order.
///
/// `knowledge` carries the ingestion error when the document could not be
/// indexed; the retriever then reports it on every call.
pub fn build_registry(
    settings: &Settings,
    client: &reqwest::Client,
    knowledge: Result<Arc<KnowledgeBase>, String>,
    tavily_key: Option<String>,
) -> anyhow::Result<ToolRegistry> {
    let retriever = match knowledge {
        Ok(kb) => RetrieverTool::new(kb, settings.retriever_k),
        Err(reason) => RetrieverTool::unavailable(reason),
    };

    let web = WebSearchTool::new(
        client.clone(),
        tavily_key,
        settings.web_max_results,
        settings.web_topic.clone(),
    );
    if !web.has_api_key() {
        tracing::warn!("TAVILY_API_KEY is not set, web search will report an error");
    }

    let tools: Vec<BoxedTool> = vec![
        Arc::new(retriever),
        Arc::new(WikipediaTool::new(
            client.clone(),
            settings.top_k_results,
            settings.doc_content_chars_max,
        )),
        Arc::new(ArxivTool::new(
            client.clone(),
            settings.top_k_results,
            settings.doc_content_chars_max,
        )),
        Arc::new(web),
    ];
    Ok(ToolRegistry::from_tools(tools)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Overrides};

    #[tokio::test]
    async fn test_registry_order_and_schemas() {
        let settings = Config::default().resolve(&Overrides::default());
        let registry = build_registry(
            &settings,
            &reqwest::Client::new(),
            Err("offline".into()),
            None,
        )
        .unwrap();
        assert_eq!(
            registry.names(),
            vec!["document_retriever", "wikipedia", "arxiv", "web_search"]
        );
        for def in registry.definitions() {
            assert_eq!(def.parameters["required"], serde_json::json!(["query"]));
        }

        let result = registry
            .invoke("document_retriever", serde_json::json!({"query": "agents"}))
            .await;
        assert!(result.is_error);
        assert!(result.text_content().contains("offline"));
    }
}
