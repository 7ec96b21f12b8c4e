//! Web search through the Tavily API

use async_trait::async_trait;
use sage_agent::{Tool, ToolResult, query_schema};
use serde::{Deserialize, Serialize};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";

pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const DEFAULT_TOPIC: &str = "general";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    topic: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// Tavily search; answers with an error result when no API key is configured
pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    max_results: usize,
    topic: String,
}

impl WebSearchTool {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        max_results: usize,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_url: TAVILY_API_URL.to_string(),
            max_results: max_results.max(1),
            topic: topic.into(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, api_key: &str, query: &str) -> anyhow::Result<Vec<SearchResult>> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&SearchRequest {
                query,
                max_results: self.max_results,
                topic: &self.topic,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {}: {}", status, body);
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.results)
    }
}

/// Render hits as `title\nurl\ncontent` blocks
pub fn format_results(results: &[SearchResult]) -> Option<String> {
    let blocks: Vec<String> = results
        .iter()
        .filter(|r| !r.content.trim().is_empty() || !r.url.is_empty())
        .map(|r| format!("{}\n{}\n{}", r.title.trim(), r.url, r.content.trim()))
        .collect();
    (!blocks.is_empty()).then(|| blocks.join("\n\n"))
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "A search engine optimized for comprehensive, accurate, and trusted results. Useful for \
         when you need to answer questions about current events. Input should be a search query."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        query_schema("Search query")
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolResult {
        let query = match arguments.get("query").and_then(|v| v.as_str()) {
            Some(q) => q.trim(),
            None => return ToolResult::error("Missing 'query' argument"),
        };
        let Some(api_key) = self.api_key.as_deref() else {
            return ToolResult::error("Web search is not configured: TAVILY_API_KEY is not set");
        };

        match self.search(api_key, query).await {
            Ok(results) => match format_results(&results) {
                Some(text) => ToolResult::text(text),
                None => ToolResult::error(format!("No web results found for '{}'", query)),
            },
            Err(e) => {
                tracing::warn!(error = %e, "web search failed");
                ToolResult::error(format!("Web search failed: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format_results() {
        let body: SearchResponse = serde_json::from_value(serde_json::json!({
            "query": "rust 2024 edition",
            "response_time": 1.2,
            "results": [
                {"title": "Rust 2024 ", "url": "https://blog.rust-lang.org/", "content": "Released with 1.85.", "score": 0.9},
                {"title": "Empty", "url": "", "content": " "}
            ]
        }))
        .unwrap();
        assert_eq!(
            format_results(&body.results).as_deref(),
            Some("Rust 2024\nhttps://blog.rust-lang.org/\nReleased with 1.85.")
        );
        assert_eq!(format_results(&[]), None);
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(SearchRequest {
            query: "q",
            max_results: DEFAULT_MAX_RESULTS,
            topic: DEFAULT_TOPIC,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"query": "q", "max_results": 5, "topic": "general"})
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_an_error_result() {
        let tool = WebSearchTool::new(reqwest::Client::new(), Some("  ".into()), 5, "general");
        assert!(!tool.has_api_key());
        let result = tool.execute(serde_json::json!({"query": "news"})).await;
        assert!(result.is_error);
        assert!(result.text_content().contains("TAVILY_API_KEY"));
    }
}
