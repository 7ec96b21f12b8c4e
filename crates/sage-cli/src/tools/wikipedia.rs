//! Wikipedia lookup tool

use async_trait::async_trait;
use sage_agent::{Tool, ToolResult, query_schema};
use serde::Deserialize;
use std::collections::HashMap;

use crate::utils::clip_chars;

const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
const MAX_QUERY_CHARS: usize = 300;
const NO_RESULT: &str = "No good Wikipedia Search Result was found";

/// Search Wikipedia and return the intro of the top pages
pub struct WikipediaTool {
    client: reqwest::Client,
    api_url: String,
    top_k: usize,
    max_chars: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryPages>,
}

#[derive(Debug, Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    extract: Option<String>,
}

impl WikipediaTool {
    pub fn new(client: reqwest::Client, top_k: usize, max_chars: usize) -> Self {
        Self {
            client,
            api_url: WIKIPEDIA_API_URL.to_string(),
            top_k: top_k.max(1),
            max_chars,
        }
    }

    /// Point at another MediaWiki instance
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// (title, intro) of the best matching pages, in search rank order
    async fn search(&self, query: &str) -> anyhow::Result<Vec<(String, String)>> {
        let limit = self.top_k.to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrlimit", limit.as_str()),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exlimit", "max"),
                ("redirects", "1"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: QueryResponse = response.json().await?;
        Ok(ranked_pages(body))
    }
}

fn ranked_pages(body: QueryResponse) -> Vec<(String, String)> {
    let mut pages: Vec<Page> = body
        .query
        .map(|q| q.pages.into_values().collect())
        .unwrap_or_default();
    pages.sort_by_key(|p| p.index);
    pages
        .into_iter()
        .filter_map(|p| {
            let extract = p.extract?.trim().to_string();
            (!extract.is_empty()).then_some((p.title, extract))
        })
        .collect()
}

/// Render pages as `Page:`/`Summary:` blocks, capped at `max_chars` in total.
pub fn format_pages(pages: &[(String, String)], max_chars: usize) -> Option<String> {
    if pages.is_empty() {
        return None;
    }
    let blocks: Vec<String> = pages
        .iter()
        .map(|(title, summary)| format!("Page: {}\nSummary: {}", title, summary))
        .collect();
    Some(clip_chars(&blocks.join("\n\n"), max_chars).to_string())
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "A wrapper around Wikipedia. Useful for when you need to answer general questions about \
         people, places, companies, facts, historical events, or other subjects. Input should be \
         a search query."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        query_schema("Search query")
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolResult {
        let query = match arguments.get("query").and_then(|v| v.as_str()) {
            Some(q) => clip_chars(q.trim(), MAX_QUERY_CHARS),
            None => return ToolResult::error("Missing 'query' argument"),
        };

        match self.search(query).await {
            Ok(pages) => match format_pages(&pages, self.max_chars) {
                Some(text) => ToolResult::text(text),
                None => ToolResult::error(NO_RESULT),
            },
            Err(e) => {
                tracing::warn!(error = %e, "wikipedia lookup failed");
                ToolResult::error(format!("Wikipedia request failed: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_pages_follow_search_index() {
        let body: QueryResponse = serde_json::from_value(serde_json::json!({
            "batchcomplete": "",
            "query": {
                "pages": {
                    "22989": {"pageid": 22989, "title": "Paris", "index": 1,
                              "extract": "Paris is the capital and largest city of France."},
                    "5843419": {"pageid": 5843419, "title": "France", "index": 2,
                                "extract": "France is a country in Western Europe."},
                    "1": {"pageid": 1, "title": "Empty", "index": 3, "extract": "  "}
                }
            }
        }))
        .unwrap();
        let pages = ranked_pages(body);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].0, "Paris");
        assert_eq!(pages[1].0, "France");
    }

    #[test]
    fn test_no_query_section_means_no_pages() {
        let body: QueryResponse = serde_json::from_value(serde_json::json!({"batchcomplete": ""})).unwrap();
        assert!(ranked_pages(body).is_empty());
    }

    #[test]
    fn test_format_pages_caps_total_length() {
        let pages = vec![
            ("Paris".to_string(), "Paris is the capital of France.".to_string()),
            ("Lyon".to_string(), "x".repeat(600)),
        ];
        let text = format_pages(&pages, 500).unwrap();
        assert!(text.starts_with("Page: Paris\nSummary: Paris is the capital of France.\n\nPage: Lyon"));
        assert_eq!(text.chars().count(), 500);
        assert_eq!(format_pages(&[], 500), None);
    }
}
