//! arXiv paper search tool

use async_trait::async_trait;
use regex::Regex;
use sage_agent::{Tool, ToolResult, query_schema};
use std::sync::LazyLock;

use crate::utils::{clip_chars, squash_whitespace};

const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";
const MAX_QUERY_CHARS: usize = 300;
const NO_RESULT: &str = "No good Arxiv Result was found";

static ENTRY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").unwrap());
static AUTHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").unwrap());

/// One parsed Atom entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paper {
    pub published: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
}

/// Query the arXiv API and summarize the top papers
pub struct ArxivTool {
    client: reqwest::Client,
    api_url: String,
    top_k: usize,
    max_chars: usize,
}

impl ArxivTool {
    pub fn new(client: reqwest::Client, top_k: usize, max_chars: usize) -> Self {
        Self {
            client,
            api_url: ARXIV_API_URL.to_string(),
            top_k: top_k.max(1),
            max_chars,
        }
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<Paper>> {
        let url = format!(
            "{}?search_query={}&start=0&max_results={}",
            self.api_url,
            urlencoding::encode(&format!("all:{}", query)),
            self.top_k
        );
        tracing::debug!(url = %url, "querying arxiv");

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_feed(&body))
    }
}

fn tag_text(entry: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let start = entry.find(&open)?;
    let after_open = start + entry[start..].find('>')? + 1;
    let end = after_open + entry[after_open..].find(&format!("</{}>", tag))?;
    Some(squash_whitespace(&html_escape::decode_html_entities(&entry[after_open..end])))
}

/// Parse an arXiv Atom feed into papers, in feed order
pub fn parse_feed(xml: &str) -> Vec<Paper> {
    ENTRY
        .captures_iter(xml)
        .filter_map(|cap| {
            let entry = cap.get(1)?.as_str();
            let title = tag_text(entry, "title")?;
            let date = tag_text(entry, "updated").or_else(|| tag_text(entry, "published"))?;
            Some(Paper {
                published: date.chars().take(10).collect(),
                title,
                authors: AUTHOR
                    .captures_iter(entry)
                    .map(|a| squash_whitespace(&html_escape::decode_html_entities(&a[1])))
                    .collect(),
                summary: tag_text(entry, "summary").unwrap_or_default(),
            })
        })
        .collect()
}

/// Render papers as blocks joined by blank lines, capped at `max_chars` in total.
pub fn format_papers(papers: &[Paper], max_chars: usize) -> Option<String> {
    if papers.is_empty() {
        return None;
    }
    let blocks: Vec<String> = papers
        .iter()
        .map(|p| {
            format!(
                "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
                p.published,
                p.title,
                p.authors.join(", "),
                p.summary
            )
        })
        .collect();
    Some(clip_chars(&blocks.join("\n\n"), max_chars).to_string())
}

#[async_trait]
impl Tool for ArxivTool {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn description(&self) -> &str {
        "A wrapper around Arxiv.org. Useful for when you need to answer questions about Physics, \
         Mathematics, Computer Science, Quantitative Biology, Quantitative Finance, Statistics, \
         Electrical Engineering, and Economics from scientific articles on arxiv.org. Input \
         should be a search query."
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
            Ok(papers) => match format_papers(&papers, self.max_chars) {
                Some(text) => ToolResult::text(text),
                None => ToolResult::error(NO_RESULT),
            },
            Err(e) => {
                tracing::warn!(error = %e, "arxiv lookup failed");
                ToolResult::error(format!("arXiv request failed: {}", e))
            }
        }
    }
}
