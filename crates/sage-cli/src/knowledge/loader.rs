//! Fetch a web page and reduce it to readable text

use anyhow::{Context, bail};
use regex::Regex;
use std::sync::LazyLock;

static SKIPPED_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|svg|template|head)\b.*?</(script|style|noscript|svg|template|head)\s*>")
        .unwrap()
});
static COMMENTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static BLOCK_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(p|div|section|article|header|footer|nav|aside|main|h[1-6]|li|ul|ol|tr|table|blockquote|pre|figure|figcaption)\b[^>]*>|<br\s*/?>")
        .unwrap()
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f\u{a0}]+").unwrap());
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n(\s*\n)*").unwrap());

/// A loaded document
#[derive(Debug, Clone)]
pub struct Document {
    pub source: String,
    pub text: String,
}

/// Strip markup, keeping block boundaries as blank lines so the splitter can
/// cut on paragraphs.
pub fn html_to_text(html: &str) -> String {
    let text = SKIPPED_BLOCKS.replace_all(html, " ");
    let text = COMMENTS.replace_all(&text, " ");
    let text = BLOCK_TAGS.replace_all(&text, "\n\n");
    let text = TAGS.replace_all(&text, "");
    let text = html_escape::decode_html_entities(&text);

    let lines: Vec<String> = text
        .lines()
        .map(|line| INLINE_SPACE.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

/// Download `url` and extract its text
pub async fn fetch_document(client: &reqwest::Client, url: &str) -> anyhow::Result<Document> {
    tracing::info!(url, "fetching document");
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, concat!("sage/", env!("CARGO_PKG_VERSION")))
        .send()
        .await
        .with_context(|| format!("failed to fetch {}", url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("fetching {} returned HTTP {}", url, status);
    }

    let is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_none_or(|ct| ct.contains("html"));
    let body = response.text().await.context("failed to read document body")?;

    let text = if is_html { html_to_text(&body) } else { body };
    if text.trim().is_empty() {
        bail!("document at {} has no text", url);
    }

    Ok(Document {
        source: url.to_string(),
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_keeps_paragraphs() {
        let html = r#"<html><head><title>x</title><style>p { color: red; }</style></head>
            <body><h1>AI agents</h1><p>Agents   act on
            your behalf.</p><script>var x = 1;</script><p>They use&nbsp;tools &amp; memory.</p></body></html>"#;
        let text = html_to_text(html);
        assert_eq!(
            text,
            "AI agents\n\nAgents act on\nyour behalf.\n\nThey use tools & memory."
        );
    }

    #[test]
    fn test_html_to_text_drops_comments_and_inline_tags() {
        let text = html_to_text("<div>one <b>two</b><!-- hidden --> <a href=\"#\">three</a></div>");
        assert_eq!(text, "one two three");
    }

    #[test]
    fn test_html_to_text_decodes_named_entities() {
        let text = html_to_text("<p>Caf&eacute; &copy; 2024 &hellip; &euro;5</p><p>AT&amp;T &#8217;s &#x41;</p>");
        assert_eq!(text, "Café © 2024 … €5\n\nAT&T \u{2019}s A");
    }
}
