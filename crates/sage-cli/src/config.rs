//! Configuration file support

use sage_ai::{Model, Provider};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::knowledge::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::tools::{DEFAULT_DOC_CHARS_MAX, DEFAULT_MAX_RESULTS, DEFAULT_RETRIEVER_K, DEFAULT_TOP_K, DEFAULT_TOPIC};

/// Article indexed for the document retriever
pub const DEFAULT_DOCUMENT_URL: &str = "https://news.microsoft.com/source/features/ai/ai-agents-what-they-are-and-how-theyll-change-the-way-we-work/";

/// Configuration for sage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reasoning model
    pub model: Option<String>,
    /// Provider (groq, openai, openrouter, ollama)
    pub provider: Option<String>,
    /// Override the provider's API base URL
    pub base_url: Option<String>,
    /// Reasoning steps allowed per turn
    pub max_steps: Option<u32>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
    /// Color theme (dark, light)
    pub theme: Option<String>,
    /// Replaces the built-in system prompt
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    /// API keys (alternative to environment variables)
    #[serde(default)]
    pub api_keys: ApiKeys,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub document_url: Option<String>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub retriever_k: Option<usize>,
    /// "huggingface" or "local"
    pub embeddings: Option<String>,
    pub embedding_model: Option<String>,
    pub embedding_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub top_k_results: Option<usize>,
    pub doc_content_chars_max: Option<usize>,
    pub web_max_results: Option<usize>,
    pub web_topic: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub transcription_model: Option<String>,
    /// Defaults to the chat provider's base URL, or Groq's when it has no Whisper endpoint
    pub transcription_url: Option<String>,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub groq: Option<String>,
    pub openai: Option<String>,
    pub openrouter: Option<String>,
    pub tavily: Option<String>,
    pub huggingface: Option<String>,
}

/// Embedding backend for the document index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    HuggingFace,
    Local,
}

/// Values given on the command line; they win over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub provider: Option<String>,
    pub max_steps: Option<u32>,
    pub document_url: Option<String>,
    pub no_tui: bool,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub model: Model,
    pub max_steps: u32,
    pub use_tui: bool,
    pub theme: String,
    pub system_prompt: Option<String>,
    pub document_url: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retriever_k: usize,
    pub embeddings: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_url: Option<String>,
    pub top_k_results: usize,
    pub doc_content_chars_max: usize,
    pub web_max_results: usize,
    pub web_topic: String,
    pub transcription_model: String,
    pub transcription_url: String,
    /// Provider whose API key authenticates transcription requests
    pub transcription_provider: Provider,
}

/// Config service name holding a provider's key; `None` for keyless providers
pub fn key_service(provider: Provider) -> Option<&'static str> {
    match provider {
        Provider::Groq => Some("groq"),
        Provider::OpenAI => Some("openai"),
        Provider::OpenRouter => Some("openrouter"),
        Provider::Ollama | Provider::Custom => None,
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sage")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SAGE_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Write the example config if no config file exists yet
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, example_config())?;
        Ok(path)
    }

    /// API key for a service, checking config then environment
    pub fn get_api_key(&self, service: &str) -> Option<String> {
        let from_config = match service {
            "groq" => self.api_keys.groq.clone(),
            "openai" => self.api_keys.openai.clone(),
            "openrouter" => self.api_keys.openrouter.clone(),
            "tavily" => self.api_keys.tavily.clone(),
            "huggingface" => self.api_keys.huggingface.clone(),
            _ => None,
        };
        if let Some(key) = from_config.filter(|k| !k.is_empty()) {
            return Some(key);
        }

        let env_vars: &[&str] = match service {
            "groq" => &["GROQ_API_KEY"],
            "openai" => &["OPENAI_API_KEY"],
            "openrouter" => &["OPENROUTER_API_KEY"],
            "tavily" => &["TAVILY_API_KEY"],
            "huggingface" => &["HF_TOKEN", "HUGGINGFACEHUB_API_TOKEN"],
            _ => &[],
        };
        env_vars
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|k| !k.is_empty()))
    }

    /// Merge defaults, this file and command-line overrides
    pub fn resolve(&self, overrides: &Overrides) -> Settings {
        let provider = Provider::from_id(
            overrides
                .provider
                .as_deref()
                .or(self.provider.as_deref())
                .unwrap_or("groq"),
        );
        let model_id = overrides
            .model
            .as_deref()
            .or(self.model.as_deref())
            .unwrap_or(sage_ai::models::DEFAULT_MODEL_ID);
        let model = sage_ai::models::resolve_model(provider, model_id, self.base_url.as_deref());

        let embeddings = match self.knowledge.embeddings.as_deref() {
            Some("local") => EmbeddingBackend::Local,
            _ => EmbeddingBackend::HuggingFace,
        };

        // Providers without a Whisper endpoint borrow Groq's
        let (transcription_url, transcription_provider) = match &self.voice.transcription_url {
            Some(url) => (url.clone(), model.provider),
            None if model.provider.serves_transcription() => (model.base_url.clone(), model.provider),
            None => (Provider::Groq.default_base_url().to_string(), Provider::Groq),
        };

        Settings {
            max_steps: overrides
                .max_steps
                .or(self.max_steps)
                .unwrap_or(sage_agent::DEFAULT_MAX_STEPS)
                .max(1),
            use_tui: !overrides.no_tui && self.tui.unwrap_or(true),
            theme: self.theme.clone().unwrap_or_else(|| "dark".to_string()),
            system_prompt: self.system_prompt.clone(),
            document_url: overrides
                .document_url
                .clone()
                .or_else(|| self.knowledge.document_url.clone())
                .unwrap_or_else(|| DEFAULT_DOCUMENT_URL.to_string()),
            chunk_size: self.knowledge.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            chunk_overlap: self.knowledge.chunk_overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP),
            retriever_k: self.knowledge.retriever_k.unwrap_or(DEFAULT_RETRIEVER_K),
            embeddings,
            embedding_model: self
                .knowledge
                .embedding_model
                .clone()
                .unwrap_or_else(|| sage_ai::embeddings::DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_url: self.knowledge.embedding_url.clone(),
            top_k_results: self.tools.top_k_results.unwrap_or(DEFAULT_TOP_K),
            doc_content_chars_max: self
                .tools
                .doc_content_chars_max
                .unwrap_or(DEFAULT_DOC_CHARS_MAX),
            web_max_results: self.tools.web_max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            web_topic: self
                .tools
                .web_topic
                .clone()
                .unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
            transcription_model: self
                .voice
                .transcription_model
                .clone()
                .unwrap_or_else(|| sage_ai::transcription::DEFAULT_TRANSCRIPTION_MODEL.to_string()),
            transcription_url,
            transcription_provider,
            model,
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# sage configuration file
# Place at ~/.config/sage/config.toml (Linux), ~/Library/Application Support/sage/config.toml
# (macOS) or %APPDATA%\sage\config.toml (Windows), or point SAGE_CONFIG_PATH at it.

# Reasoning model and provider (groq, openai, openrouter, ollama)
model = "openai/gpt-oss-120b"
provider = "groq"

# base_url = "http://localhost:11434/v1"

# Reasoning steps allowed per question before giving up
max_steps = 10

# Whether to use TUI mode by default
tui = true
theme = "dark"

[knowledge]
document_url = "https://news.microsoft.com/source/features/ai/ai-agents-what-they-are-and-how-theyll-change-the-way-we-work/"
chunk_size = 500
chunk_overlap = 50
retriever_k = 4
# "huggingface" (needs HF_TOKEN) or "local" (offline hashing embedder)
embeddings = "huggingface"
embedding_model = "sentence-transformers/all-MiniLM-L6-v2"

[tools]
top_k_results = 3
doc_content_chars_max = 500
web_max_results = 5
web_topic = "general"

[voice]
transcription_model = "whisper-large-v3-turbo"
# Defaults to the chat provider's API; openrouter and ollama fall back to Groq
# transcription_url = "https://api.groq.com/openai/v1"

# API keys (optional - environment variables or a .env file work too)
[api_keys]
# groq = "gsk_..."
# tavily = "tvly-..."
# huggingface = "hf_..."
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses_to_defaults() {
        let cfg: Config = toml::from_str(example_config()).unwrap();
        let s = cfg.resolve(&Overrides::default());
        let d = Config::default().resolve(&Overrides::default());
        assert_eq!(s.model.id, d.model.id);
        assert_eq!(s.model.provider, Provider::Groq);
        assert_eq!(s.max_steps, d.max_steps);
        assert_eq!(s.document_url, DEFAULT_DOCUMENT_URL);
        assert_eq!((s.chunk_size, s.chunk_overlap), (500, 50));
        assert_eq!(s.retriever_k, 4);
        assert_eq!((s.top_k_results, s.doc_content_chars_max), (3, 500));
        assert_eq!((s.web_max_results, s.web_topic.as_str()), (5, "general"));
        assert_eq!(s.embeddings, EmbeddingBackend::HuggingFace);
        assert_eq!(s.transcription_model, d.transcription_model);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let cfg: Config = toml::from_str(
            r#"
            model = "llama-3.3-70b-versatile"
            max_steps = 4
            tui = true
            [knowledge]
            embeddings = "local"
            "#,
        )
        .unwrap();
        let s = cfg.resolve(&Overrides {
            model: Some("openai/gpt-oss-20b".into()),
            max_steps: Some(0),
            document_url: Some("https://example.com/a".into()),
            no_tui: true,
            ..Default::default()
        });
        assert_eq!(s.model.id, "openai/gpt-oss-20b");
        assert_eq!(s.max_steps, 1);
        assert_eq!(s.document_url, "https://example.com/a");
        assert!(!s.use_tui);
        assert_eq!(s.embeddings, EmbeddingBackend::Local);
    }

    #[test]
    fn test_base_url_feeds_model_and_transcription() {
        let cfg: Config = toml::from_str(
            r#"
            provider = "custom"
            model = "qwen3"
            base_url = "http://localhost:9999/v1/"
            "#,
        )
        .unwrap();
        let s = cfg.resolve(&Overrides::default());
        assert_eq!(s.model.provider, Provider::Custom);
        assert_eq!(s.model.base_url, "http://localhost:9999/v1");
        assert_eq!(s.transcription_url, "http://localhost:9999/v1");
        assert_eq!(s.transcription_provider, Provider::Custom);
    }

    #[test]
    fn test_providers_without_whisper_transcribe_on_groq() {
        for provider in ["openrouter", "ollama"] {
            let s = Config::default().resolve(&Overrides {
                provider: Some(provider.into()),
                ..Default::default()
            });
            assert_eq!(s.transcription_url, "https://api.groq.com/openai/v1", "{}", provider);
            assert_eq!(s.transcription_provider, Provider::Groq);
        }

        let cfg: Config = toml::from_str(
            r#"
            provider = "openrouter"
            [voice]
            transcription_url = "http://whisper.local/v1"
            "#,
        )
        .unwrap();
        let s = cfg.resolve(&Overrides::default());
        assert_eq!(s.transcription_url, "http://whisper.local/v1");
        assert_eq!(s.transcription_provider, Provider::OpenRouter);
    }

    #[test]
    fn test_key_service_names() {
        assert_eq!(key_service(Provider::Groq), Some("groq"));
        assert_eq!(key_service(Provider::OpenRouter), Some("openrouter"));
        assert_eq!(key_service(Provider::Ollama), None);
    }

    #[test]
    fn test_config_key_wins_over_environment() {
        let cfg = Config {
            api_keys: ApiKeys {
                tavily: Some("tvly-from-file".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(cfg.get_api_key("tavily").as_deref(), Some("tvly-from-file"));
        assert_eq!(cfg.get_api_key("unknown"), None);
    }
}
