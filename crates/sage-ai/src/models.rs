//! Known chat models and lookup helpers.

use crate::{Model, Provider};

/// Model used when nothing is configured
pub const DEFAULT_MODEL_ID: &str = "openai/gpt-oss-120b";

struct KnownModel {
    provider: Provider,
    id: &'static str,
    context_window: u32,
    max_tokens: u32,
}

const KNOWN_MODELS: &[KnownModel] = &[
    KnownModel {
        provider: Provider::Groq,
        id: "openai/gpt-oss-120b",
        context_window: 131_072,
        max_tokens: 8192,
    },
    KnownModel {
        provider: Provider::Groq,
        id: "openai/gpt-oss-20b",
        context_window: 131_072,
        max_tokens: 8192,
    },
    KnownModel {
        provider: Provider::Groq,
        id: "llama-3.3-70b-versatile",
        context_window: 131_072,
        max_tokens: 8192,
    },
    KnownModel {
        provider: Provider::OpenAI,
        id: "gpt-4o-mini",
        context_window: 128_000,
        max_tokens: 16_384,
    },
    KnownModel {
        provider: Provider::OpenAI,
        id: "gpt-4.1",
        context_window: 1_047_576,
        max_tokens: 32_768,
    },
];

impl KnownModel {
    fn to_model(&self) -> Model {
        Model {
            id: self.id.to_string(),
            provider: self.provider,
            base_url: self.provider.default_base_url().to_string(),
            context_window: self.context_window,
            max_tokens: self.max_tokens,
            headers: Default::default(),
        }
    }
}

/// Look up a model by provider and ID.
pub fn get_model(provider: Provider, id: &str) -> Option<Model> {
    KNOWN_MODELS
        .iter()
        .find(|m| m.provider == provider && m.id == id)
        .map(KnownModel::to_model)
}

/// All registered models for a provider.
pub fn get_models(provider: Provider) -> Vec<Model> {
    KNOWN_MODELS
        .iter()
        .filter(|m| m.provider == provider)
        .map(KnownModel::to_model)
        .collect()
}

/// The default reasoning model (gpt-oss-120b on Groq).
pub fn default_model() -> Model {
    resolve_model(Provider::Groq, DEFAULT_MODEL_ID, None)
}

/// Resolve a model, falling back to conservative limits for unknown IDs.
///
/// `base_url` overrides the provider's default endpoint when given.
pub fn resolve_model(provider: Provider, id: &str, base_url: Option<&str>) -> Model {
    let mut model = get_model(provider, id).unwrap_or_else(|| Model {
        id: id.to_string(),
        provider,
        base_url: provider.default_base_url().to_string(),
        context_window: 32_768,
        max_tokens: 4096,
        headers: Default::default(),
    });
    if let Some(url) = base_url.filter(|u| !u.is_empty()) {
        model.base_url = url.trim_end_matches('/').to_string();
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_is_groq_gpt_oss() {
        let m = default_model();
        assert_eq!(m.id, "openai/gpt-oss-120b");
        assert_eq!(m.provider, Provider::Groq);
        assert_eq!(m.base_url, "https://api.groq.com/openai/v1");
    }

    #[test]
    fn test_resolve_unknown_model_uses_fallback_limits() {
        let m = resolve_model(Provider::Ollama, "qwen3:8b", None);
        assert_eq!(m.id, "qwen3:8b");
        assert_eq!(m.max_tokens, 4096);
        assert_eq!(m.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_resolve_applies_base_url_override() {
        let m = resolve_model(Provider::Custom, "x", Some("http://gpu-box:8000/v1/"));
        assert_eq!(m.base_url, "http://gpu-box:8000/v1");
    }

    #[test]
    fn test_get_models_filters_by_provider() {
        assert!(get_models(Provider::Groq).iter().all(|m| m.provider == Provider::Groq));
        assert!(get_model(Provider::OpenAI, "openai/gpt-oss-120b").is_none());
    }
}
