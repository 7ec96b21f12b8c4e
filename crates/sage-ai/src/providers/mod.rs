//! Chat completion providers

pub mod openai;

use crate::stream::{MessageBuilder, collect_message};
use crate::{ChatOptions, Context, Error, Message, MessageEventStream, Model, Result};
use async_trait::async_trait;

pub use openai::OpenAiCompatProvider;

/// A service that turns a context into a streamed assistant reply
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Stream a response from the model
    async fn stream(
        &self,
        model: &Model,
        context: &Context,
        options: &ChatOptions,
    ) -> Result<MessageEventStream>;

    /// Request a response and wait for the complete message
    async fn complete(
        &self,
        model: &Model,
        context: &Context,
        options: &ChatOptions,
    ) -> Result<Message> {
        let stream = self.stream(model, context, options).await?;
        collect_message(stream, MessageBuilder::new().with_origin(model.provider, &model.id)).await
    }
}

/// Get an API key from a provided value or the environment.
///
/// Blank values count as missing.
pub fn get_api_key(provided: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = provided.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    match std::env::var(env_var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(Error::InvalidApiKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provided_key_wins() {
        assert_eq!(
            get_api_key(Some("abc"), "SAGE_TEST_UNSET_KEY").unwrap(),
            "abc"
        );
    }

    #[test]
    fn test_blank_key_is_missing() {
        assert!(matches!(
            get_api_key(Some("  "), "SAGE_TEST_UNSET_KEY"),
            Err(Error::InvalidApiKey)
        ));
    }
}
