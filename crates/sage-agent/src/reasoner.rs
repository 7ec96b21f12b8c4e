//! Reasoner abstraction: one model call per controller step

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sage_ai::{ChatOptions, ChatProvider, Context, Message, Model, Result};

/// Everything the reasoner sees for one step
#[derive(Debug, Clone, Copy)]
pub struct ReasonerRequest<'a> {
    pub system_prompt: Option<&'a str>,
    pub history: &'a [Message],
    pub tools: &'a [sage_ai::Tool],
}

/// Produces exactly one assistant message from the running history
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn reason(&self, request: ReasonerRequest<'_>) -> Result<Message>;
}

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculate delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Reasoner backed by a chat-completions provider
pub struct ProviderReasoner {
    provider: Arc<dyn ChatProvider>,
    model: Model,
    options: ChatOptions,
    retry: RetryConfig,
}

impl ProviderReasoner {
    pub fn new(provider: Arc<dyn ChatProvider>, model: Model) -> Self {
        Self {
            provider,
            model,
            options: ChatOptions::default(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Set retry configuration
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
}

#[async_trait]
impl Reasoner for ProviderReasoner {
    async fn reason(&self, request: ReasonerRequest<'_>) -> Result<Message> {
        let context = Context {
            system_prompt: request.system_prompt.map(str::to_string),
            messages: request.history.to_vec(),
            tools: request.tools.to_vec(),
        };

        let mut attempt = 0u32;
        loop {
            match self.provider.complete(&self.model, &context, &self.options).await {
                Ok(message) => return Ok(message),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = match &e {
                        sage_ai::Error::RateLimited {
                            retry_after: Some(secs),
                        } => Duration::from_secs(*secs).min(self.retry.max_delay),
                        _ => self.retry.delay_for_attempt(attempt),
                    };
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt + 1,
                        self.retry.max_retries + 1,
                        e,
                        delay
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use sage_ai::{MessageEvent, MessageEventStream, Provider, StopReason, Usage};

    /// Fails with the queued errors, then answers.
    struct FlakyProvider {
        failures: Mutex<Vec<sage_ai::Error>>,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl ChatProvider for FlakyProvider {
        async fn stream(
            &self,
            _model: &Model,
            _context: &Context,
            _options: &ChatOptions,
        ) -> Result<MessageEventStream> {
            *self.calls.lock() += 1;
            if let Some(e) = self.failures.lock().pop() {
                return Err(e);
            }
            Ok(Box::pin(futures::stream::iter(vec![
                MessageEvent::TextDelta {
                    delta: "ok".into(),
                },
                MessageEvent::Done {
                    stop_reason: StopReason::Stop,
                    usage: Usage::default(),
                },
            ])))
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }

    fn reasoner(failures: Vec<sage_ai::Error>) -> (Arc<FlakyProvider>, ProviderReasoner) {
        let provider = Arc::new(FlakyProvider {
            failures: Mutex::new(failures),
            calls: Mutex::new(0),
        });
        let model = sage_ai::models::resolve_model(Provider::Groq, "test", None);
        let r = ProviderReasoner::new(provider.clone(), model).with_retry_config(fast_retry());
        (provider, r)
    }

    fn request() -> ReasonerRequest<'static> {
        ReasonerRequest {
            system_prompt: None,
            history: &[],
            tools: &[],
        }
    }

    #[test]
    fn test_delay_for_attempt_backs_off_and_caps() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(cfg.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(cfg.delay_for_attempt(10), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let (provider, r) = reasoner(vec![
            sage_ai::Error::Sse("reset".into()),
            sage_ai::Error::RateLimited { retry_after: None },
        ]);
        let msg = r.reason(request()).await.unwrap();
        assert_eq!(msg.text(), "ok");
        assert_eq!(*provider.calls.lock(), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_auth_errors() {
        let (provider, r) = reasoner(vec![sage_ai::Error::InvalidApiKey]);
        assert!(matches!(
            r.reason(request()).await,
            Err(sage_ai::Error::InvalidApiKey)
        ));
        assert_eq!(*provider.calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (provider, r) = reasoner(vec![
            sage_ai::Error::Sse("a".into()),
            sage_ai::Error::Sse("b".into()),
            sage_ai::Error::Sse("c".into()),
        ]);
        assert!(r.reason(request()).await.is_err());
        assert_eq!(*provider.calls.lock(), 3);
    }

    #[tokio::test]
    async fn test_assembled_message_records_model() {
        let (_, r) = reasoner(vec![]);
        let msg = r.reason(request()).await.unwrap();
        match msg {
            Message::Assistant { metadata, .. } => {
                assert_eq!(metadata.model.as_deref(), Some("test"));
                assert_eq!(metadata.provider, Some(Provider::Groq));
            }
            other => panic!("expected assistant message, got {:?}", other),
        }
    }
}
