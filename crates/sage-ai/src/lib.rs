//! sage-ai: model service clients
//!
//! OpenAI-compatible chat completions with tool calling, text embeddings and
//! speech-to-text, behind small traits so the agent can be tested offline.

pub mod embeddings;
pub mod error;
pub mod models;
pub mod providers;
pub mod stream;
pub mod transcription;
pub mod types;

pub use embeddings::{Embedder, HashEmbedder, HuggingFaceEmbedder};
pub use error::{Error, Result};
pub use providers::{ChatProvider, OpenAiCompatProvider};
pub use stream::{MessageBuilder, MessageEvent, MessageEventStream};
pub use transcription::{Transcriber, WhisperTranscriber};
pub use types::*;
