//! Chat session context shared by the TUI and line front ends

use anyhow::Context;
use sage_agent::{AgentEvent, Controller, DisplayEntry, Session, SessionStats};
use sage_ai::{Message, Transcriber};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

/// How a submitted input ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnReport {
    /// The agent answered
    Answered(String),
    /// The turn failed; history is unchanged and an error entry was shown
    Failed(String),
    /// Nothing to submit (blank text or silent audio)
    Skipped,
}

/// Owns the session and runs one turn at a time.
///
/// A submission borrows the surface mutably until the turn returns, so no
/// second submission can start meanwhile.
pub struct ChatSurface {
    controller: Arc<Controller>,
    session: Session,
    transcriber: Option<Arc<dyn Transcriber>>,
}

impl ChatSurface {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self {
            controller,
            session: Session::new(),
            transcriber: None,
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.controller.subscribe()
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn entries(&self) -> &[DisplayEntry] {
        self.session.display()
    }

    pub fn history(&self) -> &[Message] {
        self.session.snapshot()
    }

    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    pub fn can_transcribe(&self) -> bool {
        self.transcriber.is_some()
    }

    /// Forget the conversation; the next turn starts fresh
    pub fn clear(&mut self) {
        self.session.clear();
        tracing::debug!("session cleared");
    }

    /// Submit typed text as the next user turn
    pub async fn submit_text(&mut self, input: &str) -> TurnReport {
        let input = input.trim();
        if input.is_empty() {
            return TurnReport::Skipped;
        }
        self.run_turn(input.to_string()).await
    }

    /// Transcribe audio and submit the transcript.
    ///
    /// A blank transcript or a failed transcription skips the turn.
    pub async fn submit_audio(&mut self, audio: &[u8], file_name: &str) -> TurnReport {
        let Some(transcriber) = self.transcriber.clone() else {
            tracing::warn!("voice input without a transcriber");
            return TurnReport::Skipped;
        };

        match transcriber.transcribe(audio, file_name).await {
            Ok(text) => {
                tracing::debug!(chars = text.len(), "transcribed audio");
                self.submit_text(&text).await
            }
            Err(e) => {
                tracing::warn!(error = %e, file = file_name, "transcription failed");
                TurnReport::Skipped
            }
        }
    }

    /// Read an audio file and submit it as voice input
    pub async fn submit_voice_file(&mut self, path: &Path) -> anyhow::Result<TurnReport> {
        let audio = tokio::fs::read(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());
        Ok(self.submit_audio(&audio, &file_name).await)
    }

    async fn run_turn(&mut self, input: String) -> TurnReport {
        let result = self
            .controller
            .run_turn(self.session.snapshot(), Message::user(input.clone()))
            .await;

        match result {
            Ok(outcome) => {
                let answer = outcome.answer_text();
                tracing::debug!(steps = outcome.steps, tools = outcome.tool_results(), "turn finished");
                self.session.commit_turn(input, outcome);
                TurnReport::Answered(answer)
            }
            Err(e) => {
                tracing::warn!(error = %e, "turn failed");
                let reason = e.to_string();
                self.session.record_failure(input, &reason);
                TurnReport::Failed(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use sage_agent::{
        ControllerConfig, Reasoner, ReasonerRequest, Tool, ToolRegistry, ToolResult, query_schema,
    };
    use sage_ai::Content;
    use std::collections::VecDeque;

    /// Replays canned assistant messages and records the history it was given
    struct ScriptedReasoner {
        replies: Mutex<VecDeque<sage_ai::Result<Message>>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedReasoner {
        fn new(replies: Vec<sage_ai::Result<Message>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Reasoner for ScriptedReasoner {
        async fn reason(&self, request: ReasonerRequest<'_>) -> sage_ai::Result<Message> {
            self.seen.lock().push(request.history.to_vec());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(Message::assistant("out of script")))
        }
    }

    struct Encyclopedia;

    #[async_trait]
    impl Tool for Encyclopedia {
        fn name(&self) -> &str {
            "wikipedia"
        }
        fn description(&self) -> &str {
            "Encyclopedia"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            query_schema("Search query")
        }
        async fn execute(&self, _arguments: serde_json::Value) -> ToolResult {
            ToolResult::text("Page: Paris\nSummary: Paris is the capital and largest city of France.")
        }
    }

    struct FixedTranscriber(&'static str);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _audio: &[u8], _file_name: &str) -> sage_ai::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn surface(reasoner: Arc<ScriptedReasoner>) -> ChatSurface {
        let tools = ToolRegistry::from_tools([Arc::new(Encyclopedia) as sage_agent::BoxedTool]).unwrap();
        let controller = Controller::new(ControllerConfig::default(), reasoner, Arc::new(tools));
        ChatSurface::new(Arc::new(controller))
    }

    fn wiki_call(id: &str, query: &str) -> Message {
        Message::assistant_with_content(vec![Content::tool_call(
            id,
            "wikipedia",
            serde_json::json!({"query": query}),
        )])
    }

    #[tokio::test]
    async fn test_capital_of_france_uses_one_tool_round() {
        let reasoner = ScriptedReasoner::new(vec![
            Ok(wiki_call("c1", "capital of France")),
            Ok(Message::assistant("The capital of France is Paris.")),
        ]);
        let mut chat = surface(reasoner.clone());

        let report = chat.submit_text("What is the capital of France?").await;

        assert_eq!(report, TurnReport::Answered("The capital of France is Paris.".into()));
        let history = chat.history();
        assert_eq!(history.len(), 4);
        assert!(history[2].text().contains("Paris"));
        assert_eq!(chat.stats().tool_calls, 1);
        assert_eq!(reasoner.seen.lock().len(), 2);
        assert_eq!(
            chat.entries(),
            &[
                DisplayEntry::user("What is the capital of France?"),
                DisplayEntry::assistant("The capital of France is Paris."),
            ]
        );
    }

    #[tokio::test]
    async fn test_history_grows_by_append_only() {
        let reasoner = ScriptedReasoner::new(vec![
            Ok(Message::assistant("first")),
            Ok(Message::assistant("second")),
        ]);
        let mut chat = surface(reasoner.clone());

        chat.submit_text("one").await;
        let after_first = chat.history().to_vec();
        chat.submit_text("two").await;

        assert_eq!(&chat.history()[..after_first.len()], after_first.as_slice());
        // The second request saw the first turn plus the new question
        let seen = reasoner.seen.lock();
        assert_eq!(&seen[1][..after_first.len()], after_first.as_slice());
        assert_eq!(seen[1].last().map(Message::text).as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_failure_keeps_history_and_shows_error() {
        let reasoner = ScriptedReasoner::new(vec![
            Ok(Message::assistant("fine")),
            Err(sage_ai::Error::Api { status: 503, message: "service unavailable".into() }),
        ]);
        let mut chat = surface(reasoner);

        chat.submit_text("one").await;
        let before = chat.history().to_vec();
        let report = chat.submit_text("two").await;

        assert!(matches!(report, TurnReport::Failed(ref r) if r.contains("service unavailable")));
        assert_eq!(chat.history(), before.as_slice());
        let shown = chat.entries();
        assert_eq!(shown.len(), 4);
        assert_eq!(shown[2], DisplayEntry::user("two"));
        assert!(shown[3].is_error);
        assert!(shown[3].text.starts_with("Sorry, I encountered an error: "));
    }

    #[tokio::test]
    async fn test_clear_starts_fresh_session() {
        let reasoner = ScriptedReasoner::new(vec![
            Ok(Message::assistant("a")),
            Ok(Message::assistant("b")),
        ]);
        let mut chat = surface(reasoner.clone());

        chat.submit_text("one").await;
        chat.clear();
        assert!(chat.history().is_empty());
        assert!(chat.entries().is_empty());

        chat.submit_text("two").await;
        assert_eq!(reasoner.seen.lock()[1].len(), 1);
    }

    #[tokio::test]
    async fn test_blank_input_and_silent_audio_are_skipped() {
        let reasoner = ScriptedReasoner::new(vec![Ok(Message::assistant("heard you"))]);
        let mut chat = surface(reasoner.clone()).with_transcriber(Arc::new(FixedTranscriber("  ")));

        assert_eq!(chat.submit_text("   ").await, TurnReport::Skipped);
        assert_eq!(chat.submit_audio(b"RIFF", "note.wav").await, TurnReport::Skipped);
        assert!(chat.entries().is_empty());
        assert!(reasoner.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_voice_file_is_an_error() {
        let reasoner = ScriptedReasoner::new(vec![]);
        let mut chat = surface(reasoner).with_transcriber(Arc::new(FixedTranscriber("hi")));
        let err = chat
            .submit_voice_file(Path::new("/nonexistent/sage/clip.wav"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("clip.wav"));
        assert!(chat.entries().is_empty());
    }

    #[tokio::test]
    async fn test_audio_transcript_becomes_user_turn() {
        let reasoner = ScriptedReasoner::new(vec![Ok(Message::assistant("heard you"))]);
        let mut chat = surface(reasoner).with_transcriber(Arc::new(FixedTranscriber(" hello there ")));

        let report = chat.submit_audio(b"RIFF", "note.wav").await;

        assert_eq!(report, TurnReport::Answered("heard you".into()));
        assert_eq!(chat.entries()[0], DisplayEntry::user("hello there"));
    }
}
