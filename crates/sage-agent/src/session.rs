//! In-memory session: conversation history plus what the user has been shown.

use sage_ai::{Message, Usage};
use serde::{Deserialize, Serialize};

use crate::controller::TurnOutcome;

/// Prefix shown when a turn fails
pub const ERROR_PREFIX: &str = "Sorry, I encountered an error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayRole {
    User,
    Assistant,
}

/// One rendered chat bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEntry {
    pub role: DisplayRole,
    pub text: String,
    #[serde(default)]
    pub is_error: bool,
}

impl DisplayEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: DisplayRole::User,
            text: text.into(),
            is_error: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: DisplayRole::Assistant,
            text: text.into(),
            is_error: false,
        }
    }

    /// Apology entry for a failed turn
    pub fn error(reason: impl std::fmt::Display) -> Self {
        Self {
            role: DisplayRole::Assistant,
            text: format!("{}{}", ERROR_PREFIX, reason),
            is_error: true,
        }
    }
}

/// Counters reported by `/stats`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub turns: u32,
    pub failed_turns: u32,
    pub messages: usize,
    pub tool_calls: usize,
    pub usage: Usage,
}

/// Conversation history and display log for one process lifetime.
///
/// History only ever grows by whole turns, and shrinks only through
/// [`Session::clear`].
#[derive(Debug, Default)]
pub struct Session {
    history: Vec<Message>,
    display: Vec<DisplayEntry>,
    usage: Usage,
    turns: u32,
    failed_turns: u32,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered view of the conversation history
    pub fn snapshot(&self) -> &[Message] {
        &self.history
    }

    pub fn display(&self) -> &[DisplayEntry] {
        &self.display
    }

    /// Append messages to the history
    pub fn append(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.history.extend(messages);
    }

    /// Record a successful turn: its messages join the history and the user
    /// input and answer join the display log.
    pub fn commit_turn(&mut self, shown_input: impl Into<String>, outcome: TurnOutcome) {
        let answer = outcome.answer_text();
        self.append(outcome.messages);
        self.display.push(DisplayEntry::user(shown_input));
        self.display.push(DisplayEntry::assistant(answer));
        self.usage.add(&outcome.usage);
        self.turns += 1;
    }

    /// Record a failed turn. The history is left untouched.
    pub fn record_failure(&mut self, shown_input: impl Into<String>, reason: impl std::fmt::Display) {
        self.display.push(DisplayEntry::user(shown_input));
        self.display.push(DisplayEntry::error(reason));
        self.failed_turns += 1;
    }

    /// Forget everything
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.display.is_empty()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            turns: self.turns,
            failed_turns: self.failed_turns,
            messages: self.history.len(),
            tool_calls: self.history.iter().map(|m| m.tool_calls().len()).sum(),
            usage: self.usage.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_ai::Content;

    fn outcome(question: &str, answer: &str) -> TurnOutcome {
        let answer_msg = Message::assistant(answer);
        TurnOutcome {
            messages: vec![
                Message::user(question),
                Message::assistant_with_content(vec![Content::tool_call(
                    "c1",
                    "wikipedia",
                    serde_json::json!({"query": question}),
                )]),
                Message::tool_result("c1", "wikipedia", vec![Content::text("snippet")], false),
                answer_msg.clone(),
            ],
            answer: answer_msg,
            steps: 2,
            usage: Usage { input: 7, output: 2 },
        }
    }

    #[test]
    fn test_commit_turn_appends_history_and_display() {
        let mut s = Session::new();
        s.commit_turn("q1", outcome("q1", "a1"));
        assert_eq!(s.snapshot().len(), 4);
        assert_eq!(
            s.display(),
            &[DisplayEntry::user("q1"), DisplayEntry::assistant("a1")]
        );

        let before = s.snapshot().to_vec();
        s.commit_turn("q2", outcome("q2", "a2"));
        assert_eq!(&s.snapshot()[..before.len()], before.as_slice());
        assert_eq!(s.stats().turns, 2);
        assert_eq!(s.stats().tool_calls, 2);
        assert_eq!(s.stats().usage, Usage { input: 14, output: 4 });
    }

    #[test]
    fn test_failure_leaves_history_unchanged() {
        let mut s = Session::new();
        s.commit_turn("q1", outcome("q1", "a1"));
        let before = s.snapshot().to_vec();

        s.record_failure("q2", "API error (500): boom");

        assert_eq!(s.snapshot(), before.as_slice());
        let last = s.display().last().unwrap();
        assert!(last.is_error);
        assert_eq!(
            last.text,
            "Sorry, I encountered an error: API error (500): boom"
        );
        assert_eq!(s.stats().failed_turns, 1);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut s = Session::new();
        s.commit_turn("q1", outcome("q1", "a1"));
        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.stats(), SessionStats::default());
    }
}
