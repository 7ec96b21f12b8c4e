//! Slash commands for interactive mode

use std::path::PathBuf;

use crate::surface::ChatSurface;

/// Result of executing a slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Clear the conversation
    Clear,
    /// Transcribe this audio file and submit it
    Voice(PathBuf),
    /// Show a message to the user (not sent to agent)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command. Returns `None` for ordinary input.
pub fn execute_command(input: &str, surface: &ChatSurface) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let (command, args) = match rest.split_once(char::is_whitespace) {
        Some((c, a)) => (c.to_lowercase(), a.trim()),
        None => (rest.to_lowercase(), ""),
    };

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "clear" | "c" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        "tools" | "t" => CommandResult::Message(tools_message(surface)),

        "stats" | "s" => CommandResult::Message(stats_message(surface)),

        "voice" | "v" => voice(args, surface),

        _ => CommandResult::Unknown(command),
    })
}

fn voice(args: &str, surface: &ChatSurface) -> CommandResult {
    if !surface.can_transcribe() {
        return CommandResult::Message("Voice input is not available: set GROQ_API_KEY or voice.transcription_url to enable transcription.".into());
    }
    if args.is_empty() {
        return CommandResult::Message("Usage: /voice <audio-file>".into());
    }
    CommandResult::Voice(expand_home(args))
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

fn tools_message(surface: &ChatSurface) -> String {
    let mut out = String::from("Available tools:\n");
    for tool in surface.controller().tools().iter() {
        out.push_str(&format!("  {:<20} {}\n", tool.name(), tool.description()));
    }
    out.trim_end().to_string()
}

fn stats_message(surface: &ChatSurface) -> String {
    let stats = surface.stats();
    format!(
        "Turns: {} answered, {} failed\nHistory: {} messages, {} tool calls\nTokens: {} in, {} out\nStep limit: {}",
        stats.turns,
        stats.failed_turns,
        surface.history().len(),
        stats.tool_calls,
        stats.usage.input,
        stats.usage.output,
        surface.controller().config().max_steps
    )
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?          Show this help message
  /voice, /v <file>      Transcribe an audio file and ask it
  /tools, /t             List the tools the agent can use
  /stats, /s             Show turn and token counts
  /clear, /c             Clear conversation history
  /quit, /exit, /q       Exit sage

Examples:
  /voice ~/question.wav  Ask a recorded question
  /clear                 Start fresh conversation"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sage_agent::{Controller, ControllerConfig, Reasoner, ReasonerRequest, ToolRegistry};
    use sage_ai::Message;
    use std::sync::Arc;

    struct Silent;

    #[async_trait]
    impl Reasoner for Silent {
        async fn reason(&self, _request: ReasonerRequest<'_>) -> sage_ai::Result<Message> {
            Ok(Message::assistant("ok"))
        }
    }

    fn surface() -> ChatSurface {
        let controller = Controller::new(
            ControllerConfig::default(),
            Arc::new(Silent),
            Arc::new(ToolRegistry::new()),
        );
        ChatSurface::new(Arc::new(controller))
    }

    #[test]
    fn test_plain_input_is_not_a_command() {
        assert_eq!(execute_command("what is an agent?", &surface()), None);
    }

    #[test]
    fn test_aliases_and_case() {
        let s = surface();
        assert_eq!(execute_command("/CLEAR", &s), Some(CommandResult::Clear));
        assert_eq!(execute_command("  /q ", &s), Some(CommandResult::Exit));
        assert_eq!(
            execute_command("/frobnicate now", &s),
            Some(CommandResult::Unknown("frobnicate".into()))
        );
    }

    #[test]
    fn test_voice_requires_transcriber() {
        let result = execute_command("/voice note.wav", &surface());
        assert!(matches!(result, Some(CommandResult::Message(m)) if m.contains("not available")));
    }

    #[test]
    fn test_voice_with_transcriber_returns_path() {
        struct Deaf;

        #[async_trait]
        impl sage_ai::Transcriber for Deaf {
            async fn transcribe(&self, _audio: &[u8], _name: &str) -> sage_ai::Result<String> {
                Ok(String::new())
            }
        }

        let s = surface().with_transcriber(Arc::new(Deaf));
        assert_eq!(
            execute_command("/voice  clips/q1.wav ", &s),
            Some(CommandResult::Voice(PathBuf::from("clips/q1.wav")))
        );
        assert!(matches!(
            execute_command("/voice", &s),
            Some(CommandResult::Message(m)) if m.starts_with("Usage")
        ));
    }

    #[test]
    fn test_stats_mentions_step_limit() {
        let Some(CommandResult::Message(text)) = execute_command("/stats", &surface()) else {
            panic!("expected a message");
        };
        assert!(text.contains("Step limit: 10"));
    }
}
