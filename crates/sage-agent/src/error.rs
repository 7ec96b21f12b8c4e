//! Error types for sage-agent

use thiserror::Error;

/// Result type alias using sage-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a conversation turn
#[derive(Error, Debug)]
pub enum Error {
    /// A model service call failed
    #[error(transparent)]
    Ai(#[from] sage_ai::Error),

    /// The reasoner was still requesting tools on its last permitted step
    #[error("step limit exceeded: no answer after {max_steps} reasoning steps")]
    StepLimitExceeded { max_steps: u32 },

    /// Two tools were registered under one name
    #[error("a tool named '{0}' is already registered")]
    DuplicateTool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_limit_message_names_the_ceiling() {
        let e = Error::StepLimitExceeded { max_steps: 3 };
        assert!(e.to_string().contains("step limit exceeded"));
        assert!(e.to_string().contains('3'));
    }

    #[test]
    fn test_ai_errors_are_transparent() {
        let e: Error = sage_ai::Error::InvalidApiKey.into();
        assert_eq!(e.to_string(), "Invalid or missing API key");
    }

    #[test]
    fn test_turn_errors_are_exactly_the_three_kinds() {
        fn kind(e: &Error) -> &'static str {
            match e {
                Error::Ai(_) => "ai",
                Error::StepLimitExceeded { .. } => "step_limit",
                Error::DuplicateTool(_) => "duplicate_tool",
            }
        }
        assert_eq!(kind(&Error::DuplicateTool("wikipedia".into())), "duplicate_tool");
        assert_eq!(kind(&Error::StepLimitExceeded { max_steps: 1 }), "step_limit");
    }
}
