//! sage-agent: tool routing and conversation state
//!
//! The controller alternates between a reasoner and a tool registry until
//! the reasoner produces an answer; the session accumulates history across
//! turns.

pub mod controller;
pub mod error;
pub mod events;
pub mod reasoner;
pub mod session;
pub mod tool;

pub use controller::{AgentTurn, Controller, ControllerConfig, DEFAULT_MAX_STEPS, TurnOutcome};
pub use error::{Error, Result};
pub use events::AgentEvent;
pub use reasoner::{ProviderReasoner, Reasoner, ReasonerRequest, RetryConfig};
pub use session::{DisplayEntry, DisplayRole, Session, SessionStats};
pub use tool::{BoxedTool, Tool, ToolRegistry, ToolResult, query_schema};
