//! Widgets for the chat surface

pub mod chat_log;
pub mod input_box;
pub mod markdown;
pub mod spinner;
pub mod tool_panel;

pub use chat_log::{ChatEntry, ChatLog, ChatScroll, EntryRole};
pub use input_box::InputBox;
pub use spinner::Spinner;
pub use tool_panel::{ToolInfo, ToolPanel};
