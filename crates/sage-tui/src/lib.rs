//! sage-tui: terminal widgets for the sage chat surface
//!
//! Built on ratatui and crossterm. The crate knows nothing about agents; the
//! binary maps its session state onto these widgets.

pub mod input;
pub mod theme;
pub mod widgets;

pub use input::{Action, event_to_action};
pub use theme::Theme;
