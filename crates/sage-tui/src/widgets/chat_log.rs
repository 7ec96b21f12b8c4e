//! Scrollable chat transcript

use crate::theme::Theme;
use crate::widgets::markdown::render_markdown;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    User,
    Assistant,
    /// Local output such as command results; never part of the conversation
    Notice,
}

/// A rendered chat bubble
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: EntryRole,
    pub text: String,
    pub is_error: bool,
}

impl ChatEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: EntryRole::User,
            text: text.into(),
            is_error: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: EntryRole::Assistant,
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            role: EntryRole::Assistant,
            text: text.into(),
            is_error: true,
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            role: EntryRole::Notice,
            text: text.into(),
            is_error: false,
        }
    }
}

/// Lay out every entry as lines for the given width.
///
/// Assistant answers are markdown; user input, notices and errors are plain text.
pub fn layout_entries(entries: &[ChatEntry], theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let content_width = width.saturating_sub(2).max(1);
    let mut lines = Vec::new();

    for entry in entries {
        if entry.role == EntryRole::Notice {
            for line in textwrap::wrap(&entry.text, content_width) {
                lines.push(Line::from(Span::styled(format!("  {}", line), theme.dim_style())));
            }
            lines.push(Line::default());
            continue;
        }

        let header = match entry.role {
            EntryRole::User => Span::styled("▶ You", theme.accent_bold()),
            EntryRole::Assistant if entry.is_error => Span::styled("◀ Assistant", theme.error_style()),
            _ => Span::styled("◀ Assistant", theme.assistant_bold()),
        };
        lines.push(Line::from(header));

        if entry.role == EntryRole::Assistant && !entry.is_error {
            for line in render_markdown(&entry.text, theme, content_width) {
                let mut spans = vec![Span::raw("  ")];
                spans.extend(line.spans);
                lines.push(Line::from(spans));
            }
        } else {
            let style = if entry.is_error {
                theme.error_style()
            } else {
                theme.base_style()
            };
            for line in textwrap::wrap(&entry.text, content_width) {
                lines.push(Line::from(Span::styled(format!("  {}", line), style)));
            }
        }
        lines.push(Line::default());
    }
    lines
}

/// Scroll position measured in lines from the bottom, so new entries stay in
/// view unless the user has scrolled back.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChatScroll {
    from_bottom: usize,
}

impl ChatScroll {
    pub fn up(&mut self, lines: usize) {
        self.from_bottom = self.from_bottom.saturating_add(lines);
    }

    pub fn down(&mut self, lines: usize) {
        self.from_bottom = self.from_bottom.saturating_sub(lines);
    }

    pub fn to_bottom(&mut self) {
        self.from_bottom = 0;
    }

    pub fn is_at_bottom(&self) -> bool {
        self.from_bottom == 0
    }

    /// First visible line, clamping the offset into range
    pub fn top_line(&mut self, total: usize, viewport: usize) -> usize {
        let max_top = total.saturating_sub(viewport);
        self.from_bottom = self.from_bottom.min(max_top);
        max_top - self.from_bottom
    }
}

/// Chat transcript widget that follows the newest entry
pub struct ChatLog<'a> {
    entries: &'a [ChatEntry],
    theme: &'a Theme,
    empty_hint: Option<&'a str>,
}

impl<'a> ChatLog<'a> {
    pub fn new(entries: &'a [ChatEntry], theme: &'a Theme) -> Self {
        Self {
            entries,
            theme,
            empty_hint: None,
        }
    }

    /// Text shown when there are no entries
    pub fn empty_hint(mut self, hint: &'a str) -> Self {
        self.empty_hint = Some(hint);
        self
    }
}

impl StatefulWidget for ChatLog<'_> {
    type State = ChatScroll;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut ChatScroll) {
        if area.width < 2 || area.height == 0 {
            return;
        }

        if self.entries.is_empty() {
            if let Some(hint) = self.empty_hint {
                Paragraph::new(Span::styled(hint.to_string(), self.theme.dim_style()))
                    .render(area, buf);
            }
            return;
        }

        // Reserve the rightmost column for the scrollbar
        let text_area = Rect {
            width: area.width - 1,
            ..area
        };
        let lines = layout_entries(self.entries, self.theme, text_area.width as usize);
        let total = lines.len();
        let viewport = area.height as usize;
        let top = state.top_line(total, viewport);

        let visible: Vec<Line> = lines.into_iter().skip(top).take(viewport).collect();
        Paragraph::new(visible).render(text_area, buf);

        if total > viewport {
            let mut bar = ScrollbarState::new(total.saturating_sub(viewport)).position(top);
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None)
                .render(area, buf, &mut bar);
        }
    }
}
