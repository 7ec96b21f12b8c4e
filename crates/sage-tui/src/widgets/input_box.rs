//! Single-line prompt input

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Span,
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Editable one-line text field.
///
/// The cursor is a character index. While locked (a turn is running) edits
/// are refused and the placeholder explains why.
#[derive(Debug, Default)]
pub struct InputBox {
    chars: Vec<char>,
    cursor: usize,
    scroll: usize,
    placeholder: String,
    busy_placeholder: String,
    title: String,
    locked: bool,
}

impl InputBox {
    pub fn new() -> Self {
        Self {
            busy_placeholder: "waiting for the answer…".to_string(),
            ..Self::default()
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn content(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
        self.scroll = 0;
    }

    /// Take the trimmed content, leaving the box empty. Blank input yields `None`.
    pub fn take(&mut self) -> Option<String> {
        let text = self.content().trim().to_string();
        self.clear();
        (!text.is_empty()).then_some(text)
    }

    /// Apply an editing action. Returns whether anything changed.
    pub fn handle_action(&mut self, action: &Action) -> bool {
        if self.locked {
            return false;
        }
        match action {
            Action::Char(c) => {
                self.insert(*c);
                true
            }
            Action::Paste(text) => {
                for c in text.chars() {
                    match c {
                        '\r' => {}
                        '\n' | '\t' => {
                            if self.cursor > 0 && self.chars.get(self.cursor - 1) != Some(&' ') {
                                self.insert(' ');
                            }
                        }
                        c => self.insert(c),
                    }
                }
                true
            }
            Action::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.chars.remove(self.cursor);
                true
            }
            Action::Delete if self.cursor < self.chars.len() => {
                self.chars.remove(self.cursor);
                true
            }
            Action::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Action::Right if self.cursor < self.chars.len() => {
                self.cursor += 1;
                true
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = self.chars.len();
                true
            }
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord if self.cursor > 0 => {
                let mut start = self.cursor;
                while start > 0 && self.chars[start - 1] == ' ' {
                    start -= 1;
                }
                while start > 0 && self.chars[start - 1] != ' ' {
                    start -= 1;
                }
                self.chars.drain(start..self.cursor);
                self.cursor = start;
                true
            }
            _ => false,
        }
    }

    fn insert(&mut self, c: char) {
        self.chars.insert(self.cursor, c);
        self.cursor += 1;
    }

    fn width_of(chars: &[char]) -> usize {
        chars.iter().map(|c| c.width().unwrap_or(0)).sum()
    }

    /// Keep the cursor inside a viewport of `visible` columns
    fn adjust_scroll(&mut self, visible: usize) {
        let cursor_col = Self::width_of(&self.chars[..self.cursor]);
        if cursor_col < self.scroll {
            self.scroll = cursor_col;
        } else if visible > 0 && cursor_col >= self.scroll + visible {
            self.scroll = cursor_col + 1 - visible;
        }
    }

    /// Render into `area`; returns the terminal cursor position when unlocked.
    pub fn render(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme) -> Option<(u16, u16)> {
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(if self.locked {
                theme.border_style()
            } else {
                theme.accent_style()
            });
        if !self.title.is_empty() {
            block = block.title(Span::styled(format!(" {} ", self.title), theme.dim_style()));
        }
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return None;
        }

        let visible = inner.width as usize;
        self.adjust_scroll(visible);

        if self.chars.is_empty() {
            let hint = if self.locked {
                &self.busy_placeholder
            } else {
                &self.placeholder
            };
            Paragraph::new(hint.as_str())
                .style(theme.dim_style())
                .render(inner, buf);
        } else {
            let mut col = 0usize;
            let mut shown = String::new();
            let mut used = 0usize;
            for c in &self.chars {
                let w = c.width().unwrap_or(0);
                if col >= self.scroll {
                    if used + w > visible {
                        break;
                    }
                    shown.push(*c);
                    used += w;
                }
                col += w;
            }
            let style = if self.locked {
                theme.dim_style()
            } else {
                theme.base_style()
            };
            Paragraph::new(shown).style(style).render(inner, buf);
        }

        if self.locked {
            return None;
        }
        let cursor_col = Self::width_of(&self.chars[..self.cursor]).saturating_sub(self.scroll);
        let x = inner.x + (cursor_col as u16).min(inner.width.saturating_sub(1));
        if let Some(cell) = buf.cell_mut((x, inner.y)) {
            cell.set_style(Style::default().bg(theme.accent));
        }
        Some((x, inner.y))
    }
}
