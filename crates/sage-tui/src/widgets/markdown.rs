//! Markdown to wrapped, styled terminal lines

use crate::theme::Theme;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Styled text waiting to be wrapped into lines
#[derive(Default)]
struct Pending {
    segments: Vec<(String, Style)>,
}

impl Pending {
    fn push(&mut self, text: impl Into<String>, style: Style) {
        let text = text.into();
        if !text.is_empty() {
            self.segments.push((text, style));
        }
    }

    fn is_empty(&self) -> bool {
        self.segments.iter().all(|(t, _)| t.trim().is_empty())
    }
}

struct Renderer<'t> {
    theme: &'t Theme,
    width: usize,
    lines: Vec<Line<'static>>,
    pending: Pending,
    styles: Vec<Style>,
    /// Stack of list counters; `None` for bullet lists
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    code_block: Option<String>,
    link_url: Option<String>,
    /// Prefix for the first wrapped line of the pending text
    first_prefix: String,
}

impl<'t> Renderer<'t> {
    fn new(theme: &'t Theme, width: usize) -> Self {
        Self {
            theme,
            width: width.max(8),
            lines: Vec::new(),
            pending: Pending::default(),
            styles: vec![theme.base_style()],
            lists: Vec::new(),
            quote_depth: 0,
            code_block: None,
            link_url: None,
            first_prefix: String::new(),
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, f: impl FnOnce(Style) -> Style) {
        let next = f(self.style());
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    /// Indentation for continuation lines
    fn rest_prefix(&self) -> String {
        let mut prefix = "│ ".repeat(self.quote_depth);
        prefix.push_str(&"  ".repeat(self.lists.len()));
        prefix
    }

    fn blank_line(&mut self) {
        if self.lines.last().is_some_and(|l| l.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            self.pending = Pending::default();
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        let first = std::mem::take(&mut self.first_prefix);
        let rest = self.rest_prefix();
        let first = if first.is_empty() { rest.clone() } else { first };
        let wrapped = wrap_segments(
            &pending.segments,
            self.width,
            &first,
            &rest,
            self.theme.dim_style(),
        );
        self.lines.extend(wrapped);
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                self.blank_line();
                let mut heading = self.theme.accent_bold();
                if level == HeadingLevel::H1 {
                    heading = heading.add_modifier(Modifier::UNDERLINED);
                }
                self.styles.push(heading);
            }
            Tag::Paragraph => self.flush(),
            Tag::BlockQuote(_) => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.code_block = Some(String::new());
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{}. ", n);
                        *n += 1;
                        m
                    }
                    _ => "• ".to_string(),
                };
                let mut prefix = "│ ".repeat(self.quote_depth);
                prefix.push_str(&"  ".repeat(depth));
                prefix.push_str(&marker);
                self.first_prefix = prefix;
            }
            Tag::Emphasis => self.push_style(|s| s.add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(|s| s.add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self.push_style(|s| s.add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { dest_url, .. } => {
                self.link_url = Some(dest_url.to_string());
                let link = self.theme.link;
                self.push_style(|s| s.fg(link).add_modifier(Modifier::UNDERLINED));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.flush();
                self.pop_style();
                self.blank_line();
            }
            TagEnd::Paragraph => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                let code = self.code_block.take().unwrap_or_default();
                let style = self.theme.code_style();
                let max = self.width.saturating_sub(2);
                for line in code.lines() {
                    lines_truncated(&mut self.lines, line, max, style);
                }
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.link_url.take() {
                    let shown = self
                        .pending
                        .segments
                        .last()
                        .is_some_and(|(t, _)| t.as_str() == url);
                    if !shown && !url.is_empty() {
                        self.pending.push(format!(" ({})", url), self.theme.dim_style());
                    }
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }
}

fn lines_truncated(lines: &mut Vec<Line<'static>>, text: &str, max: usize, style: Style) {
    let mut shown = String::from("  ");
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max {
            shown.pop();
            shown.push('…');
            break;
        }
        shown.push(c);
        used += w;
    }
    lines.push(Line::from(Span::styled(shown, style)));
}

/// Greedy word wrap over styled segments.
fn wrap_segments(
    segments: &[(String, Style)],
    width: usize,
    first_prefix: &str,
    rest_prefix: &str,
    prefix_style: Style,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut line = vec![Span::styled(first_prefix.to_string(), prefix_style)];
    let mut used = first_prefix.width();
    let mut empty = true;

    for (text, style) in segments {
        for word in text.split_inclusive(char::is_whitespace) {
            let mut word = if empty { word.trim_start() } else { word };
            if word.is_empty() {
                continue;
            }
            if !empty && used + word.trim_end().width() > width {
                lines.push(Line::from(std::mem::take(&mut line)));
                line.push(Span::styled(rest_prefix.to_string(), prefix_style));
                used = rest_prefix.width();
                empty = true;
                word = word.trim_start();
                if word.is_empty() {
                    continue;
                }
            }

            if used + word.trim_end().width() > width {
                // Longer than a whole line: hard split
                let mut chunk = String::new();
                for c in word.trim_end().chars() {
                    let w = c.width().unwrap_or(0);
                    if used + w > width && !chunk.is_empty() {
                        line.push(Span::styled(std::mem::take(&mut chunk), *style));
                        lines.push(Line::from(std::mem::take(&mut line)));
                        line.push(Span::styled(rest_prefix.to_string(), prefix_style));
                        used = rest_prefix.width();
                    }
                    chunk.push(c);
                    used += w;
                }
                line.push(Span::styled(chunk, *style));
            } else {
                let piece = if used + word.width() > width {
                    word.trim_end()
                } else {
                    word
                };
                used += piece.width();
                line.push(Span::styled(piece.to_string(), *style));
            }
            empty = false;
        }
    }

    if !empty {
        lines.push(Line::from(line));
    }
    lines
}

/// Convert markdown text to styled lines no wider than `width`
pub fn render_markdown(text: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut r = Renderer::new(theme, width);

    for event in Parser::new(text) {
        match event {
            Event::Start(tag) => r.start(tag),
            Event::End(tag) => r.end(tag),
            Event::Text(text) => {
                if let Some(code) = r.code_block.as_mut() {
                    code.push_str(&text);
                } else {
                    let style = r.style();
                    r.pending.push(text.to_string(), style);
                }
            }
            Event::Code(code) => {
                let style = theme.code_style().add_modifier(Modifier::BOLD);
                r.pending.push(code.to_string(), style);
            }
            Event::SoftBreak => {
                let style = r.style();
                r.pending.push(" ", style);
            }
            Event::HardBreak => r.flush(),
            Event::Rule => {
                r.flush();
                r.lines.push(Line::from(Span::styled(
                    "─".repeat(r.width.min(40)),
                    theme.dim_style(),
                )));
            }
            _ => {}
        }
    }

    r.finish()
}
