//! Side panel listing the agent's tools

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// One tool as shown in the panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

impl ToolInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Tool list with the currently running tool highlighted, plus footer lines
/// (model name, key hints).
pub struct ToolPanel<'a> {
    tools: &'a [ToolInfo],
    active: Option<&'a str>,
    footer: &'a [String],
    theme: &'a Theme,
}

impl<'a> ToolPanel<'a> {
    pub fn new(tools: &'a [ToolInfo], theme: &'a Theme) -> Self {
        Self {
            tools,
            active: None,
            footer: &[],
            theme,
        }
    }

    pub fn active(mut self, name: Option<&'a str>) -> Self {
        self.active = name;
        self
    }

    pub fn footer(mut self, lines: &'a [String]) -> Self {
        self.footer = lines;
        self
    }
}

impl Widget for ToolPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::LEFT)
            .border_style(self.theme.border_style())
            .title(Span::styled(" Tools ", self.theme.accent_bold()));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width < 4 || inner.height == 0 {
            return;
        }

        let width = inner.width as usize - 1;
        let mut lines: Vec<Line> = Vec::new();
        for tool in self.tools {
            let running = self.active == Some(tool.name.as_str());
            let (marker, style) = if running {
                ("● ", self.theme.active_tool_style())
            } else {
                ("• ", self.theme.accent_style())
            };
            lines.push(Line::from(Span::styled(
                format!(" {}{}", marker, tool.name),
                style,
            )));
            for part in textwrap::wrap(&tool.description, width.saturating_sub(3).max(1)) {
                lines.push(Line::from(Span::styled(
                    format!("   {}", part),
                    self.theme.dim_style(),
                )));
            }
            lines.push(Line::default());
        }

        let footer_height = self.footer.len() as u16;
        let body = Rect {
            height: inner.height.saturating_sub(footer_height),
            ..inner
        };
        Paragraph::new(lines).render(body, buf);

        if footer_height > 0 && inner.height > footer_height {
            let footer_area = Rect {
                y: inner.y + inner.height - footer_height,
                height: footer_height,
                ..inner
            };
            let footer: Vec<Line> = self
                .footer
                .iter()
                .map(|l| Line::from(Span::styled(format!(" {}", l), self.theme.dim_style())))
                .collect();
            Paragraph::new(footer).render(footer_area, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(buf: &Buffer) -> String {
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_lists_tools_and_marks_active() {
        let tools = vec![
            ToolInfo::new("wikipedia", "Encyclopedia lookup"),
            ToolInfo::new("arxiv", "Paper search"),
        ];
        let area = Rect::new(0, 0, 30, 10);
        let mut buf = Buffer::empty(area);
        ToolPanel::new(&tools, &Theme::dark())
            .active(Some("arxiv"))
            .render(area, &mut buf);
        let out = text(&buf);
        assert!(out.contains("• wikipedia"));
        assert!(out.contains("● arxiv"));
        assert!(out.contains("Paper search"));
    }

    #[test]
    fn test_footer_sits_at_bottom() {
        let footer = vec!["model: gpt-oss".to_string()];
        let area = Rect::new(0, 0, 30, 5);
        let mut buf = Buffer::empty(area);
        ToolPanel::new(&[], &Theme::dark())
            .footer(&footer)
            .render(area, &mut buf);
        let last_row: String = (0..30).map(|x| buf[(x, 4)].symbol().to_string()).collect();
        assert!(last_row.contains("model: gpt-oss"));
    }
}
