//! Animated status spinner

use crate::theme::Theme;
use ratatui::{buffer::Buffer, layout::Rect, text::Span, widgets::Widget};
use std::time::{Duration, Instant};

/// Spinner animation frames
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const FRAME_DURATION: Duration = Duration::from_millis(80);

/// Frame to show after `elapsed`
pub fn frame_at(elapsed: Duration) -> &'static str {
    let index = (elapsed.as_millis() / FRAME_DURATION.as_millis()) as usize;
    SPINNER_FRAMES[index % SPINNER_FRAMES.len()]
}

/// Spinner followed by a status label and the elapsed seconds
pub struct Spinner<'a> {
    label: &'a str,
    theme: &'a Theme,
    started: Instant,
}

impl<'a> Spinner<'a> {
    pub fn new(label: &'a str, theme: &'a Theme, started: Instant) -> Self {
        Self {
            label,
            theme,
            started,
        }
    }
}

impl Widget for Spinner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 3 || area.height == 0 {
            return;
        }
        let elapsed = self.started.elapsed();
        let text = format!(
            "{} {} ({}s)",
            frame_at(elapsed),
            self.label,
            elapsed.as_secs()
        );
        let span = Span::styled(text, self.theme.accent_style());
        buf.set_span(area.x, area.y, &span, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_advance_and_wrap() {
        assert_eq!(frame_at(Duration::ZERO), "⠋");
        assert_eq!(frame_at(Duration::from_millis(80)), "⠙");
        assert_eq!(frame_at(Duration::from_millis(800)), "⠋");
    }

    #[test]
    fn test_render_label() {
        let area = Rect::new(0, 0, 30, 1);
        let mut buf = Buffer::empty(area);
        Spinner::new("Calling wikipedia…", &Theme::dark(), Instant::now()).render(area, &mut buf);
        let row: String = (2..20).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert!(row.starts_with("Calling wikipedia"));
    }
}
