//! TUI implementation for sage

use crossterm::event::{Event, EventStream, MouseEventKind};
use futures::StreamExt;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use sage_agent::{AgentEvent, DisplayEntry, DisplayRole};
use sage_tui::{
    Action, Theme, event_to_action,
    widgets::{ChatEntry, ChatLog, ChatScroll, InputBox, Spinner, ToolInfo, ToolPanel},
};
use std::path::PathBuf;
use std::time::Instant;

use crate::commands::{CommandResult, execute_command};
use crate::surface::{ChatSurface, TurnReport};

const TITLE: &str = " 🤖 Agentic RAG Chatbot ";
const EMPTY_HINT: &str = "Ask questions about AI agents, research papers, or general topics!";
/// Hide the tool panel below this terminal width
const PANEL_MIN_WIDTH: u16 = 90;
const PANEL_WIDTH: u16 = 34;

/// Work queued by the input handler
enum Pending {
    Text(String),
    Voice(PathBuf),
}

fn to_chat_entry(entry: &DisplayEntry) -> ChatEntry {
    match (entry.role, entry.is_error) {
        (DisplayRole::User, _) => ChatEntry::user(entry.text.clone()),
        (DisplayRole::Assistant, true) => ChatEntry::error(entry.text.clone()),
        (DisplayRole::Assistant, false) => ChatEntry::assistant(entry.text.clone()),
    }
}

/// TUI application state
pub struct TuiState {
    /// Rendered transcript: session entries interleaved with local notices
    entries: Vec<ChatEntry>,
    /// Session display entries already mirrored into `entries`
    synced: usize,
    /// The last entry is an echo of input still being answered
    echo_pending: bool,
    input: InputBox,
    scroll: ChatScroll,
    theme: Theme,
    tools: Vec<ToolInfo>,
    active_tool: Option<String>,
    /// Spinner label while a turn runs
    status: String,
    busy_since: Option<Instant>,
    footer: Vec<String>,
}

impl TuiState {
    pub fn new(surface: &ChatSurface, theme: Theme, model_id: &str) -> Self {
        let tools = surface
            .controller()
            .tools()
            .iter()
            .map(|t| ToolInfo::new(t.name(), t.description()))
            .collect();

        let input = InputBox::new()
            .with_placeholder("Ask me anything...")
            .with_title("Enter send · Ctrl+L clear · /help");

        Self {
            entries: Vec::new(),
            synced: 0,
            echo_pending: false,
            input,
            scroll: ChatScroll::default(),
            theme,
            tools,
            active_tool: None,
            status: String::new(),
            busy_since: None,
            footer: vec![
                format!("model: {}", model_id),
                "PgUp/PgDn scroll · Ctrl+C quit".to_string(),
            ],
        }
    }

    fn is_busy(&self) -> bool {
        self.busy_since.is_some()
    }

    /// Mirror new session entries, replacing the optimistic echo
    fn sync(&mut self, surface: &ChatSurface) {
        if std::mem::take(&mut self.echo_pending) {
            self.entries.pop();
        }
        let shown = surface.entries();
        self.entries
            .extend(shown[self.synced.min(shown.len())..].iter().map(to_chat_entry));
        self.synced = shown.len();
        self.scroll.to_bottom();
    }

    fn notice(&mut self, text: impl Into<String>) {
        self.entries.push(ChatEntry::notice(text));
        self.scroll.to_bottom();
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.synced = 0;
        self.echo_pending = false;
        self.scroll.to_bottom();
    }

    fn begin_turn(&mut self, pending: &Pending) {
        match pending {
            Pending::Text(text) => {
                self.entries.push(ChatEntry::user(text.clone()));
                self.echo_pending = true;
                self.status = "Thinking…".to_string();
            }
            Pending::Voice(_) => self.status = "Transcribing…".to_string(),
        }
        self.busy_since = Some(Instant::now());
        self.input.set_locked(true);
        self.scroll.to_bottom();
    }

    fn end_turn(&mut self) {
        self.busy_since = None;
        self.active_tool = None;
        self.status.clear();
        self.input.set_locked(false);
    }

    /// Handle controller events
    pub fn handle_agent_event(&mut self, event: AgentEvent) {
        if let Some(status) = event.status_text() {
            self.status = status;
        }
        match event {
            AgentEvent::ToolExecutionStart { tool_name, .. } => {
                self.active_tool = Some(tool_name);
            }
            AgentEvent::ToolExecutionEnd { .. } | AgentEvent::ReasoningStart { .. } => {
                self.active_tool = None;
            }
            _ => {}
        }
    }

    /// Keys that work whether or not a turn is running. Returns true if handled.
    fn handle_navigation(&mut self, action: &Action, page: usize) -> bool {
        match action {
            Action::ScrollUp => self.scroll.up(1),
            Action::ScrollDown => self.scroll.down(1),
            Action::PageUp => self.scroll.up(page),
            Action::PageDown => self.scroll.down(page),
            Action::Resize => {}
            _ => return false,
        }
        true
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();
        let show_panel = size.width >= PANEL_MIN_WIDTH;

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(if show_panel {
                vec![Constraint::Min(40), Constraint::Length(PANEL_WIDTH)]
            } else {
                vec![Constraint::Min(1)]
            })
            .split(size);

        // Left column: transcript (flex), status (1), input (3)
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(columns[0]);

        self.render_transcript(frame, rows[0]);
        self.render_status(frame, rows[1]);
        if let Some((x, y)) = self.input.render(rows[2], frame.buffer_mut(), &self.theme) {
            frame.set_cursor_position((x, y));
        }

        if show_panel {
            let panel = ToolPanel::new(&self.tools, &self.theme)
                .active(self.active_tool.as_deref())
                .footer(&self.footer);
            frame.render_widget(panel, columns[1]);
        }
    }

    fn render_transcript(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(Span::styled(TITLE, self.theme.accent_bold()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let log = ChatLog::new(&self.entries, &self.theme).empty_hint(EMPTY_HINT);
        frame.render_stateful_widget(log, inner, &mut self.scroll);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        match self.busy_since {
            Some(started) => {
                frame.render_widget(Spinner::new(&self.status, &self.theme, started), area);
            }
            None if !self.scroll.is_at_bottom() => {
                let hint = Line::from(Span::styled(
                    " ↓ more below (PgDn)",
                    self.theme.dim_style(),
                ));
                frame.render_widget(Paragraph::new(hint), area);
            }
            None => {}
        }
    }
}

/// Run the TUI application
pub async fn run_tui(surface: &mut ChatSurface, theme: Theme, model_id: &str) -> anyhow::Result<()> {
    use crossterm::{
        event::{DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };
    use ratatui::{Terminal, backend::CrosstermBackend};
    use std::io;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, surface, theme, model_id).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

type Term = ratatui::Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>;

async fn event_loop(
    terminal: &mut Term,
    surface: &mut ChatSurface,
    theme: Theme,
    model_id: &str,
) -> anyhow::Result<()> {
    let mut state = TuiState::new(surface, theme, model_id);
    let mut agent_rx = surface.subscribe();
    let mut event_stream = EventStream::new();

    // Tick interval for the spinner
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(80));

    let mut pending: Option<Pending> = None;

    loop {
        if let Some(work) = pending.take() {
            state.begin_turn(&work);

            // The turn borrows the surface until this block ends
            let outcome = {
                let turn = async {
                    match work {
                        Pending::Text(text) => Ok(surface.submit_text(&text).await),
                        Pending::Voice(path) => surface.submit_voice_file(&path).await,
                    }
                };
                let mut turn = std::pin::pin!(turn);

                loop {
                    terminal.draw(|frame| state.render(frame))?;
                    let page = terminal.size()?.height.saturating_sub(6).max(1) as usize;

                    tokio::select! {
                        biased;

                        outcome = &mut turn => break Some(outcome),

                        event = agent_rx.recv() => {
                            if let Ok(agent_event) = event {
                                state.handle_agent_event(agent_event);
                            }
                        }

                        event = event_stream.next() => {
                            match event {
                                Some(Ok(Event::Mouse(mouse))) => scroll_with_mouse(&mut state, mouse.kind),
                                Some(Ok(event)) => {
                                    if let Some(action) = event_to_action(event) {
                                        if action == Action::Quit {
                                            break None;
                                        }
                                        state.handle_navigation(&action, page);
                                    }
                                }
                                Some(Err(e)) => return Err(anyhow::anyhow!("Event error: {}", e)),
                                None => return Ok(()),
                            }
                        }

                        _ = tick_interval.tick() => {}
                    }
                }
            };

            // Quit pressed mid-turn: drop the turn and leave
            let Some(outcome) = outcome else {
                return Ok(());
            };

            while let Ok(agent_event) = agent_rx.try_recv() {
                state.handle_agent_event(agent_event);
            }
            state.end_turn();
            state.sync(surface);

            match outcome {
                Ok(TurnReport::Skipped) => state.notice("Nothing was heard in that recording."),
                Ok(_) => {}
                Err(e) => state.notice(format!("Voice input failed: {:#}", e)),
            }
            continue;
        }

        terminal.draw(|frame| state.render(frame))?;
        let page = terminal.size()?.height.saturating_sub(6).max(1) as usize;

        tokio::select! {
            biased;

            // Drain late events so the receiver never lags
            event = agent_rx.recv() => {
                if let Ok(agent_event) = event {
                    state.handle_agent_event(agent_event);
                }
            }

            event = event_stream.next() => {
                let action = match event {
                    Some(Ok(Event::Mouse(mouse))) => {
                        scroll_with_mouse(&mut state, mouse.kind);
                        continue;
                    }
                    Some(Ok(event)) => match event_to_action(event) {
                        Some(action) => action,
                        None => continue,
                    },
                    Some(Err(e)) => return Err(anyhow::anyhow!("Event error: {}", e)),
                    None => return Ok(()),
                };

                if state.handle_navigation(&action, page) {
                    continue;
                }
                match action {
                    Action::Quit => return Ok(()),
                    Action::ClearHistory => {
                        surface.clear();
                        state.clear();
                    }
                    Action::Submit => {
                        let Some(text) = state.input.take() else {
                            continue;
                        };
                        match execute_command(&text, surface) {
                            None => pending = Some(Pending::Text(text)),
                            Some(CommandResult::Message(msg)) => state.notice(msg),
                            Some(CommandResult::Clear) => {
                                surface.clear();
                                state.clear();
                            }
                            Some(CommandResult::Voice(path)) => pending = Some(Pending::Voice(path)),
                            Some(CommandResult::Exit) => return Ok(()),
                            Some(CommandResult::Unknown(cmd)) => state.notice(format!(
                                "Unknown command: /{}\nType /help for available commands.",
                                cmd
                            )),
                        }
                    }
                    other => {
                        state.input.handle_action(&other);
                    }
                }
            }

            _ = tick_interval.tick() => {}
        }
    }
}

fn scroll_with_mouse(state: &mut TuiState, kind: MouseEventKind) {
    match kind {
        MouseEventKind::ScrollUp => state.scroll.up(3),
        MouseEventKind::ScrollDown => state.scroll.down(3),
        _ => {}
    }
}
