use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::{debug, error, info};

use crate::app::AppState;
use crate::assembly::MapView;
use crate::controls::search::SearchInput;
use crate::error::TuiError;
use crate::map::Cursor;

use super::widgets::layer_panel::{self, PanelRow};
use super::widgets::{map_view, popup, search_box};

/// Fraction of the visible span moved per arrow key
const PAN_STEP: f64 = 0.1;

/// TUI application state
pub struct TuiApp {
    state: Arc<AppState>,
    terminal: Terminal<CrosstermBackend<Stdout>>,
    view: MapView,

    // Layout of the last frame, for mouse routing
    map_inner: Rect,
    search_area: Option<Rect>,
    panel_area: Option<Rect>,
}

impl TuiApp {
    /// Create a new TUI application
    pub fn new(state: Arc<AppState>, view: MapView) -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            state,
            terminal,
            view,
            map_inner: Rect::default(),
            search_area: None,
            panel_area: None,
        })
    }

    /// Restore terminal state
    fn restore_terminal(&mut self) -> Result<(), TuiError> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    /// Deliver a message from a search task
    pub fn on_search_message(&mut self, msg: SearchInput) {
        self.view.on_search_message(msg);
    }

    /// Draw the TUI
    pub fn draw(&mut self) -> Result<(), TuiError> {
        let view = &mut self.view;
        let mut map_inner = Rect::default();
        let mut search_area = None;
        let mut panel_area = None;

        self.terminal.draw(|frame| {
            let area = frame.area();

            // Main layout: header, map, footer
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Header
                    Constraint::Min(6),    // Map
                    Constraint::Length(3), // Footer
                ])
                .split(area);

            render_header(frame, chunks[0], view);

            map_view::render(frame, chunks[1], view.canvas_mut());
            map_inner = map_view::inner_area(chunks[1]);
            popup::render(frame, map_inner, view.canvas_mut());

            // Controls float over the map corners
            if let Some(search) = view.search() {
                let rect = search_box::area(map_inner, search);
                search_box::render(frame, rect, search);
                search_area = Some(rect);
            }

            if let Some((width, height)) = layer_panel::panel_size(view.layer_switcher(), view.active_toggle()) {
                let width = width.min(map_inner.width);
                let height = height.min(map_inner.height);
                let rect = Rect::new(map_inner.right() - width, map_inner.y, width, height);
                layer_panel::render(frame, rect, view.layer_switcher(), view.active_toggle());
                panel_area = Some(rect);
            }

            render_footer(frame, chunks[2], view);
        })?;

        self.map_inner = map_inner;
        self.search_area = search_area;
        self.panel_area = panel_area;
        Ok(())
    }

    /// Handle keyboard and mouse input (non-blocking)
    pub async fn handle_input(&mut self) -> Result<bool, TuiError> {
        // Poll for events with a short timeout
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(self.on_key(key)),
                Event::Mouse(mouse) => self.on_mouse(mouse),
                _ => {}
            }
        }

        Ok(false)
    }

    /// Returns true when quitting
    fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            info!("Quit requested");
            self.state.quit();
            return true;
        }

        if self.view.search().is_some_and(|s| s.is_focused()) {
            if key.code == KeyCode::Enter {
                self.view.search_submit();
            } else if let Some(search) = self.view.search_mut() {
                match key.code {
                    KeyCode::Char(c) => search.type_char(c),
                    KeyCode::Backspace => search.backspace(),
                    KeyCode::Up => search.highlight_prev(),
                    KeyCode::Down => search.highlight_next(),
                    KeyCode::Esc => search.outside_click(),
                    _ => {}
                }
            }
            return false;
        }

        match key.code {
            KeyCode::Char('q') => {
                info!("Quit requested");
                self.state.quit();
                return true;
            }
            KeyCode::Char('/') => {
                if let Some(search) = self.view.search_mut() {
                    search.focus();
                }
            }
            KeyCode::Char('a') => self.view.toggle_active_only(),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.view.toggle_layer(index);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.view.canvas_mut().zoom_by(1.0),
            KeyCode::Char('-') => self.view.canvas_mut().zoom_by(-1.0),
            KeyCode::Left => self.view.canvas_mut().pan(-PAN_STEP, 0.0),
            KeyCode::Right => self.view.canvas_mut().pan(PAN_STEP, 0.0),
            KeyCode::Up => self.view.canvas_mut().pan(0.0, PAN_STEP),
            KeyCode::Down => self.view.canvas_mut().pan(0.0, -PAN_STEP),
            KeyCode::Esc => {
                if let Some(search) = self.view.search_mut() {
                    search.outside_click();
                }
            }
            _ => {}
        }
        false
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        let position = Position::new(mouse.column, mouse.row);
        let on_map = self.map_inner.contains(position);
        let pixel = cell_to_pixel(self.map_inner, position);

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.on_click(position, on_map, pixel),
            MouseEventKind::Moved if on_map => {
                self.view.canvas_mut().handle_pointer_move(pixel);
            }
            MouseEventKind::ScrollUp if on_map => self.view.canvas_mut().zoom_by(1.0),
            MouseEventKind::ScrollDown if on_map => self.view.canvas_mut().zoom_by(-1.0),
            _ => {}
        }
    }

    fn on_click(&mut self, position: Position, on_map: bool, pixel: (f64, f64)) {
        if let Some(area) = self.search_area.filter(|a| a.contains(position)) {
            let hit = self
                .view
                .search()
                .and_then(|search| search_box::result_at(area, search, position));
            match hit {
                Some(index) => self.view.search_select(index),
                None => {
                    if let Some(search) = self.view.search_mut() {
                        search.focus();
                    }
                }
            }
            return;
        }

        if let Some(search) = self.view.search_mut() {
            if search.is_focused() || search.state().is_open() {
                search.outside_click();
            }
        }

        if let Some(area) = self.panel_area.filter(|a| a.contains(position)) {
            match layer_panel::row_at(area, self.view.layer_switcher(), position) {
                Some(PanelRow::Layer(index)) => {
                    self.view.toggle_layer(index);
                }
                Some(PanelRow::ActiveOnly) => self.view.toggle_active_only(),
                None => {}
            }
            return;
        }

        if on_map {
            let outcome = self.view.click(pixel);
            debug!(?outcome, "Map click");
        }
    }

    /// Run cleanup on drop
    pub fn cleanup(&mut self) {
        if let Err(e) = self.restore_terminal() {
            error!(error = %e, "Failed to restore terminal");
        }
    }
}

impl Drop for TuiApp {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Canvas pixel at the center of a terminal cell
fn cell_to_pixel(inner: Rect, position: Position) -> (f64, f64) {
    (
        (position.x as f64 - inner.x as f64) * 2.0 + 1.0,
        (position.y as f64 - inner.y as f64) * 4.0 + 2.0,
    )
}

/// Render the header bar
fn render_header(frame: &mut Frame, area: Rect, view: &MapView) {
    let features = view.store().map_or_else(
        || view.canvas().layers().iter().map(|l| l.read().len()).sum::<usize>(),
        |store| store.feature_count(),
    );

    let title = Line::from(vec![
        Span::styled(" mappr ", Style::default().bold().fg(Color::Cyan)),
        Span::raw("| "),
        Span::styled(format!("{features} on map"), Style::default().fg(Color::Green)),
        Span::raw(format!(" | zoom {:.1}", view.canvas().view().zoom())),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));

    let paragraph = Paragraph::new(title).block(block).centered();
    frame.render_widget(paragraph, area);
}

/// Render the footer with controls, or the hovered feature
fn render_footer(frame: &mut Frame, area: Rect, view: &MapView) {
    let hovered = view
        .canvas()
        .hovered()
        .filter(|_| view.canvas().cursor() == Cursor::Pointer);

    let controls = if let Some(hit) = hovered {
        let name = hit.label.clone().unwrap_or_else(|| hit.feature_id.clone());
        Line::from(vec![
            Span::styled("▶ ", Style::default().fg(Color::Yellow)),
            Span::styled(name, Style::default().fg(Color::White).bold()),
            Span::styled("  click for details", Style::default().fg(Color::DarkGray)),
        ])
    } else {
        Line::from(vec![
            Span::styled("q", Style::default().fg(Color::Yellow)),
            Span::raw(":quit  "),
            Span::styled("/", Style::default().fg(Color::Yellow)),
            Span::raw(":search  "),
            Span::styled("1-9", Style::default().fg(Color::Yellow)),
            Span::raw(":layers  "),
            Span::styled("a", Style::default().fg(Color::Yellow)),
            Span::raw(":active  "),
            Span::styled("←↑↓→", Style::default().fg(Color::Yellow)),
            Span::raw(":pan  "),
            Span::styled("+/-", Style::default().fg(Color::Yellow)),
            Span::raw(":zoom"),
        ])
    };

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray));

    let paragraph = Paragraph::new(controls).block(block).centered();
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_to_pixel_uses_cell_center() {
        let inner = Rect::new(1, 4, 50, 20);
        assert_eq!(cell_to_pixel(inner, Position::new(1, 4)), (1.0, 2.0));
        assert_eq!(cell_to_pixel(inner, Position::new(11, 6)), (21.0, 10.0));
    }
}
