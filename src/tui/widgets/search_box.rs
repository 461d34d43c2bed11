use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::controls::search::ControlState;
use crate::controls::SearchControl;

const WIDTH: u16 = 40;

/// Rows below the input line
fn list_rows(search: &SearchControl) -> u16 {
    match search.state() {
        ControlState::ShowingResults(results) => results.len() as u16,
        ControlState::ShowingError(_) | ControlState::Searching { .. } => 1,
        _ => 0,
    }
}

/// Area of the search box anchored at the top-left of `inner`
pub fn area(inner: Rect, search: &SearchControl) -> Rect {
    let width = WIDTH.min(inner.width);
    let height = (3 + list_rows(search)).min(inner.height);
    Rect::new(inner.x, inner.y, width, height)
}

/// Render the input line and the result panel
pub fn render(frame: &mut Frame, area: Rect, search: &SearchControl) {
    let border = if search.is_focused() {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .title(" Search address (/) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    let mut input = vec![Span::styled(search.text().to_string(), Style::default().fg(Color::White))];
    if search.is_focused() {
        input.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
    }
    if matches!(search.state(), ControlState::Pending { .. }) {
        input.push(Span::styled(" …", Style::default().fg(Color::DarkGray)));
    }
    let mut lines = vec![Line::from(input)];

    match search.state() {
        ControlState::Searching { .. } => {
            lines.push(Line::from(Span::styled(
                "Searching...",
                Style::default().fg(Color::DarkGray).italic(),
            )));
        }
        ControlState::ShowingResults(results) => {
            for (i, result) in results.iter().enumerate() {
                let style = if i == search.highlighted() {
                    Style::default().fg(Color::Black).bg(Color::Yellow)
                } else {
                    Style::default().fg(Color::Gray)
                };
                lines.push(Line::from(Span::styled(result.label.clone(), style)));
            }
        }
        ControlState::ShowingError(failure) => {
            lines.push(Line::from(Span::styled(
                failure.message(),
                Style::default().fg(Color::Red).italic(),
            )));
        }
        _ => {}
    }

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Index of the result under a terminal position
pub fn result_at(area: Rect, search: &SearchControl, position: Position) -> Option<usize> {
    if !area.contains(position) || position.x == area.x || position.x + 1 >= area.right() {
        return None;
    }
    // Border, then the input line
    let index = position.y.checked_sub(area.y + 2)? as usize;
    (index < search.results().len()).then_some(index)
}
