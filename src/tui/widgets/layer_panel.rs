use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::controls::{ActiveOnlyToggle, LayerSwitcher};

/// Row clicked in the layer panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelRow {
    Layer(usize),
    ActiveOnly,
}

/// Size of the panel for the given controls, if there is anything to show
pub fn panel_size(layers: Option<&LayerSwitcher>, active: Option<&ActiveOnlyToggle>) -> Option<(u16, u16)> {
    let rows = layers.map_or(0, |l| l.len()) + usize::from(active.is_some());
    if rows == 0 {
        return None;
    }
    let widest = layers
        .map(|l| l.entries().iter().map(|e| e.title.chars().count()).max().unwrap_or(0))
        .unwrap_or(0)
        .max("Active only".len());
    // "9 [x] " prefix plus borders
    Some(((widest + 8) as u16, rows as u16 + 2))
}

/// Render the layer panel in `area`
pub fn render(frame: &mut Frame, area: Rect, layers: Option<&LayerSwitcher>, active: Option<&ActiveOnlyToggle>) {
    let block = Block::default()
        .title(" Layers ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut lines: Vec<Line> = layers
        .map(|switcher| {
            switcher
                .entries()
                .into_iter()
                .enumerate()
                .map(|(i, entry)| {
                    let key = if i < 9 {
                        format!("{} ", i + 1)
                    } else {
                        "  ".to_string()
                    };
                    row(key, entry.visible, entry.title)
                })
                .collect()
        })
        .unwrap_or_default();

    if let Some(toggle) = active {
        lines.push(row("a ".to_string(), toggle.is_enabled(), "Active only".to_string()));
    }

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn row(key: String, checked: bool, title: String) -> Line<'static> {
    let (mark, style) = if checked {
        ("[x] ", Style::default().fg(Color::Yellow))
    } else {
        ("[ ] ", Style::default().fg(Color::DarkGray))
    };
    Line::from(vec![
        Span::styled(key, Style::default().fg(Color::Gray)),
        Span::styled(mark, style),
        Span::styled(title, Style::default().fg(Color::White)),
    ])
}

/// Which row a terminal position falls on
pub fn row_at(area: Rect, layers: Option<&LayerSwitcher>, position: Position) -> Option<PanelRow> {
    let inner = Rect::new(
        area.x + 1,
        area.y + 1,
        area.width.saturating_sub(2),
        area.height.saturating_sub(2),
    );
    if !inner.contains(position) {
        return None;
    }
    let index = (position.y - inner.y) as usize;
    let layer_rows = layers.map_or(0, |l| l.len());
    if index < layer_rows {
        Some(PanelRow::Layer(index))
    } else {
        Some(PanelRow::ActiveOnly)
    }
}
