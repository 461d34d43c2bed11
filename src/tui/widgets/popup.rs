use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::map::{Canvas, PixelRect};

const MAX_WIDTH: u16 = 44;

/// Draw the open popup above its feature and record its box on the popup
///
/// `inner` is the map drawing area. A popup whose tip is off screen is not
/// drawn and has no bounds.
pub fn render(frame: &mut Frame, inner: Rect, canvas: &mut Canvas) {
    let Some(open) = canvas.popup().and_then(|p| p.current()).cloned() else {
        return;
    };

    let (px, py) = canvas.pixel_from_coordinate(open.position);
    let tip = (px + open.offset.0, py + open.offset.1);
    let placed = place(inner, tip, &open.html);

    let Some(popup) = canvas.popup_mut() else {
        return;
    };
    let Some((rect, arrow)) = placed else {
        popup.set_bounds(None);
        return;
    };

    popup.set_bounds(Some(PixelRect {
        x: (rect.x - inner.x) as f64 * 2.0,
        y: (rect.y - inner.y) as f64 * 4.0,
        width: rect.width as f64 * 2.0,
        height: rect.height as f64 * 4.0,
    }));

    let block = Block::default()
        .title(" Details ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let paragraph = Paragraph::new(open.html.as_str())
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(Clear, rect);
    frame.render_widget(paragraph, rect);

    if let Some((x, y)) = arrow {
        frame.buffer_mut()[(x, y)]
            .set_symbol("▼")
            .set_style(Style::default().fg(Color::Yellow));
    }
}

/// Box position for a popup whose tip is at canvas pixel `tip`, plus the
/// cell for its arrow when there is room for one
fn place(inner: Rect, tip: (f64, f64), html: &str) -> Option<(Rect, Option<(u16, u16)>)> {
    if inner.width < 4 || inner.height < 3 {
        return None;
    }

    let col = inner.x as f64 + tip.0 / 2.0;
    let row = inner.y as f64 + tip.1 / 4.0;
    if col < inner.x as f64 || col >= inner.right() as f64 || row < inner.y as f64 || row >= inner.bottom() as f64
    {
        return None;
    }
    let (col, row) = (col as u16, row as u16);

    let width = MAX_WIDTH.min(inner.width);
    let text_width = (width - 2).max(1) as usize;
    let lines: usize = html
        .lines()
        .map(|line| line.chars().count().div_ceil(text_width).max(1))
        .sum();
    let height = (lines as u16 + 2).min(inner.height);

    // Box sits above the arrow row; below the marker when the top is too close
    let (y, arrow) = if row >= inner.y + height {
        (row - height, Some((col, row)))
    } else {
        ((row + 1).min(inner.bottom() - height), None)
    };
    let x = col
        .saturating_sub(width / 2)
        .clamp(inner.x, inner.right() - width);

    Some((Rect::new(x, y, width, height), arrow))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_sits_above_tip() {
        let inner = Rect::new(1, 1, 60, 20);
        let (rect, arrow) = place(inner, (60.0, 60.0), "<b>Group</b>").unwrap();

        assert_eq!(arrow, Some((31, 16)));
        assert_eq!(rect.bottom(), 16);
        assert_eq!(rect.height, 3);
        assert!(rect.x >= inner.x && rect.right() <= inner.right());
    }

    #[test]
    fn test_box_flips_below_near_top() {
        let inner = Rect::new(0, 0, 60, 20);
        let (rect, arrow) = place(inner, (60.0, 2.0), "short").unwrap();
        assert_eq!(arrow, None);
        assert_eq!(rect.y, 1);
    }

    #[test]
    fn test_offscreen_tip_is_not_placed() {
        let inner = Rect::new(0, 0, 60, 20);
        assert!(place(inner, (-10.0, 10.0), "x").is_none());
        assert!(place(inner, (10.0, 400.0), "x").is_none());
    }

    #[test]
    fn test_long_text_wraps_into_taller_box() {
        let inner = Rect::new(0, 0, 60, 20);
        let html = "x".repeat(100);
        let (rect, _) = place(inner, (60.0, 76.0), &html).unwrap();
        // 42 columns of text per line
        assert_eq!(rect.height, 5);
    }
}
