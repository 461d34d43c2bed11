use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas as CanvasWidget, Circle, Context, Line as CanvasLine, Map, MapResolution};
use ratatui::widgets::{Block, Borders};

use crate::geo::Coord;
use crate::map::{BaseDetail, Canvas, Geometry};
use crate::style::{Style as MarkerStyle, StyleLayer, BADGE_RADIUS};

/// Glyph drawn for image markers
const PIN: &str = "▼";

/// Snapshot of one feature, taken so no layer lock is held while painting
enum Mark {
    Point { at: Coord, style: MarkerStyle },
    Polygon { rings: Vec<Vec<Coord>>, style: MarkerStyle },
}

/// Inner drawing area of the map block
pub fn inner_area(area: Rect) -> Rect {
    block().inner(area)
}

fn block() -> Block<'static> {
    Block::default()
        .title(" Map ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
}

/// Render the base layer and every visible overlay layer
///
/// The canvas size is taken from the inner area (two braille dots per
/// column, four per row) before drawing, which also applies a pending fit.
pub fn render(frame: &mut Frame, area: Rect, canvas: &mut Canvas) {
    let inner = inner_area(area);
    canvas.set_size(inner.width as f64 * 2.0, inner.height as f64 * 4.0);

    let extent = canvas.visible_extent();
    let resolution = canvas.view().resolution();
    let base = *canvas.base();
    let hovered = canvas.hovered().map(|hit| hit.position);

    let mut marks = Vec::new();
    for layer in canvas.layers() {
        let layer = layer.read();
        if !layer.is_visible() {
            continue;
        }
        for feature in layer.features() {
            marks.push(match &feature.geometry {
                Geometry::Point(at) => Mark::Point {
                    at: *at,
                    style: feature.style.clone(),
                },
                Geometry::Polygon(rings) => Mark::Polygon {
                    rings: rings.clone(),
                    style: feature.style.clone(),
                },
            });
        }
    }

    let widget = CanvasWidget::default()
        .block(block())
        .marker(Marker::Braille)
        .x_bounds([extent.min_x, extent.max_x])
        .y_bounds([extent.min_y, extent.max_y])
        .paint(move |ctx| {
            if base.visible {
                ctx.draw(&Map {
                    color: Color::DarkGray,
                    resolution: match base.detail {
                        BaseDetail::Low => MapResolution::Low,
                        BaseDetail::High => MapResolution::High,
                    },
                });
                ctx.layer();
            }

            for mark in &marks {
                match mark {
                    Mark::Polygon { rings, style } => draw_polygon(ctx, rings, style),
                    Mark::Point { at, style } => draw_point(ctx, *at, style, resolution),
                }
            }

            // Pointer affordance
            if let Some(at) = hovered {
                ctx.draw(&Circle {
                    x: at.x,
                    y: at.y,
                    radius: (BADGE_RADIUS + 2.0) * resolution,
                    color: Color::White,
                });
            }
        });

    frame.render_widget(widget, area);
}

fn draw_polygon(ctx: &mut Context, rings: &[Vec<Coord>], style: &MarkerStyle) {
    let color = style
        .layers()
        .iter()
        .find_map(|layer| match layer {
            StyleLayer::Stroke { color } => Some(*color),
            _ => None,
        })
        .unwrap_or(Color::Yellow);

    for ring in rings {
        for pair in ring.windows(2) {
            ctx.draw(&CanvasLine {
                x1: pair[0].x,
                y1: pair[0].y,
                x2: pair[1].x,
                y2: pair[1].y,
                color,
            });
        }
    }
}

/// Draw the style layers of a point in order; a glyph sits on the badge
/// drawn before it
fn draw_point(ctx: &mut Context, at: Coord, style: &MarkerStyle, resolution: f64) {
    let mut fill = None;
    for layer in style.layers() {
        match layer {
            StyleLayer::Badge { radius, fill: color } => {
                ctx.draw(&Circle {
                    x: at.x,
                    y: at.y,
                    radius: radius * resolution,
                    color: *color,
                });
                fill = Some(*color);
            }
            StyleLayer::Glyph { glyph, color } => {
                let mut span_style = Style::default().fg(*color).bold();
                if let Some(fill) = fill {
                    span_style = span_style.bg(fill);
                }
                ctx.print(at.x, at.y, Span::styled(glyph.to_string(), span_style));
            }
            StyleLayer::Image { .. } => {
                ctx.print(at.x, at.y, Span::styled(PIN, Style::default().fg(Color::Cyan).bold()));
            }
            StyleLayer::Stroke { color } => {
                ctx.draw(&Circle {
                    x: at.x,
                    y: at.y,
                    radius: BADGE_RADIUS * resolution,
                    color: *color,
                });
            }
        }
    }
}
