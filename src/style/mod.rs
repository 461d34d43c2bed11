//! Category styles: turns a style descriptor from the configuration into
//! the stacked layers a marker is drawn with.

mod glyphs;

pub use glyphs::{GlyphTable, FALLBACK_GLYPH};

use std::str::FromStr;

use ratatui::style::Color;
use serde::Deserialize;
use tracing::debug;

/// Neutral tone replacing the category color for past items
pub const MUTED_COLOR: Color = Color::Rgb(153, 153, 153);

/// Glyph color drawn over badges
pub const GLYPH_COLOR: Color = Color::White;

/// Badge radius in pixels
pub const BADGE_RADIUS: f64 = 3.0;

/// Style descriptor as written in the category configuration
///
/// Exactly one of the two forms is expected: `color` + `icon_name` for a
/// badge with a glyph, or `icon_url` + `icon_anchor` for an image.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDescriptor {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon_name: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub icon_anchor: Option<[f64; 2]>,
    /// Vertical pixel offset of the popup tip above the marker position
    #[serde(default)]
    pub popup_anchor: Option<f64>,
}

impl StyleDescriptor {
    pub fn badge(color: &str, icon_name: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            icon_name: Some(icon_name.to_string()),
            ..Self::default()
        }
    }

    /// Whether the descriptor defines any of the style fields
    pub fn is_empty(&self) -> bool {
        self.color.is_none()
            && self.icon_name.is_none()
            && self.icon_url.is_none()
            && self.icon_anchor.is_none()
    }

    /// Popup offset for markers drawn with this descriptor
    ///
    /// Defaults to the top of the badge, or the top of the image for the
    /// image form.
    pub fn popup_anchor(&self) -> f64 {
        if let Some(anchor) = self.popup_anchor {
            return anchor;
        }
        match self.icon_anchor {
            Some([_, y]) if self.icon_url.is_some() => -y,
            _ => -BADGE_RADIUS,
        }
    }
}

/// One drawable part of a style; parts are drawn in order
#[derive(Debug, Clone, PartialEq)]
pub enum StyleLayer {
    /// Filled circle behind the glyph
    Badge { radius: f64, fill: Color },
    /// Glyph centered on the position
    Glyph { glyph: char, color: Color },
    /// Image marker, `anchor` in pixels from its top-left corner
    Image { url: String, anchor: [f64; 2] },
    /// Outline of an area geometry
    Stroke { color: Color },
}

/// Renderable style: stacked layers, bottom first
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    layers: Vec<StyleLayer>,
}

impl Style {
    pub fn new(layers: Vec<StyleLayer>) -> Self {
        Self { layers }
    }

    /// Outline style for highlighted areas
    pub fn stroke(color: Color) -> Self {
        Self::new(vec![StyleLayer::Stroke { color }])
    }

    pub fn layers(&self) -> &[StyleLayer] {
        &self.layers
    }
}

/// Options for [`StyleResolver::resolve`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Replace the configured color with [`MUTED_COLOR`]
    pub muted_color: bool,
}

impl ResolveOptions {
    pub const MUTED: Self = Self { muted_color: true };
}

/// Resolves style descriptors against the available glyphs
#[derive(Debug, Clone, Default)]
pub struct StyleResolver {
    glyphs: GlyphTable,
}

impl StyleResolver {
    pub fn new(glyphs: GlyphTable) -> Self {
        Self { glyphs }
    }

    /// Build the style for a descriptor
    ///
    /// Returns `None` when the descriptor has neither a usable
    /// color + icon name pair nor an icon URL + anchor pair.
    pub fn resolve(&self, descriptor: &StyleDescriptor, options: ResolveOptions) -> Option<Style> {
        if let (Some(color), Some(icon_name)) = (&descriptor.color, &descriptor.icon_name) {
            let fill = if options.muted_color {
                MUTED_COLOR
            } else {
                match Color::from_str(color) {
                    Ok(c) => c,
                    Err(_) => {
                        debug!(color, "Unparseable style color");
                        return None;
                    }
                }
            };

            return Some(Style::new(vec![
                StyleLayer::Badge {
                    radius: BADGE_RADIUS,
                    fill,
                },
                StyleLayer::Glyph {
                    glyph: self.glyphs.glyph(icon_name),
                    color: GLYPH_COLOR,
                },
            ]));
        }

        if let (Some(url), Some(anchor)) = (&descriptor.icon_url, descriptor.icon_anchor) {
            return Some(Style::new(vec![StyleLayer::Image {
                url: url.clone(),
                anchor,
            }]));
        }

        None
    }
}
