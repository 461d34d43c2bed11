use crate::geo::Coord;

use super::layer::PopupContent;

/// Height of the popup arrow in pixels
pub const POPUP_ARROW: f64 = 4.0;

/// Rectangle in canvas pixels (origin top-left, y down)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn contains(&self, (px, py): (f64, f64)) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

/// Popup currently shown on the map
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPopup {
    pub feature_id: String,
    /// Feature position the popup tip points at
    pub position: Coord,
    pub html: String,
    /// Pixel offset of the tip from `position`; negative is upward
    pub offset: (f64, f64),
}

/// Overlay showing a feature's popup content next to the feature
#[derive(Debug, Default)]
pub struct Popup {
    open: Option<OpenPopup>,
    bounds: Option<PixelRect>,
}

impl Popup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `content` for a feature at `position`
    pub fn open(&mut self, feature_id: &str, position: Coord, content: &PopupContent) {
        self.open = Some(OpenPopup {
            feature_id: feature_id.to_string(),
            position,
            html: content.html.clone(),
            offset: (0.0, content.anchor - POPUP_ARROW),
        });
        self.bounds = None;
    }

    pub fn close(&mut self) {
        self.open = None;
        self.bounds = None;
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn current(&self) -> Option<&OpenPopup> {
        self.open.as_ref()
    }

    /// Record where the popup box was drawn
    pub fn set_bounds(&mut self, bounds: Option<PixelRect>) {
        self.bounds = bounds;
    }

    /// Whether a pixel falls on the drawn popup box
    ///
    /// Pointer events there belong to the popup and must not reach the map.
    pub fn contains(&self, px: (f64, f64)) -> bool {
        self.open.is_some() && self.bounds.is_some_and(|b| b.contains(px))
    }
}
