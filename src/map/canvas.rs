use std::cmp::Ordering;

use tracing::debug;

use crate::geo::{project, Coord, Extent, LonLat};

use super::layer::{PopupContent, SharedLayer};
use super::popup::Popup;

/// Pixels spanned by the whole world width at zoom 0
pub const TILE_SIZE: f64 = 256.0;

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 20.0;

/// Pointer distance in pixels within which a marker counts as hit
pub const HIT_TOLERANCE: f64 = 4.0;

/// Render units per pixel at a zoom level
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    360.0 / (TILE_SIZE * 2f64.powf(zoom))
}

/// Zoom level giving a resolution
pub fn zoom_for_resolution(resolution: f64) -> f64 {
    (360.0 / (TILE_SIZE * resolution)).log2()
}

/// Center and zoom of the map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    center: Coord,
    zoom: f64,
}

impl View {
    pub fn new(center: Coord, zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    pub fn center(&self) -> Coord {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn resolution(&self) -> f64 {
        resolution_for_zoom(self.zoom)
    }

    pub fn set_center(&mut self, center: Coord) {
        self.center = center;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }
}

/// Detail of the base coastline layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BaseDetail {
    Low,
    #[default]
    High,
}

/// The base layer, always drawn first
#[derive(Debug, Clone, Copy)]
pub struct BaseLayer {
    pub detail: BaseDetail,
    pub visible: bool,
}

/// Pointer affordance over the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    /// Over a feature that has popup content
    Pointer,
}

/// A feature found under the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureHit {
    pub layer: String,
    pub feature_id: String,
    pub position: Coord,
    /// Distance from the pointer in pixels
    pub distance: f64,
    pub popup: Option<PopupContent>,
    pub label: Option<String>,
}

/// Result of a click routed through the popup handlers
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Popup opened for this feature id
    Opened(String),
    /// Click on empty map, any popup closed
    Closed,
    /// Click landed on the popup itself
    Consumed,
    /// No popup attached
    Ignored,
}

/// The rendering surface: base layer, overlay layers and the view
pub struct Canvas {
    base: BaseLayer,
    overlays: Vec<SharedLayer>,
    view: View,
    /// Width and height in pixels; zero until the first layout
    size: (f64, f64),
    pending_fit: Option<Extent>,
    popup: Option<Popup>,
    cursor: Cursor,
    hovered: Option<FeatureHit>,
}

/// Create a canvas showing `layers` above the base layer, in the given order
pub fn create_canvas(layers: Vec<SharedLayer>, center: LonLat, zoom: f64) -> Canvas {
    Canvas {
        base: BaseLayer {
            detail: BaseDetail::default(),
            visible: true,
        },
        overlays: layers,
        view: View::new(project(center), zoom),
        size: (0.0, 0.0),
        pending_fit: None,
        popup: None,
        cursor: Cursor::Default,
        hovered: None,
    }
}

impl Canvas {
    pub fn base(&self) -> &BaseLayer {
        &self.base
    }

    pub fn set_base_detail(&mut self, detail: BaseDetail) {
        self.base.detail = detail;
    }

    /// Overlay layers bottom to top
    pub fn layers(&self) -> &[SharedLayer] {
        &self.overlays
    }

    /// Register an overlay on top of the existing ones
    pub fn add_layer(&mut self, layer: SharedLayer) {
        self.overlays.push(layer);
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Move the view; last write wins
    pub fn recenter(&mut self, center: Coord, zoom: f64) {
        self.view.set_center(center);
        self.view.set_zoom(zoom);
    }

    pub fn size(&self) -> (f64, f64) {
        self.size
    }

    /// Update the pixel size, applying a fit that was waiting for a layout
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.size = (width.max(0.0), height.max(0.0));
        if self.has_area() {
            if let Some(extent) = self.pending_fit.take() {
                self.fit_extent(extent);
            }
        }
    }

    fn has_area(&self) -> bool {
        self.size.0 > 0.0 && self.size.1 > 0.0
    }

    /// Fit the view to a `[min_lon, min_lat, max_lon, max_lat]` box
    pub fn fit_view(&mut self, bbox: [f64; 4]) {
        self.fit_extent(Extent::from_lon_lat_bbox(bbox));
    }

    /// Fit the view so that `extent` is fully visible
    ///
    /// With a zero-size canvas the fit is deferred until [`Canvas::set_size`]
    /// reports a usable size.
    pub fn fit_extent(&mut self, extent: Extent) {
        if !self.has_area() {
            debug!(?extent, "Canvas has no size yet, deferring fit");
            self.pending_fit = Some(extent);
            return;
        }

        let (width, height) = self.size;
        let resolution = (extent.width() / width).max(extent.height() / height);
        let zoom = if resolution > 0.0 {
            zoom_for_resolution(resolution)
        } else {
            MAX_ZOOM
        };

        self.view.set_center(extent.center());
        self.view.set_zoom(zoom);
        debug!(zoom = self.view.zoom(), "Fitted view");
    }

    /// Whether a fit is waiting for the canvas to get a size
    pub fn has_pending_fit(&self) -> bool {
        self.pending_fit.is_some()
    }

    /// Render-space rectangle currently visible
    pub fn visible_extent(&self) -> Extent {
        let res = self.view.resolution();
        let c = self.view.center();
        let half_w = self.size.0 * res / 2.0;
        let half_h = self.size.1 * res / 2.0;
        Extent::new(c.x - half_w, c.y - half_h, c.x + half_w, c.y + half_h)
    }

    /// Pixel position (origin top-left, y down) of a render coordinate
    pub fn pixel_from_coordinate(&self, coord: Coord) -> (f64, f64) {
        let res = self.view.resolution();
        let c = self.view.center();
        (
            (coord.x - c.x) / res + self.size.0 / 2.0,
            (c.y - coord.y) / res + self.size.1 / 2.0,
        )
    }

    /// Render coordinate under a pixel
    pub fn coordinate_from_pixel(&self, (px, py): (f64, f64)) -> Coord {
        let res = self.view.resolution();
        let c = self.view.center();
        Coord::new(
            c.x + (px - self.size.0 / 2.0) * res,
            c.y - (py - self.size.1 / 2.0) * res,
        )
    }

    /// Shift the view by a fraction of the visible span
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let extent = self.visible_extent();
        let c = self.view.center();
        self.view
            .set_center(Coord::new(c.x + dx * extent.width(), c.y + dy * extent.height()));
    }

    pub fn zoom_by(&mut self, delta: f64) {
        self.view.set_zoom(self.view.zoom() + delta);
    }

    /// Point features of visible layers within `tolerance` pixels
    ///
    /// Nearest first; at equal distance the feature drawn on top comes first.
    pub fn features_at_pixel(&self, px: (f64, f64), tolerance: f64) -> Vec<FeatureHit> {
        let mut hits: Vec<(usize, FeatureHit)> = Vec::new();
        let mut order = 0;

        for layer in &self.overlays {
            let layer = layer.read();
            if !layer.is_visible() {
                continue;
            }
            for feature in layer.features() {
                order += 1;
                let Some(position) = feature.position() else {
                    continue;
                };
                let (fx, fy) = self.pixel_from_coordinate(position);
                let distance = (fx - px.0).hypot(fy - px.1);
                if distance <= tolerance {
                    hits.push((
                        order,
                        FeatureHit {
                            layer: layer.name().to_string(),
                            feature_id: feature.id.clone(),
                            position,
                            distance,
                            popup: feature.popup.clone(),
                            label: feature.label.clone(),
                        },
                    ));
                }
            }
        }

        hits.sort_by(|(order_a, a), (order_b, b)| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then(order_b.cmp(order_a))
        });
        hits.into_iter().map(|(_, hit)| hit).collect()
    }

    /// Install the popup overlay and its pointer handlers
    pub fn attach_popup(&mut self) {
        if self.popup.is_none() {
            self.popup = Some(Popup::new());
        }
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn popup_mut(&mut self) -> Option<&mut Popup> {
        self.popup.as_mut()
    }

    /// Click handler: open the popup of the feature under the pointer, or
    /// close it on empty map
    pub fn handle_click(&mut self, px: (f64, f64)) -> ClickOutcome {
        let Some(popup) = self.popup.as_ref() else {
            return ClickOutcome::Ignored;
        };
        if popup.contains(px) {
            return ClickOutcome::Consumed;
        }

        let hit = self.features_at_pixel(px, HIT_TOLERANCE).into_iter().next();
        let Some(popup) = self.popup.as_mut() else {
            return ClickOutcome::Ignored;
        };

        match hit {
            Some(FeatureHit {
                feature_id,
                position,
                popup: Some(content),
                ..
            }) => {
                debug!(feature = %feature_id, "Opening popup");
                popup.open(&feature_id, position, &content);
                ClickOutcome::Opened(feature_id)
            }
            _ => {
                popup.close();
                ClickOutcome::Closed
            }
        }
    }

    /// Move handler: pointer affordance when over a feature with popup content
    pub fn handle_pointer_move(&mut self, px: (f64, f64)) -> Cursor {
        if self.popup.is_none() {
            return Cursor::Default;
        }

        self.hovered = self
            .features_at_pixel(px, HIT_TOLERANCE)
            .into_iter()
            .find(|hit| hit.popup.is_some());
        self.cursor = if self.hovered.is_some() {
            Cursor::Pointer
        } else {
            Cursor::Default
        };
        self.cursor
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Feature under the pointer, if it has popup content
    pub fn hovered(&self) -> Option<&FeatureHit> {
        self.hovered.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use ratatui::style::Color;

    use super::*;
    use crate::map::layer::{Feature, VectorLayer};
    use crate::map::popup::PixelRect;
    use crate::style::Style;

    fn layer_with(points: &[(&str, f64, f64, Option<&str>)]) -> SharedLayer {
        let mut layer = VectorLayer::new("groups", "Groups");
        for (id, x, y, html) in points {
            let mut feature = Feature::point(*id, Coord::new(*x, *y), Style::stroke(Color::Red));
            if let Some(html) = html {
                feature = feature.with_popup(PopupContent {
                    html: html.to_string(),
                    anchor: -3.0,
                });
            }
            layer.insert(feature);
        }
        layer.shared()
    }

    fn sized_canvas(layers: Vec<SharedLayer>) -> Canvas {
        let mut canvas = create_canvas(layers, LonLat::new(2.0, 47.0), 6.0);
        canvas.set_size(200.0, 100.0);
        canvas
    }

    #[test]
    fn test_resolution_zoom_roundtrip() {
        assert!((resolution_for_zoom(0.0) - 360.0 / 256.0).abs() < 1e-12);
        assert!((zoom_for_resolution(resolution_for_zoom(7.5)) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut view = View::new(Coord::default(), 42.0);
        assert_eq!(view.zoom(), MAX_ZOOM);
        view.set_zoom(-3.0);
        assert_eq!(view.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_fit_view_shows_whole_box() {
        let mut canvas = sized_canvas(Vec::new());
        let bbox = [-5.2, 41.3, 9.6, 51.1];
        canvas.fit_view(bbox);

        let visible = canvas.visible_extent();
        let wanted = Extent::from_lon_lat_bbox(bbox);
        assert!(visible.min_x <= wanted.min_x + 1e-9 && visible.max_x >= wanted.max_x - 1e-9);
        assert!(visible.min_y <= wanted.min_y + 1e-9 && visible.max_y >= wanted.max_y - 1e-9);
        assert_eq!(canvas.view().center(), wanted.center());
    }

    #[test]
    fn test_fit_view_deferred_until_sized() {
        let mut canvas = create_canvas(Vec::new(), LonLat::new(0.0, 0.0), 2.0);
        canvas.fit_view([-5.2, 41.3, 9.6, 51.1]);

        assert!(canvas.has_pending_fit());
        assert_eq!(canvas.view().zoom(), 2.0);

        canvas.set_size(0.0, 50.0);
        assert!(canvas.has_pending_fit());

        canvas.set_size(200.0, 100.0);
        assert!(!canvas.has_pending_fit());
        assert!(canvas.view().zoom() > 2.0);
    }

    #[test]
    fn test_fit_single_point_goes_to_max_zoom() {
        let mut canvas = sized_canvas(Vec::new());
        canvas.fit_extent(Extent::new(2.0, 48.0, 2.0, 48.0));
        assert_eq!(canvas.view().zoom(), MAX_ZOOM);
    }

    #[test]
    fn test_pixel_coordinate_inverse() {
        let canvas = sized_canvas(Vec::new());
        let coord = Coord::new(3.1, 46.2);
        let px = canvas.pixel_from_coordinate(coord);
        let back = canvas.coordinate_from_pixel(px);
        assert!(back.distance(&coord) < 1e-9);

        // View center sits in the middle of the canvas
        assert_eq!(canvas.pixel_from_coordinate(canvas.view().center()), (100.0, 50.0));
    }

    #[test]
    fn test_click_opens_and_empty_click_closes() {
        let layer = layer_with(&[("1", 2.0, 47.0, Some("<p>one</p>"))]);
        let mut canvas = sized_canvas(vec![layer]);
        canvas.attach_popup();

        let px = canvas.pixel_from_coordinate(Coord::new(2.0, 47.0));
        assert_eq!(canvas.handle_click(px), ClickOutcome::Opened("1".to_string()));
        assert_eq!(canvas.popup().unwrap().current().unwrap().html, "<p>one</p>");

        assert_eq!(canvas.handle_click((0.0, 0.0)), ClickOutcome::Closed);
        assert!(!canvas.popup().unwrap().is_open());
    }

    #[test]
    fn test_click_inside_popup_does_not_close_it() {
        let layer = layer_with(&[("1", 2.0, 47.0, Some("<p>one</p>"))]);
        let mut canvas = sized_canvas(vec![layer]);
        canvas.attach_popup();

        let px = canvas.pixel_from_coordinate(Coord::new(2.0, 47.0));
        canvas.handle_click(px);
        canvas.popup_mut().unwrap().set_bounds(Some(PixelRect {
            x: 0.0,
            y: 0.0,
            width: 40.0,
            height: 12.0,
        }));

        assert_eq!(canvas.handle_click((5.0, 5.0)), ClickOutcome::Consumed);
        assert!(canvas.popup().unwrap().is_open());
    }

    #[test]
    fn test_without_popup_clicks_are_ignored() {
        let layer = layer_with(&[("1", 2.0, 47.0, Some("<p>one</p>"))]);
        let mut canvas = sized_canvas(vec![layer]);
        let px = canvas.pixel_from_coordinate(Coord::new(2.0, 47.0));
        assert_eq!(canvas.handle_click(px), ClickOutcome::Ignored);
    }

    #[test]
    fn test_hidden_layers_are_not_hit() {
        let layer = layer_with(&[("1", 2.0, 47.0, Some("<p>one</p>"))]);
        let mut canvas = sized_canvas(vec![layer.clone()]);
        canvas.attach_popup();
        layer.write().set_visible(false);

        let px = canvas.pixel_from_coordinate(Coord::new(2.0, 47.0));
        assert_eq!(canvas.handle_click(px), ClickOutcome::Closed);
    }

    #[test]
    fn test_pointer_cursor_only_over_popup_features() {
        let layer = layer_with(&[
            ("with", 2.0, 47.0, Some("<p>one</p>")),
            ("without", 4.0, 47.0, None),
        ]);
        let mut canvas = sized_canvas(vec![layer]);
        canvas.attach_popup();

        let over_with = canvas.pixel_from_coordinate(Coord::new(2.0, 47.0));
        let over_without = canvas.pixel_from_coordinate(Coord::new(4.0, 47.0));

        assert_eq!(canvas.handle_pointer_move(over_with), Cursor::Pointer);
        assert_eq!(canvas.hovered().unwrap().feature_id, "with");
        assert_eq!(canvas.handle_pointer_move(over_without), Cursor::Default);
        assert!(canvas.hovered().is_none());
    }

    #[test]
    fn test_hits_prefer_topmost_at_equal_distance() {
        let bottom = layer_with(&[("a", 2.0, 47.0, Some("a"))]);
        let top = layer_with(&[("b", 2.0, 47.0, Some("b"))]);
        let canvas = sized_canvas(vec![bottom, top]);

        let px = canvas.pixel_from_coordinate(Coord::new(2.0, 47.0));
        let hits = canvas.features_at_pixel(px, HIT_TOLERANCE);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].feature_id, "b");
    }

    #[test]
    fn test_pan_moves_by_visible_fraction() {
        let mut canvas = sized_canvas(Vec::new());
        let before = canvas.view().center();
        let width = canvas.visible_extent().width();
        canvas.pan(0.1, 0.0);
        assert!((canvas.view().center().x - (before.x + 0.1 * width)).abs() < 1e-9);
    }
}
