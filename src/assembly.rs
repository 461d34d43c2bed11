//! Entry points wiring items, layers, controls and the canvas into a map.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use geojson::{GeoJson, Value};
use ratatui::style::Color;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::MapConfig;
use crate::controls::search::{Recenter, SearchInput};
use crate::controls::{ActiveOnlyToggle, LayerSwitcher, SearchControl};
use crate::display::FeatureStore;
use crate::error::ConfigError;
use crate::feed::FeedClient;
use crate::geo::{disambiguate, project, Coord, Extent, LonLat};
use crate::geocoder::Geocoder;
use crate::item::MapItem;
use crate::map::{create_canvas, Canvas, ClickOutcome, Feature, Geometry, PopupContent, VectorLayer};
use crate::style::{GlyphTable, ResolveOptions, Style, StyleDescriptor, StyleLayer, StyleResolver};

/// Zoom used before the first fit is applied
const INITIAL_ZOOM: f64 = 5.0;

/// Outline color of the focus overlay
const FOCUS_COLOR: Color = Color::Yellow;

/// Name of the focus overlay layer
const FOCUS_LAYER: &str = "focus";

/// A finished map: canvas plus whichever controls were requested
pub struct MapView {
    canvas: Canvas,
    store: Option<FeatureStore>,
    items: Vec<MapItem>,
    layer_switcher: Option<LayerSwitcher>,
    active_toggle: Option<ActiveOnlyToggle>,
    search: Option<SearchControl>,
}

impl MapView {
    fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            store: None,
            items: Vec::new(),
            layer_switcher: None,
            active_toggle: None,
            search: None,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn store(&self) -> Option<&FeatureStore> {
        self.store.as_ref()
    }

    /// Items as displayed, after disambiguation
    pub fn items(&self) -> &[MapItem] {
        &self.items
    }

    pub fn layer_switcher(&self) -> Option<&LayerSwitcher> {
        self.layer_switcher.as_ref()
    }

    pub fn active_toggle(&self) -> Option<&ActiveOnlyToggle> {
        self.active_toggle.as_ref()
    }

    pub fn search(&self) -> Option<&SearchControl> {
        self.search.as_ref()
    }

    pub fn search_mut(&mut self) -> Option<&mut SearchControl> {
        self.search.as_mut()
    }

    pub fn toggle_layer(&mut self, index: usize) -> Option<bool> {
        self.layer_switcher.as_ref()?.toggle(index)
    }

    pub fn toggle_active_only(&mut self) {
        if let (Some(toggle), Some(store)) = (self.active_toggle.as_mut(), self.store.as_ref()) {
            toggle.toggle(store, &self.items);
        }
    }

    /// Map click: popup handling
    pub fn click(&mut self, px: (f64, f64)) -> ClickOutcome {
        self.canvas.handle_click(px)
    }

    /// Route a search task message, recentering on a selection
    pub fn on_search_message(&mut self, msg: SearchInput) {
        let recenter = self.search.as_mut().and_then(|s| s.on_message(msg));
        self.apply(recenter);
    }

    /// Enter in the search box
    pub fn search_submit(&mut self) {
        let recenter = self.search.as_mut().and_then(|s| s.submit());
        self.apply(recenter);
    }

    pub fn search_select(&mut self, index: usize) {
        let recenter = self.search.as_mut().and_then(|s| s.select(index));
        self.apply(recenter);
    }

    fn apply(&mut self, recenter: Option<Recenter>) {
        if let Some(Recenter { center, zoom }) = recenter {
            info!(x = center.x, y = center.y, zoom, "Recentering on search result");
            self.canvas.recenter(center, zoom);
        }
    }
}

/// Inputs of the single-marker map
pub struct SingleMarkerOptions {
    pub position: LonLat,
    pub style: StyleDescriptor,
    pub zoom: f64,
    /// Glyph file to wait for before first paint
    pub glyphs: Option<PathBuf>,
    pub glyph_timeout: Duration,
    pub popup: Option<String>,
}

/// One styled marker at a fixed position, view centered on it
pub async fn single_marker_map(options: SingleMarkerOptions) -> MapView {
    let glyphs = match &options.glyphs {
        Some(path) => GlyphTable::load(path, options.glyph_timeout).await,
        None => GlyphTable::builtin(),
    };
    let resolver = StyleResolver::new(glyphs);

    let style = resolver
        .resolve(&options.style, ResolveOptions::default())
        .unwrap_or_else(|| {
            warn!("Marker style is not renderable, using a plain badge");
            fallback_marker_style(&resolver)
        });

    let mut feature = Feature::point("marker", project(options.position), style);
    if let Some(html) = options.popup {
        feature = feature.with_popup(PopupContent {
            html,
            anchor: options.style.popup_anchor(),
        });
    }

    let mut layer = VectorLayer::new("marker", "Marker");
    layer.insert(feature);

    let mut canvas = create_canvas(vec![layer.shared()], options.position, options.zoom);
    canvas.attach_popup();

    info!(lon = options.position.lon, lat = options.position.lat, "Single marker map ready");
    MapView::new(canvas)
}

fn fallback_marker_style(resolver: &StyleResolver) -> Style {
    resolver
        .resolve(&StyleDescriptor::badge("red", "map-marker"), ResolveOptions::default())
        .unwrap_or_else(|| {
            Style::new(vec![StyleLayer::Badge {
                radius: crate::style::BADGE_RADIUS,
                fill: Color::Red,
            }])
        })
}

/// Inputs of the filterable-list map
pub struct ListMapOptions {
    pub endpoint: String,
    /// `[min_lon, min_lat, max_lon, max_lat]`, wins over `focus`
    pub bbox: Option<[f64; 4]>,
    pub focus: Option<geojson::Geometry>,
    pub search: bool,
    pub active_toggle: bool,
    pub layer_control: bool,
    /// Initial state of the active filter
    pub active_only: bool,
}

/// Services the list map draws on
pub struct ListMapServices<'a> {
    pub config: &'a MapConfig,
    pub resolver: &'a StyleResolver,
    pub feed: &'a FeedClient,
    pub geocoder: Arc<dyn Geocoder>,
    pub search_events: mpsc::Sender<SearchInput>,
}

/// Items from a remote endpoint, grouped into category layers
///
/// A failed fetch leaves an empty but fully interactive map.
pub async fn list_map(options: ListMapOptions, services: ListMapServices<'_>) -> MapView {
    let ListMapServices {
        config,
        resolver,
        feed,
        geocoder,
        search_events,
    } = services;

    let fetched = feed.fetch_items(&options.endpoint).await;
    let items = disambiguate(&fetched);

    let store = FeatureStore::new(config, resolver);
    store.upsert(&items, options.active_only);

    let default_extent = Extent::from_lon_lat_bbox(config.default_extent);
    let center = default_extent.center();
    let mut canvas = create_canvas(
        store.list_layers(),
        LonLat::new(center.x, center.y),
        INITIAL_ZOOM,
    );
    canvas.attach_popup();

    let focus = options.focus.as_ref().and_then(focus_layer);
    match (options.bbox, focus) {
        (Some(bbox), focus) => {
            if let Some((layer, _)) = focus {
                canvas.add_layer(layer.shared());
            }
            canvas.fit_view(bbox);
        }
        (None, Some((layer, extent))) => {
            canvas.add_layer(layer.shared());
            canvas.fit_extent(extent);
        }
        (None, None) => canvas.fit_extent(default_extent),
    }

    let mut view = MapView::new(canvas);
    if options.layer_control {
        view.layer_switcher = Some(LayerSwitcher::new(store.list_layers()));
    }
    if options.active_toggle {
        view.active_toggle = Some(ActiveOnlyToggle::new(options.active_only));
    }
    if options.search {
        view.search = Some(SearchControl::new(geocoder, search_events));
    }

    info!(
        items = items.len(),
        features = store.feature_count(),
        "List map ready"
    );
    view.store = Some(store);
    view.items = items;
    view
}

/// Outline overlay and extent of a polygonal focus geometry
fn focus_layer(geometry: &geojson::Geometry) -> Option<(VectorLayer, Extent)> {
    let polygons: Vec<Vec<Vec<Coord>>> = match &geometry.value {
        Value::Polygon(rings) => vec![project_rings(rings)],
        Value::MultiPolygon(polygons) => polygons.iter().map(|p| project_rings(p)).collect(),
        _ => {
            warn!("Focus geometry is not a polygon, ignoring it");
            return None;
        }
    };

    let extent = Extent::around(polygons.iter().flatten().flatten())?;

    let mut layer = VectorLayer::new(FOCUS_LAYER, "Focus");
    for (i, rings) in polygons.into_iter().enumerate() {
        layer.insert(Feature {
            id: format!("{FOCUS_LAYER}-{i}"),
            geometry: Geometry::Polygon(rings),
            style: Style::stroke(FOCUS_COLOR),
            popup: None,
            label: None,
        });
    }
    Some((layer, extent))
}

fn project_rings(rings: &[Vec<Vec<f64>>]) -> Vec<Vec<Coord>> {
    rings
        .iter()
        .map(|ring| {
            ring.iter()
                .filter(|p| p.len() >= 2)
                .map(|p| project(LonLat::new(p[0], p[1])))
                .collect()
        })
        .collect()
}

/// Parse a focus geometry from GeoJSON text
///
/// Accepts a bare geometry or a feature wrapping one.
pub fn parse_focus(text: &str) -> Result<geojson::Geometry, ConfigError> {
    let geojson = GeoJson::from_str(text).map_err(|e| ConfigError::Focus(e.to_string()))?;
    let geometry = match geojson {
        GeoJson::Geometry(geometry) => geometry,
        GeoJson::Feature(feature) => feature
            .geometry
            .ok_or_else(|| ConfigError::Focus("feature has no geometry".to_string()))?,
        GeoJson::FeatureCollection(_) => {
            return Err(ConfigError::Focus(
                "expected a geometry or a feature, got a collection".to_string(),
            ))
        }
    };

    match geometry.value {
        Value::Polygon(_) | Value::MultiPolygon(_) => Ok(geometry),
        _ => Err(ConfigError::Focus("geometry must be a Polygon or MultiPolygon".to_string())),
    }
}
