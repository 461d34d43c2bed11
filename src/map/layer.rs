use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::geo::Coord;
use crate::style::Style;

/// Layer handle shared by its owner, the canvas and the layer panel
pub type SharedLayer = Arc<RwLock<VectorLayer>>;

/// Feature geometry in render space
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    /// Outer ring first, then holes
    Polygon(Vec<Vec<Coord>>),
}

/// Popup payload attached to a feature
#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    /// Opaque markup shown verbatim
    pub html: String,
    /// Vertical pixel offset of the popup tip from the feature position
    pub anchor: f64,
}

/// A single renderable marker or shape
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub geometry: Geometry,
    pub style: Style,
    pub popup: Option<PopupContent>,
    /// Short name shown on hover
    pub label: Option<String>,
}

impl Feature {
    pub fn point(id: impl Into<String>, position: Coord, style: Style) -> Self {
        Self {
            id: id.into(),
            geometry: Geometry::Point(position),
            style,
            popup: None,
            label: None,
        }
    }

    pub fn with_popup(mut self, popup: PopupContent) -> Self {
        self.popup = Some(popup);
        self
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    /// Position of point features
    pub fn position(&self) -> Option<Coord> {
        match self.geometry {
            Geometry::Point(c) => Some(c),
            Geometry::Polygon(_) => None,
        }
    }
}

/// Named collection of features rendered and toggled together
///
/// Holds at most one feature per id; features keep their insertion order,
/// later ones drawn on top.
#[derive(Debug)]
pub struct VectorLayer {
    name: String,
    title: String,
    visible: bool,
    features: BTreeMap<u64, Feature>,
    index: HashMap<String, u64>,
    next_seq: u64,
}

impl VectorLayer {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            visible: true,
            features: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Wrap into a shared handle
    pub fn shared(self) -> SharedLayer {
        Arc::new(RwLock::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Add a feature; returns `false` and leaves the layer unchanged if the id is taken
    pub fn insert(&mut self, feature: Feature) -> bool {
        if self.index.contains_key(&feature.id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(feature.id.clone(), seq);
        self.features.insert(seq, feature);
        true
    }

    /// Remove a feature; returns `false` if it was not there
    pub fn remove(&mut self, id: &str) -> bool {
        match self.index.remove(id) {
            Some(seq) => {
                self.features.remove(&seq);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.index.get(id).and_then(|seq| self.features.get(seq))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features bottom to top
    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }
}
