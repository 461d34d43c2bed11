use tracing::info;

use crate::display::{FeatureStore, UpsertSummary};
use crate::item::MapItem;
use crate::map::SharedLayer;

/// Row shown by the layer panel
#[derive(Debug, Clone, PartialEq)]
pub struct LayerEntry {
    pub title: String,
    pub visible: bool,
}

/// Visibility checkboxes, one per store layer
pub struct LayerSwitcher {
    layers: Vec<SharedLayer>,
}

impl LayerSwitcher {
    pub fn new(layers: Vec<SharedLayer>) -> Self {
        Self { layers }
    }

    pub fn entries(&self) -> Vec<LayerEntry> {
        self.layers
            .iter()
            .map(|layer| {
                let layer = layer.read();
                LayerEntry {
                    title: layer.title().to_string(),
                    visible: layer.is_visible(),
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Flip visibility of the layer at `index`, returning its new state
    pub fn toggle(&self, index: usize) -> Option<bool> {
        let mut layer = self.layers.get(index)?.write();
        let visible = !layer.is_visible();
        layer.set_visible(visible);
        info!(layer = layer.name(), visible, "Toggled layer");
        Some(visible)
    }
}

/// "Active only" checkbox; re-populates the store on every change
pub struct ActiveOnlyToggle {
    enabled: bool,
}

impl ActiveOnlyToggle {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn toggle(&mut self, store: &FeatureStore, items: &[MapItem]) -> UpsertSummary {
        self.enabled = !self.enabled;
        info!(active_only = self.enabled, "Toggled active filter");
        store.upsert(items, self.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::item::tests::item_at;
    use crate::map::VectorLayer;
    use crate::style::{GlyphTable, StyleResolver};

    #[test]
    fn test_toggle_flips_visibility() {
        let layers = vec![
            VectorLayer::new("people", "People").shared(),
            VectorLayer::new("groups", "Groups").shared(),
        ];
        let switcher = LayerSwitcher::new(layers.clone());

        assert_eq!(switcher.toggle(1), Some(false));
        assert!(!layers[1].read().is_visible());
        assert!(layers[0].read().is_visible());
        assert_eq!(switcher.entries()[1].title, "Groups");

        assert_eq!(switcher.toggle(1), Some(true));
        assert_eq!(switcher.toggle(7), None);
    }

    #[test]
    fn test_active_toggle_refilters() {
        let config = MapConfig::builtin();
        let store = FeatureStore::new(&config, &StyleResolver::new(GlyphTable::builtin()));

        let mut inactive = item_at("2", 2.0, 48.0);
        inactive.is_active = false;
        let items = vec![item_at("1", 1.0, 47.0), inactive];

        let mut toggle = ActiveOnlyToggle::new(false);
        store.upsert(&items, toggle.is_enabled());
        assert_eq!(store.feature_count(), 2);

        toggle.toggle(&store, &items);
        assert!(toggle.is_enabled());
        assert_eq!(store.feature_count(), 1);

        toggle.toggle(&store, &items);
        assert_eq!(store.feature_count(), 2);
    }
}
