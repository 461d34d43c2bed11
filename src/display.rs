//! Feature store: one vector layer per styled category, filled from map items.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::MapConfig;
use crate::geo::project;
use crate::item::{CategoryId, MapItem};
use crate::map::{Feature, PopupContent, SharedLayer, VectorLayer};
use crate::style::{ResolveOptions, Style, StyleDescriptor, StyleResolver};

/// Where items of one (category, subcategory) pair go and how they look
#[derive(Clone)]
struct Route {
    layer: SharedLayer,
    active: Style,
    past: Style,
    popup_anchor: f64,
}

impl Route {
    fn build(
        name: String,
        title: &str,
        descriptor: &StyleDescriptor,
        resolver: &StyleResolver,
    ) -> Option<Self> {
        let active = resolver.resolve(descriptor, ResolveOptions::default())?;
        let past = resolver.resolve(descriptor, ResolveOptions::MUTED)?;
        Some(Self {
            layer: VectorLayer::new(name, title).shared(),
            active,
            past,
            popup_anchor: descriptor.popup_anchor(),
        })
    }
}

/// Counts from one [`FeatureStore::upsert`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub added: usize,
    pub removed: usize,
    /// Items whose category has no layer
    pub skipped: usize,
}

/// Owns the per-category layers and turns items into features
pub struct FeatureStore {
    layers: Vec<SharedLayer>,
    routes: HashMap<(CategoryId, Option<CategoryId>), Route>,
    home_country: String,
}

impl FeatureStore {
    /// Build the layers for every category with a renderable style
    ///
    /// A subcategory gets its own layer when it has a style of its own,
    /// otherwise its items share the parent category's layer and style.
    pub fn new(config: &MapConfig, resolver: &StyleResolver) -> Self {
        let mut layers = Vec::new();
        let mut routes = HashMap::new();

        for category in &config.categories {
            let Some(parent) = Route::build(
                category.id.to_string(),
                &category.label,
                &category.style,
                resolver,
            ) else {
                warn!(category = %category.id, "Category has no renderable style, its items will be skipped");
                continue;
            };
            layers.push(parent.layer.clone());

            for sub in &category.subcategories {
                let own = if sub.style.is_empty() {
                    None
                } else {
                    let route = Route::build(
                        format!("{}/{}", category.id, sub.id),
                        &sub.label,
                        &sub.style,
                        resolver,
                    );
                    if route.is_none() {
                        warn!(category = %category.id, subcategory = %sub.id, "Subcategory style is incomplete, using parent style");
                    }
                    route
                };

                let route = match own {
                    Some(route) => {
                        layers.push(route.layer.clone());
                        route
                    }
                    None => parent.clone(),
                };
                routes.insert((category.id.clone(), Some(sub.id.clone())), route);
            }

            routes.insert((category.id.clone(), None), parent);
        }

        debug!(layers = layers.len(), "Feature store ready");

        Self {
            layers,
            routes,
            home_country: config.home_country.clone(),
        }
    }

    /// Add or remove features for `items`
    ///
    /// With `active_only`, inactive items located in the home country are
    /// removed instead of added. Adding an id that is already present and
    /// removing an absent one are both no-ops.
    pub fn upsert(&self, items: &[MapItem], active_only: bool) -> UpsertSummary {
        self.upsert_at(items, active_only, Utc::now())
    }

    /// [`FeatureStore::upsert`] with an explicit clock for the past/active style choice
    pub fn upsert_at(&self, items: &[MapItem], active_only: bool, now: DateTime<Utc>) -> UpsertSummary {
        let mut summary = UpsertSummary::default();

        for item in items {
            let Some(route) = self.route(item) else {
                debug!(id = %item.id, category = %item.category, "No layer for item category");
                summary.skipped += 1;
                continue;
            };

            let hidden =
                active_only && !item.is_active && item.is_in_country(&self.home_country);

            let mut layer = route.layer.write();
            if hidden {
                if layer.remove(&item.id) {
                    summary.removed += 1;
                }
                continue;
            }

            if layer.contains(&item.id) {
                continue;
            }

            let style = if item.is_past(now) {
                route.past.clone()
            } else {
                route.active.clone()
            };

            let mut feature = Feature::point(item.id.clone(), project(item.coordinates), style)
                .with_label(item.name.clone());
            if let Some(html) = &item.popup {
                feature = feature.with_popup(PopupContent {
                    html: html.clone(),
                    anchor: route.popup_anchor,
                });
            }

            if layer.insert(feature) {
                summary.added += 1;
            }
        }

        info!(
            added = summary.added,
            removed = summary.removed,
            skipped = summary.skipped,
            active_only,
            "Updated features"
        );
        summary
    }

    fn route(&self, item: &MapItem) -> Option<&Route> {
        let category = item.category.clone();
        item.subcategory
            .as_ref()
            .and_then(|sub| self.routes.get(&(category.clone(), Some(sub.clone()))))
            .or_else(|| self.routes.get(&(category, None)))
    }

    /// Layers in category order, for registration with the canvas
    pub fn list_layers(&self) -> Vec<SharedLayer> {
        self.layers.clone()
    }

    /// Total number of features across layers
    pub fn feature_count(&self) -> usize {
        self.layers.iter().map(|l| l.read().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::item::tests::item_at;
    use crate::style::{StyleLayer, MUTED_COLOR};

    fn store() -> FeatureStore {
        FeatureStore::new(&MapConfig::builtin(), &StyleResolver::default())
    }

    fn layer_names(store: &FeatureStore) -> Vec<String> {
        store
            .list_layers()
            .iter()
            .map(|l| l.read().name().to_string())
            .collect()
    }

    #[test]
    fn test_layers_follow_category_order() {
        assert_eq!(
            layer_names(&store()),
            ["people", "groups", "groups/B", "groups/F", "events", "events/M", "events/O"]
        );
    }

    #[test]
    fn test_upsert_twice_is_idempotent() {
        let store = store();
        let items = vec![
            item_at("1", 2.35, 48.86),
            item_at("2", 4.83, 45.76),
            item_at("3", 5.37, 43.29),
        ];

        let first = store.upsert(&items, false);
        assert_eq!(first.added, 3);
        let count = store.feature_count();

        let second = store.upsert(&items, false);
        assert_eq!(second.added, 0);
        assert_eq!(store.feature_count(), count);
    }

    #[test]
    fn test_active_filter_hides_domestic_inactive_only() {
        let store = store();
        let mut domestic = item_at("1", 2.35, 48.86);
        domestic.is_active = false;
        let mut foreign = item_at("2", 4.35, 50.85);
        foreign.is_active = false;
        foreign.location_country = Some("BE".to_string());
        let items = vec![domestic, foreign, item_at("3", 1.44, 43.60)];

        store.upsert(&items, false);
        assert_eq!(store.feature_count(), 3);

        let summary = store.upsert(&items, true);
        assert_eq!(summary.removed, 1);
        assert_eq!(store.feature_count(), 2);

        // Removing again is a no-op
        assert_eq!(store.upsert(&items, true).removed, 0);

        // Turning the filter off brings the item back
        assert_eq!(store.upsert(&items, false).added, 1);
        assert_eq!(store.feature_count(), 3);
    }

    #[test]
    fn test_unknown_category_is_skipped() {
        let store = store();
        let mut item = item_at("1", 2.35, 48.86);
        item.category = CategoryId::new("petitions");

        let summary = store.upsert(&[item], false);
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.feature_count(), 0);
    }

    #[test]
    fn test_subcategory_routing() {
        let store = store();

        let mut thematic = item_at("t", 2.0, 48.0);
        thematic.subcategory = Some(CategoryId::new("B"));
        let mut local = item_at("l", 3.0, 48.0);
        local.subcategory = Some(CategoryId::new("L"));
        let mut unknown_sub = item_at("u", 4.0, 48.0);
        unknown_sub.subcategory = Some(CategoryId::new("Z"));

        store.upsert(&[thematic, local, unknown_sub], false);

        let layers = store.list_layers();
        let groups = layers.iter().find(|l| l.read().name() == "groups").unwrap();
        let thematic_layer = layers.iter().find(|l| l.read().name() == "groups/B").unwrap();

        assert!(thematic_layer.read().contains("t"));
        assert!(groups.read().contains("l"));
        assert!(groups.read().contains("u"));
        assert_eq!(groups.read().len(), 2);
    }

    #[test]
    fn test_past_items_get_muted_style() {
        let store = store();
        let now = Utc::now();

        let mut past = item_at("past", 2.0, 48.0);
        past.category = CategoryId::new("events");
        past.end_time = Some(now - Duration::days(1));
        let mut upcoming = item_at("upcoming", 3.0, 48.0);
        upcoming.category = CategoryId::new("events");
        upcoming.end_time = Some(now + Duration::days(1));

        store.upsert_at(&[past, upcoming], false, now);

        let layers = store.list_layers();
        let events = layers.iter().find(|l| l.read().name() == "events").unwrap();
        let events = events.read();

        let past_fill = &events.get("past").unwrap().style.layers()[0];
        let upcoming_fill = &events.get("upcoming").unwrap().style.layers()[0];
        assert!(matches!(past_fill, StyleLayer::Badge { fill: MUTED_COLOR, .. }));
        assert!(!matches!(upcoming_fill, StyleLayer::Badge { fill: MUTED_COLOR, .. }));
    }

    #[test]
    fn test_popup_payload_attached() {
        let store = store();
        store.upsert(&[item_at("1", 2.0, 48.0)], false);

        let layers = store.list_layers();
        let groups = layers.iter().find(|l| l.read().name() == "groups").unwrap();
        let groups = groups.read();
        let popup = groups.get("1").unwrap().popup.clone().unwrap();

        assert_eq!(popup.html, "<p>item 1</p>");
        assert_eq!(popup.anchor, -crate::style::BADGE_RADIUS);
    }
}
