use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::geo::LonLat;

/// Identifier of a category or subcategory
///
/// Feeds send these as strings or integers; both normalize to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(pub String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CategoryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(CategoryId)
    }
}

/// A geolocated item supplied by the host page (person, group, action)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapItem {
    /// Unique within its category
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub coordinates: LonLat,
    #[serde(alias = "type")]
    pub category: CategoryId,
    #[serde(default, alias = "subtype")]
    pub subcategory: Option<CategoryId>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub location_country: Option<String>,
    /// Set for time-bound items (actions)
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Pre-rendered popup markup, injected verbatim
    #[serde(default)]
    pub popup: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl MapItem {
    /// Whether the item is time-bound and already over
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.end_time.is_some_and(|end| end < now)
    }

    /// Whether the item is located in the given country (ISO code, case-insensitive)
    pub fn is_in_country(&self, country: &str) -> bool {
        self.location_country
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(country))
    }
}

const fn default_active() -> bool {
    true
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Uint(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Uint(n) => n.to_string(),
    })
}
