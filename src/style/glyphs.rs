use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::AssetError;

/// Glyph drawn when an icon name is unknown
pub const FALLBACK_GLYPH: char = '●';

const BUILTIN: &[(&str, char)] = &[
    ("user", '☺'),
    ("users", '♟'),
    ("calendar", '▣'),
    ("bullhorn", '◈'),
    ("book", '¶'),
    ("cog", '⚙'),
    ("flag", '⚑'),
    ("home", '⌂'),
    ("star", '★'),
    ("map-marker", '◉'),
];

/// Icon name to terminal glyph lookup
#[derive(Debug, Clone)]
pub struct GlyphTable {
    glyphs: HashMap<String, char>,
}

impl GlyphTable {
    /// Table covering the icons used by the default categories
    pub fn builtin() -> Self {
        Self {
            glyphs: BUILTIN
                .iter()
                .map(|(name, glyph)| (name.to_string(), *glyph))
                .collect(),
        }
    }

    /// Glyph for an icon name, [`FALLBACK_GLYPH`] when unknown
    pub fn glyph(&self, icon_name: &str) -> char {
        self.glyphs
            .get(icon_name)
            .copied()
            .unwrap_or(FALLBACK_GLYPH)
    }

    /// Merge a `{"name": "glyph"}` JSON object into the table
    ///
    /// Returns the number of entries added or replaced. Empty strings are skipped.
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize, AssetError> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        let mut count = 0;
        for (name, value) in raw {
            if let Some(glyph) = value.chars().next() {
                self.glyphs.insert(name, glyph);
                count += 1;
            }
        }
        Ok(count)
    }

    /// Wait for a glyph file to be ready, giving up after `timeout`
    ///
    /// Any failure is logged and the built-in table is returned, so
    /// rendering can proceed with fallback glyphs.
    pub async fn load(path: &Path, timeout: Duration) -> Self {
        let mut table = Self::builtin();

        let result = match tokio::time::timeout(timeout, tokio::fs::read_to_string(path)).await {
            Ok(Ok(json)) => table.extend_from_json(&json),
            Ok(Err(e)) => Err(AssetError::Io(e)),
            Err(_) => Err(AssetError::Timeout(timeout)),
        };

        match result {
            Ok(count) => debug!(path = ?path, count, "Loaded glyphs"),
            Err(e) => warn!(path = ?path, error = %e, "Glyphs not ready, using fallback glyphs"),
        }

        table
    }
}

impl Default for GlyphTable {
    fn default() -> Self {
        Self::builtin()
    }
}
