use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::ConfigError;
use crate::map::BaseDetail;

#[derive(Parser, Debug, Clone)]
#[command(name = "mappr")]
#[command(about = "Browse people, groups and actions on a terminal map")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Category config file (defaults to the user config, then built-in)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Nominatim-compatible search endpoint
    #[arg(long, global = true)]
    pub geocoder_url: Option<String>,

    /// JSON file mapping icon names to glyphs
    #[arg(long, global = true)]
    pub glyphs: Option<PathBuf>,

    /// How long to wait for the glyph file before using fallback glyphs (ms)
    #[arg(long, global = true, default_value = "2000")]
    pub glyph_timeout_ms: u64,

    /// Coastline detail of the base layer
    #[arg(long, global = true, value_enum, default_value_t = BaseDetail::High)]
    pub base_detail: BaseDetail,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Items from a feed, one layer per category
    List(ListArgs),
    /// A single marker at a fixed position
    Marker(MarkerArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ListArgs {
    /// URL returning a JSON array of items
    #[arg(long)]
    pub endpoint: String,

    /// Initial view as min_lon,min_lat,max_lon,max_lat
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<[f64; 4]>,

    /// GeoJSON polygon to highlight and fit the view to
    #[arg(long)]
    pub focus: Option<PathBuf>,

    /// Hide the address search box
    #[arg(long)]
    pub no_search: bool,

    /// Hide the "active only" checkbox
    #[arg(long)]
    pub no_active_toggle: bool,

    /// Hide the layer panel
    #[arg(long)]
    pub no_layers: bool,

    /// Start with inactive domestic items hidden
    #[arg(long)]
    pub active_only: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct MarkerArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Category whose style the marker uses
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long, default_value = "14")]
    pub zoom: f64,

    /// Text shown when the marker is clicked
    #[arg(long)]
    pub popup: Option<String>,
}

/// Parse `min_lon,min_lat,max_lon,max_lat`
pub fn parse_bbox(s: &str) -> Result<[f64; 4], ConfigError> {
    let values = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::BoundingBox(format!("{s}: {e}")))?;

    let bbox: [f64; 4] = values
        .try_into()
        .map_err(|_| ConfigError::BoundingBox(format!("{s}: expected four numbers")))?;

    if bbox.iter().any(|v| !v.is_finite()) {
        return Err(ConfigError::BoundingBox(format!("{s}: values must be finite")));
    }
    Ok(bbox)
}
