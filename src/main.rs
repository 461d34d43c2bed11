mod app;
mod assembly;
mod cli;
mod config;
mod controls;
mod display;
mod error;
mod feed;
mod geo;
mod geocoder;
mod item;
mod map;
mod style;
mod tui;

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::app::AppState;
use crate::assembly::{
    list_map, parse_focus, single_marker_map, ListMapOptions, ListMapServices, MapView, SingleMarkerOptions,
};
use crate::cli::{Args, Command, ListArgs, MarkerArgs};
use crate::config::MapConfig;
use crate::error::{ConfigError, Result};
use crate::feed::FeedClient;
use crate::geo::LonLat;
use crate::geocoder::{CachedGeocoder, Geocoder, NominatimGeocoder};
use crate::item::CategoryId;
use crate::style::{GlyphTable, StyleDescriptor, StyleResolver};
use crate::tui::TuiApp;

const USER_AGENT: &str = concat!("mappr/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The terminal belongs to the UI, so logs go to a file
    init_tracing(args.verbose);

    info!("mappr v{} starting", env!("CARGO_PKG_VERSION"));

    let state = AppState::new();

    // Set up graceful shutdown
    let shutdown_state = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Received Ctrl-C, shutting down...");
        shutdown_state.quit();
    });

    if let Err(e) = run(state, args).await {
        error!("Application error: {}", e);
        return Err(e);
    }

    info!("mappr shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact();

    match open_log_file() {
        Some(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
}

/// `<cache_dir>/mappr/mappr.log`, opened for appending
fn open_log_file() -> Option<File> {
    let dir = dirs::cache_dir()?.join("mappr");
    fs::create_dir_all(&dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("mappr.log"))
        .ok()
}

/// Main application loop
async fn run(state: Arc<AppState>, args: Args) -> Result<()> {
    let config = MapConfig::load(args.config.as_deref())?;
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?;

    // Search tasks report back to this loop
    let (search_tx, mut search_rx) = mpsc::channel(16);

    let mut view = match &args.command {
        Command::List(list) => {
            let glyphs = match &args.glyphs {
                Some(path) => GlyphTable::load(path, glyph_timeout(&args)).await,
                None => GlyphTable::builtin(),
            };
            let resolver = StyleResolver::new(glyphs);
            let feed = FeedClient::new(client.clone());
            let geocoder: Arc<dyn Geocoder> = Arc::new(CachedGeocoder::new(NominatimGeocoder::new(
                client,
                args.geocoder_url.clone(),
                Some(config.home_country.clone()),
            )));

            list_map(
                list_options(list)?,
                ListMapServices {
                    config: &config,
                    resolver: &resolver,
                    feed: &feed,
                    geocoder,
                    search_events: search_tx,
                },
            )
            .await
        }
        Command::Marker(marker) => marker_view(&config, &args, marker).await,
    };
    view.canvas_mut().set_base_detail(args.base_detail);

    let mut tui = TuiApp::new(Arc::clone(&state), view)?;

    info!("TUI started - press 'q' to quit");

    loop {
        let should_quit = tui.handle_input().await?;
        if should_quit || state.is_quitting() {
            break;
        }

        while let Ok(msg) = search_rx.try_recv() {
            tui.on_search_message(msg);
        }

        tui.draw()?;

        // Small delay to prevent busy loop
        tokio::time::sleep(Duration::from_millis(16)).await;
    }

    tui.cleanup();
    Ok(())
}

fn glyph_timeout(args: &Args) -> Duration {
    Duration::from_millis(args.glyph_timeout_ms)
}

fn list_options(list: &ListArgs) -> std::result::Result<ListMapOptions, ConfigError> {
    let focus = list.focus.as_deref().map(read_focus).transpose()?;
    info!(
        endpoint = %list.endpoint,
        bbox = ?list.bbox,
        focus = focus.is_some(),
        "Starting list map"
    );

    Ok(ListMapOptions {
        endpoint: list.endpoint.clone(),
        bbox: list.bbox,
        focus,
        search: !list.no_search,
        active_toggle: !list.no_active_toggle,
        layer_control: !list.no_layers,
        active_only: list.active_only,
    })
}

fn read_focus(path: &Path) -> std::result::Result<geojson::Geometry, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_focus(&text)
}

async fn marker_view(config: &MapConfig, args: &Args, marker: &MarkerArgs) -> MapView {
    let style = marker
        .category
        .as_deref()
        .and_then(|id| match config.category(&CategoryId::new(id)) {
            Some(category) => Some(category.style.clone()),
            None => {
                warn!(category = id, "Unknown category, using the default marker");
                None
            }
        })
        .unwrap_or_else(|| StyleDescriptor::badge("#e14b35", "map-marker"));

    single_marker_map(SingleMarkerOptions {
        position: LonLat::new(marker.lon, marker.lat),
        style,
        zoom: marker.zoom,
        glyphs: args.glyphs.clone(),
        glyph_timeout: glyph_timeout(args),
        popup: marker.popup.clone(),
    })
    .await
}
