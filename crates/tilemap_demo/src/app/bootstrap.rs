use std::sync::Arc;

use tile_engine::Tilemap;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{self, DemoConfig};
use super::loop_runner::DemoError;
use super::world;

pub(crate) struct AppWiring {
    pub(crate) config: DemoConfig,
    pub(crate) map: Tilemap,
}

pub(crate) fn build_app() -> Result<AppWiring, DemoError> {
    init_tracing();
    info!("=== Tilemap Demo Startup ===");

    let config = config::load_config()?;
    let output_dir = config
        .output_dir
        .as_deref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "off".to_string());
    info!(
        viewport_width = config.viewport_width,
        viewport_height = config.viewport_height,
        frame_count = config.frame_count,
        dt = config.fixed_dt_seconds,
        output_dir = %output_dir,
        "config_resolved"
    );
    wire(config)
}

pub(crate) fn wire(config: DemoConfig) -> Result<AppWiring, DemoError> {
    let tileset = Arc::new(world::build_tileset()?);
    let map = world::build_demo_map(tileset)?;
    Ok(AppWiring { config, map })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
