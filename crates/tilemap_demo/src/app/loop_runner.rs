use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use thiserror::Error;
use tile_engine::{
    AtlasError, PixelRect, Rect, Surface, SurfaceError, Tilemap, TilemapError, Vec2,
};
use tracing::{debug, error, info};

use super::bootstrap::AppWiring;
use super::config::{ConfigError, DemoConfig};
use super::physics::FallingBox;

const CLEAR_COLOR: [u8; 4] = [24, 28, 40, 255];
const BOX_COLOR: [u8; 4] = [230, 70, 70, 255];
const BOX_SIZE_PX: f32 = 20.0;
const RESPAWN_AFTER_GROUNDED_FRAMES: u32 = 45;
const STATS_LOG_INTERVAL_FRAMES: u32 = 60;

#[derive(Debug, Error)]
pub(crate) enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build tileset: {0}")]
    Atlas(#[from] AtlasError),
    #[error("failed to build tilemap: {0}")]
    Tilemap(#[from] TilemapError),
    #[error("failed to create output directory {path}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to export frame: {0}")]
    Export(#[from] SurfaceError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub(crate) frames: u32,
    pub(crate) frames_saved: u32,
    pub(crate) tiles_drawn: u64,
    pub(crate) tiles_skipped: u64,
    pub(crate) cache_rebuilds: u32,
    pub(crate) landings: u32,
}

pub(crate) fn run(mut app: AppWiring) -> ExitCode {
    match run_frames(&app.config, &mut app.map) {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                frames_saved = summary.frames_saved,
                tiles_drawn = summary.tiles_drawn,
                tiles_skipped = summary.tiles_skipped,
                cache_rebuilds = summary.cache_rebuilds,
                landings = summary.landings,
                "demo_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "demo_failed");
            ExitCode::FAILURE
        }
    }
}

/// Fixed-step headless loop: advance the clock, scroll the camera, step the
/// falling box, composite the frame and export every `png_every`-th frame.
pub(crate) fn run_frames(config: &DemoConfig, map: &mut Tilemap) -> Result<RunSummary, DemoError> {
    let export_dir = prepare_export_dir(config)?;
    let mut target = Surface::new(config.viewport_width, config.viewport_height);
    let mut camera = Camera::new(map, config);
    let dt = config.fixed_dt_seconds as f32;
    let mut falling = spawn_box(&camera, config);
    let mut grounded_frames = 0;
    let mut summary = RunSummary::default();

    info!(
        frames = config.frame_count,
        max_camera_x = camera.max_x,
        "demo_loop_started"
    );
    for frame in 0..config.frame_count {
        map.update(config.fixed_dt_seconds);
        camera.advance(dt);

        let outcome = falling.step(
            map,
            dt,
            config.gravity_px,
            config.max_resolve_iterations,
        );
        if outcome.grounded {
            if grounded_frames == 0 {
                summary.landings += 1;
                debug!(frame, x = falling.rect.x, y = falling.rect.y, "box_landed");
            }
            grounded_frames += 1;
        } else if falling.velocity.y != 0.0 {
            grounded_frames = 0;
        }
        if outcome.blocked_x {
            debug!(frame, velocity_x = falling.velocity.x, "box_bounced");
        }
        let off_screen = falling.rect.top() > camera.position.y + config.viewport_height as f32;
        if grounded_frames >= RESPAWN_AFTER_GROUNDED_FRAMES || off_screen {
            falling = spawn_box(&camera, config);
            grounded_frames = 0;
        }

        target.clear(CLEAR_COLOR);
        let stats = map.render(&mut target, camera.position.x, camera.position.y);
        draw_box(&mut target, falling.rect, camera.position);

        summary.frames += 1;
        summary.tiles_drawn += stats.tiles_drawn as u64;
        summary.tiles_skipped += stats.tiles_skipped as u64;
        summary.cache_rebuilds += stats.cache_rebuilds;
        if frame % STATS_LOG_INTERVAL_FRAMES == 0 {
            debug!(
                frame,
                camera_x = camera.position.x,
                layers_drawn = stats.layers_drawn,
                tiles_drawn = stats.tiles_drawn,
                cache_rebuilds = stats.cache_rebuilds,
                "frame_stats"
            );
        }

        if let Some(dir) = export_dir.as_deref() {
            if frame % config.png_every == 0 {
                let path = frame_path(dir, frame);
                target.save_png(&path)?;
                summary.frames_saved += 1;
                debug!(frame, path = %path.display(), "frame_exported");
            }
        }
    }
    Ok(summary)
}

fn prepare_export_dir(config: &DemoConfig) -> Result<Option<PathBuf>, DemoError> {
    let Some(dir) = config.output_dir.as_deref() else {
        return Ok(None);
    };
    if config.png_every == 0 {
        return Ok(None);
    }
    fs::create_dir_all(dir).map_err(|source| DemoError::CreateOutputDir {
        path: dir.to_path_buf(),
        source,
    })?;
    info!(path = %dir.display(), png_every = config.png_every, "frame_export_enabled");
    Ok(Some(dir.to_path_buf()))
}

/// Horizontal ping-pong scroll across the map, pinned to the bottom rows.
struct Camera {
    position: Vec2,
    max_x: f32,
    speed: f32,
}

impl Camera {
    fn new(map: &Tilemap, config: &DemoConfig) -> Self {
        let map_width_px = map.width() as f32 * map.tile_width() as f32;
        let map_height_px = map.height() as f32 * map.tile_height() as f32;
        Self {
            position: Vec2::new(
                0.0,
                (map_height_px - config.viewport_height as f32).max(0.0),
            ),
            max_x: (map_width_px - config.viewport_width as f32).max(0.0),
            speed: config.camera_speed_px,
        }
    }

    fn advance(&mut self, dt: f32) {
        self.position.x += self.speed * dt;
        if self.position.x >= self.max_x {
            self.position.x = self.max_x;
            self.speed = -self.speed.abs();
        } else if self.position.x <= 0.0 {
            self.position.x = 0.0;
            self.speed = self.speed.abs();
        }
    }
}

fn spawn_box(camera: &Camera, config: &DemoConfig) -> FallingBox {
    let x = camera.position.x + (config.viewport_width as f32 - BOX_SIZE_PX) * 0.5;
    FallingBox::new(
        Vec2::new(x, camera.position.y),
        BOX_SIZE_PX,
        Vec2::new(camera.speed * 0.5, 0.0),
    )
}

fn draw_box(target: &mut Surface, rect: Rect, camera: Vec2) {
    let left = (rect.left() - camera.x).floor().max(0.0);
    let top = (rect.top() - camera.y).floor().max(0.0);
    let right = (rect.right() - camera.x).ceil().min(target.width() as f32);
    let bottom = (rect.bottom() - camera.y).ceil().min(target.height() as f32);
    if !(right > left && bottom > top) {
        return;
    }
    target.fill_rect(
        PixelRect::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ),
        BOX_COLOR,
    );
}

fn frame_path(dir: &Path, frame: u32) -> PathBuf {
    dir.join(format!("frame_{frame:05}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::bootstrap::wire;
    use tempfile::TempDir;

    fn short_config(output_dir: Option<PathBuf>) -> DemoConfig {
        DemoConfig {
            frame_count: 5,
            png_every: 2,
            output_dir,
            ..DemoConfig::default()
        }
    }

    #[test]
    fn headless_run_exports_every_nth_frame() {
        let temp = TempDir::new().expect("temp");
        let out = temp.path().join("frames");
        let mut app = wire(short_config(Some(out.clone()))).expect("wire");

        let summary = run_frames(&app.config, &mut app.map).expect("run");
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.frames_saved, 3);
        for frame in [0, 2, 4] {
            assert!(frame_path(&out, frame).is_file(), "frame {frame}");
        }
        assert!(!frame_path(&out, 1).exists());

        let exported = Surface::open(&frame_path(&out, 0)).expect("open");
        assert_eq!(
            (exported.width(), exported.height()),
            (app.config.viewport_width, app.config.viewport_height)
        );
    }

    #[test]
    fn caches_are_built_once_per_layer() {
        let mut app = wire(short_config(None)).expect("wire");
        let summary = run_frames(&app.config, &mut app.map).expect("run");
        assert_eq!(summary.frames_saved, 0);
        assert_eq!(summary.cache_rebuilds, app.map.layer_count() as u32);
        assert!(summary.tiles_drawn > 0);
        assert_eq!(summary.tiles_skipped, 0);
    }

    #[test]
    fn zero_frames_do_nothing() {
        let mut app = wire(DemoConfig {
            frame_count: 0,
            ..DemoConfig::default()
        })
        .expect("wire");
        let summary = run_frames(&app.config, &mut app.map).expect("run");
        assert_eq!(summary, RunSummary::default());
    }

    #[test]
    fn camera_bounces_between_map_edges() {
        let app = wire(DemoConfig::default()).expect("wire");
        let mut camera = Camera::new(&app.map, &app.config);
        assert!(camera.max_x > 0.0);
        camera.position.x = camera.max_x - 1.0;
        camera.advance(1.0);
        assert_eq!(camera.position.x, camera.max_x);
        assert!(camera.speed < 0.0);
        camera.position.x = 1.0;
        camera.advance(1.0);
        assert_eq!(camera.position.x, 0.0);
        assert!(camera.speed > 0.0);
    }

    #[test]
    fn box_is_clipped_to_the_target() {
        let mut target = Surface::new(16, 16);
        draw_box(
            &mut target,
            Rect::new(-8.0, -8.0, 16.0, 16.0),
            Vec2::ZERO,
        );
        assert_eq!(target.pixel(0, 0), Some(BOX_COLOR));
        assert_eq!(target.pixel(7, 7), Some(BOX_COLOR));
        assert_eq!(target.pixel(8, 8), Some([0, 0, 0, 0]));
        draw_box(&mut target, Rect::new(100.0, 0.0, 16.0, 16.0), Vec2::ZERO);
    }
}
