mod animation;
mod collision;
mod layer;
mod render;
mod tile_config;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::atlas::TileAtlas;
use crate::geometry::{Rect, Vec2};
use crate::surface::Surface;

pub use collision::{Collision, Contact};
pub use layer::{TileLayer, TileLayerConfig};
pub use render::{visible_tile_range, RenderStats, TileRange};
pub use tile_config::{TileConfig, TileId};

use animation::AnimationClock;
use collision::{select_contact, solid_contacts};
use render::{build_chunk, draw_layer, pixel_shift, CompositeContext, LayerView};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("tile ({x}, {y}) is outside the {width}x{height} layer")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    #[error("layer '{name}' already exists")]
    DuplicateLayer { name: String },
    #[error("layer '{name}' does not exist")]
    MissingLayer { name: String },
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("invalid config for tile {tile_id}: {reason}")]
    InvalidTileConfig { tile_id: TileId, reason: String },
}

/// Layered tile grid with per-id behavior, a shared animation clock and an
/// optional collision layer.
///
/// Coordinates are world pixels with the origin at the top-left of cell
/// `(0, 0)` and y growing downward. Cell `(x, y)` covers
/// `[x * tile_width, (x + 1) * tile_width) x [y * tile_height, (y + 1) * tile_height)`.
pub struct Tilemap {
    tile_width: u32,
    tile_height: u32,
    tileset: Arc<dyn TileAtlas>,
    layers: HashMap<String, TileLayer>,
    tile_configs: HashMap<TileId, TileConfig>,
    clock: AnimationClock,
    collision_layer: Option<String>,
    warned_missing_tiles: HashSet<TileId>,
}

impl Tilemap {
    pub fn new(
        tile_width: u32,
        tile_height: u32,
        tileset: Arc<dyn TileAtlas>,
    ) -> Result<Self, TilemapError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(TilemapError::InvalidDimensions {
                width: tile_width,
                height: tile_height,
            });
        }
        Ok(Self {
            tile_width,
            tile_height,
            tileset,
            layers: HashMap::new(),
            tile_configs: HashMap::new(),
            clock: AnimationClock::default(),
            collision_layer: None,
            warned_missing_tiles: HashSet::new(),
        })
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Widest layer in tiles, 0 without layers.
    pub fn width(&self) -> u32 {
        self.layers.values().map(TileLayer::width).max().unwrap_or(0)
    }

    /// Tallest layer in tiles, 0 without layers.
    pub fn height(&self) -> u32 {
        self.layers.values().map(TileLayer::height).max().unwrap_or(0)
    }

    pub fn add_layer(
        &mut self,
        name: impl Into<String>,
        width: u32,
        height: u32,
        config: Option<TileLayerConfig>,
    ) -> Result<&mut TileLayer, TilemapError> {
        let name = name.into();
        let pixel_size_fits = width.checked_mul(self.tile_width).is_some()
            && height.checked_mul(self.tile_height).is_some();
        if !pixel_size_fits {
            return Err(TilemapError::InvalidDimensions { width, height });
        }
        let entry = match self.layers.entry(name) {
            Entry::Occupied(entry) => {
                return Err(TilemapError::DuplicateLayer {
                    name: entry.key().clone(),
                })
            }
            Entry::Vacant(entry) => entry,
        };
        let layer = TileLayer::new(width, height)?.with_config(config.unwrap_or_default());
        debug!(
            layer = %entry.key(),
            width,
            height,
            z_index = layer.config().z_index,
            "layer_added"
        );
        Ok(entry.insert(layer))
    }

    /// Removes a layer. Removing the collision layer clears the designation.
    pub fn remove_layer(&mut self, name: &str) -> Result<TileLayer, TilemapError> {
        let layer = self
            .layers
            .remove(name)
            .ok_or_else(|| missing_layer(name))?;
        if self.collision_layer.as_deref() == Some(name) {
            self.collision_layer = None;
            debug!(layer = name, "collision_layer_cleared");
        }
        debug!(layer = name, "layer_removed");
        Ok(layer)
    }

    pub fn get_layer(&self, name: &str) -> Result<&TileLayer, TilemapError> {
        self.layers.get(name).ok_or_else(|| missing_layer(name))
    }

    pub fn get_layer_mut(&mut self, name: &str) -> Result<&mut TileLayer, TilemapError> {
        self.layers.get_mut(name).ok_or_else(|| missing_layer(name))
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    /// Layer names in render order: ascending `z_index`, then name.
    pub fn layer_names(&self) -> Vec<&str> {
        let mut entries: Vec<(&String, &TileLayer)> = self.layers.iter().collect();
        entries.sort_by(|a, b| render_order(*a, *b));
        entries.into_iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Registers behavior for `tile_id`. Every layer is recomposited on the
    /// next render since the config can change what a cell draws.
    pub fn set_tile_config(
        &mut self,
        tile_id: TileId,
        config: TileConfig,
    ) -> Result<(), TilemapError> {
        if let Some(reason) = config.validation_error() {
            return Err(TilemapError::InvalidTileConfig {
                tile_id,
                reason: reason.to_string(),
            });
        }
        debug!(
            tile_id,
            solid = config.solid,
            animated = config.animated,
            frames = config.frames.len(),
            "tile_config_set"
        );
        self.tile_configs.insert(tile_id, config);
        self.tile_configs_changed();
        Ok(())
    }

    pub fn get_tile_config(&self, tile_id: TileId) -> Option<&TileConfig> {
        self.tile_configs.get(&tile_id)
    }

    pub fn remove_tile_config(&mut self, tile_id: TileId) -> Option<TileConfig> {
        let removed = self.tile_configs.remove(&tile_id)?;
        debug!(tile_id, "tile_config_removed");
        self.tile_configs_changed();
        Some(removed)
    }

    pub fn set_collision_layer(&mut self, name: &str) -> Result<(), TilemapError> {
        if !self.layers.contains_key(name) {
            return Err(missing_layer(name));
        }
        self.collision_layer = Some(name.to_string());
        debug!(layer = name, "collision_layer_set");
        Ok(())
    }

    pub fn collision_layer(&self) -> Option<&str> {
        self.collision_layer.as_deref()
    }

    pub fn clear_collision_layer(&mut self) {
        self.collision_layer = None;
    }

    /// Advances the animation clock by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        self.clock.advance(dt);
    }

    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    pub fn set_time(&mut self, time: f64) {
        self.clock.set_time(time);
    }

    /// Id drawn for `tile_id` at the current time.
    pub fn displayed_tile_id(&self, tile_id: TileId) -> TileId {
        self.tile_configs
            .get(&tile_id)
            .and_then(|config| config.frame_at(self.clock.time()))
            .unwrap_or(tile_id)
    }

    /// Tiles of the whole map seen from a camera at `(camera_x, camera_y)`
    /// through a `viewport_width` x `viewport_height` viewport, ignoring
    /// per-layer scroll factors.
    pub fn visible_range(
        &self,
        camera_x: f32,
        camera_y: f32,
        viewport_width: u32,
        viewport_height: u32,
    ) -> TileRange {
        visible_tile_range(
            camera_x,
            camera_y,
            viewport_width,
            viewport_height,
            (self.tile_width, self.tile_height),
            (self.width(), self.height()),
        )
    }

    /// Composites every visible layer onto `target`, whose size is the
    /// viewport. The target is drawn over, not cleared.
    ///
    /// Each layer caches only the chunks overlapping its visible range, so
    /// memory and rebuild work follow the viewport rather than the map size.
    pub fn render(&mut self, target: &mut Surface, camera_x: f32, camera_y: f32) -> RenderStats {
        let mut stats = RenderStats::default();
        let ctx = CompositeContext {
            atlas: self.tileset.as_ref(),
            tile_width: self.tile_width,
            tile_height: self.tile_height,
            configs: &self.tile_configs,
            time: self.clock.time(),
        };
        let warned = &mut self.warned_missing_tiles;

        let mut layers: Vec<(&String, &mut TileLayer)> = self
            .layers
            .iter_mut()
            .filter(|(_, layer)| layer.config().visible)
            .collect();
        layers.sort_by(|a, b| render_order((a.0, &*a.1), (b.0, &*b.1)));

        for (name, layer) in layers {
            let config = *layer.config();
            let offset_x = camera_x * config.scroll_factor_x;
            let offset_y = camera_y * config.scroll_factor_y;
            let range = visible_tile_range(
                offset_x,
                offset_y,
                target.width(),
                target.height(),
                (ctx.tile_width, ctx.tile_height),
                (layer.width(), layer.height()),
            );
            if range.is_empty() || config.opacity == 0 {
                continue;
            }

            let view = LayerView {
                range,
                shift: (
                    pixel_shift(camera_x, config.scroll_factor_x),
                    pixel_shift(camera_y, config.scroll_factor_y),
                ),
                opacity: config.opacity,
            };
            let (cache, built) = layer.cache_for_range(range, |layer, tiles| {
                build_chunk(layer, tiles, &ctx, &mut *warned)
            });
            if built > 0 {
                stats.cache_rebuilds += built;
                debug!(
                    layer = %name,
                    chunks_built = built,
                    chunks_cached = cache.chunks.len(),
                    "layer_cache_rebuilt"
                );
            }
            draw_layer(target, cache, view, &ctx, &mut *warned, &mut stats);
            stats.layers_drawn += 1;
        }
        stats
    }

    /// Every solid tile of the collision layer strictly overlapping `rect`,
    /// in row-major order.
    pub fn contacts_in_rect(&self, rect: &Rect) -> Vec<Contact> {
        let Some(layer) = self.collision_tile_layer() else {
            return Vec::new();
        };
        solid_contacts(
            layer,
            self.tile_width,
            self.tile_height,
            &self.tile_configs,
            rect,
        )
    }

    /// World rect and outward normal of each solid tile overlapping `rect`.
    pub fn get_solid_tiles_in_rect(&self, rect: &Rect) -> Vec<(Rect, Vec2)> {
        self.contacts_in_rect(rect)
            .into_iter()
            .map(|contact| (contact.tile_rect, contact.normal))
            .collect()
    }

    /// Collision-layer tile under a world position, with the layer name.
    /// `(None, "")` without a collision layer or outside it.
    pub fn get_tile_at_position(&self, world_x: f32, world_y: f32) -> (Option<TileId>, &str) {
        let (Some(name), Some(layer)) = (
            self.collision_layer.as_deref(),
            self.collision_tile_layer(),
        ) else {
            return (None, "");
        };
        let tile_x = (world_x as f64 / self.tile_width as f64).floor();
        let tile_y = (world_y as f64 / self.tile_height as f64).floor();
        let inside = tile_x >= 0.0
            && tile_y >= 0.0
            && tile_x < layer.width() as f64
            && tile_y < layer.height() as f64;
        if !inside {
            return (None, "");
        }
        (layer.tile_at(tile_x as u32, tile_y as u32), name)
    }

    /// Minimum translation separating `rect` from the collision layer's solid
    /// tiles, one tile per call.
    pub fn check_collision(&self, rect: &Rect) -> Option<Collision> {
        let contacts = self.contacts_in_rect(rect);
        select_contact(&contacts).map(Contact::collision)
    }

    /// Repeats `check_collision` and applies each correction until `rect` is
    /// free or `max_iterations` corrections were made. Returns the moved rect
    /// and the accumulated offset.
    pub fn resolve_rect(&self, rect: Rect, max_iterations: u32) -> (Rect, Vec2) {
        let mut current = rect;
        let mut total = Vec2::ZERO;
        for _ in 0..max_iterations {
            let Some(collision) = self.check_collision(&current) else {
                break;
            };
            let correction = collision.normal * collision.penetration;
            current = current.translated(correction);
            total += correction;
        }
        (current, total)
    }

    fn collision_tile_layer(&self) -> Option<&TileLayer> {
        self.collision_layer
            .as_deref()
            .and_then(|name| self.layers.get(name))
    }

    fn tile_configs_changed(&mut self) {
        self.clock.recompute_wrap_cycle(&self.tile_configs);
        debug!(wrap_cycle = ?self.clock.wrap_cycle(), "animation_wrap_recomputed");
        for layer in self.layers.values_mut() {
            layer.invalidate();
        }
    }
}

fn render_order(a: (&String, &TileLayer), b: (&String, &TileLayer)) -> std::cmp::Ordering {
    a.1.config()
        .z_index
        .cmp(&b.1.config().z_index)
        .then_with(|| a.0.cmp(b.0))
}

fn missing_layer(name: &str) -> TilemapError {
    TilemapError::MissingLayer {
        name: name.to_string(),
    }
}
