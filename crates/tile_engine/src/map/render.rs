use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::atlas::TileAtlas;
use crate::surface::{PixelRect, Surface};

use super::layer::{AnimatedCell, CacheChunk, CellState, LayerCache, TileLayer};
use super::tile_config::{TileConfig, TileId};

/// Half-open window of tile indices: `[x_start, x_end) x [y_start, y_end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileRange {
    pub x_start: u32,
    pub y_start: u32,
    pub x_end: u32,
    pub y_end: u32,
}

impl TileRange {
    pub fn is_empty(&self) -> bool {
        self.x_start >= self.x_end || self.y_start >= self.y_end
    }

    pub fn columns(&self) -> u32 {
        self.x_end.saturating_sub(self.x_start)
    }

    pub fn rows(&self) -> u32 {
        self.y_end.saturating_sub(self.y_start)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.x_start..self.x_end).contains(&x) && (self.y_start..self.y_end).contains(&y)
    }

    pub fn intersection(&self, other: &TileRange) -> Option<TileRange> {
        let overlap = TileRange {
            x_start: self.x_start.max(other.x_start),
            y_start: self.y_start.max(other.y_start),
            x_end: self.x_end.min(other.x_end),
            y_end: self.y_end.min(other.y_end),
        };
        (!overlap.is_empty()).then_some(overlap)
    }

    /// Row-major iteration over the covered cells.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> {
        let (x_start, x_end) = (self.x_start, self.x_end);
        (self.y_start..self.y_end).flat_map(move |y| (x_start..x_end).map(move |x| (x, y)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub layers_drawn: u32,
    pub tiles_drawn: u32,
    pub tiles_skipped: u32,
    /// Cache chunks composited this frame.
    pub cache_rebuilds: u32,
}

/// Tiles overlapped by the pixel span `[start, end)` along one axis, clamped to
/// `[0, count)`. Non-finite input yields an empty span.
pub(crate) fn overlapped_span(start: f32, end: f32, tile_size: u32, count: u32) -> (u32, u32) {
    if !start.is_finite() || !end.is_finite() || tile_size == 0 {
        return (0, 0);
    }
    let tile = tile_size as f64;
    let first = (start as f64 / tile).floor().clamp(0.0, count as f64) as u32;
    let last = (end as f64 / tile).ceil().clamp(0.0, count as f64) as u32;
    (first, last.max(first))
}

/// Tile window seen by a `viewport_width` x `viewport_height` viewport whose
/// top-left corner sits at the (already parallax-scaled) pixel offset.
pub fn visible_tile_range(
    offset_x: f32,
    offset_y: f32,
    viewport_width: u32,
    viewport_height: u32,
    tile_size: (u32, u32),
    grid_size: (u32, u32),
) -> TileRange {
    let (x_start, x_end) = overlapped_span(
        offset_x,
        offset_x + viewport_width as f32,
        tile_size.0,
        grid_size.0,
    );
    let (y_start, y_end) = overlapped_span(
        offset_y,
        offset_y + viewport_height as f32,
        tile_size.1,
        grid_size.1,
    );
    TileRange {
        x_start,
        y_start,
        x_end,
        y_end,
    }
}

/// Shared inputs for compositing one map's layers.
pub(crate) struct CompositeContext<'a> {
    pub(crate) atlas: &'a dyn TileAtlas,
    pub(crate) tile_width: u32,
    pub(crate) tile_height: u32,
    pub(crate) configs: &'a HashMap<TileId, TileConfig>,
    pub(crate) time: f64,
}

impl CompositeContext<'_> {
    fn displayed_id(&self, tile_id: TileId) -> TileId {
        self.configs
            .get(&tile_id)
            .and_then(|config| config.frame_at(self.time))
            .unwrap_or(tile_id)
    }
}

/// Pre-blits the static cells of `layer` inside `tiles` at native resolution.
/// Animated cells are only recorded; their pixels depend on the clock.
pub(crate) fn build_chunk(
    layer: &TileLayer,
    tiles: TileRange,
    ctx: &CompositeContext<'_>,
    warned_missing: &mut HashSet<TileId>,
) -> CacheChunk {
    let mut surface = Surface::new(
        tiles.columns() * ctx.tile_width,
        tiles.rows() * ctx.tile_height,
    );
    let mut cells = Vec::with_capacity(tiles.columns() as usize * tiles.rows() as usize);
    let mut animated_cells = Vec::new();

    for (x, y) in tiles.cells() {
        let Some(tile_id) = layer.tile_at(x, y) else {
            cells.push(CellState::Empty);
            continue;
        };
        let animated = ctx
            .configs
            .get(&tile_id)
            .is_some_and(|config| config.animated);
        if animated {
            animated_cells.push(AnimatedCell { x, y, tile_id });
            cells.push(CellState::Animated);
            continue;
        }
        match ctx.atlas.fetch_region(tile_id) {
            Some(region) => {
                surface.blit_region(
                    region.texture,
                    fit_region(region.source, ctx.tile_width, ctx.tile_height),
                    ((x - tiles.x_start) * ctx.tile_width) as i32,
                    ((y - tiles.y_start) * ctx.tile_height) as i32,
                    255,
                );
                cells.push(CellState::Drawn);
            }
            None => {
                warn_missing_tile_once(warned_missing, tile_id);
                cells.push(CellState::Missing);
            }
        }
    }

    CacheChunk {
        tiles,
        surface,
        cells,
        animated_cells,
    }
}

/// Where and how one layer lands on the target this frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LayerView {
    pub(crate) range: TileRange,
    /// Integer pixel translation `floor(-(camera * scroll_factor))`.
    pub(crate) shift: (i64, i64),
    pub(crate) opacity: u8,
}

/// Draws the part of each cached chunk inside the view's range, then the
/// chunk's animated cells in that part on top.
pub(crate) fn draw_layer(
    target: &mut Surface,
    cache: &LayerCache,
    view: LayerView,
    ctx: &CompositeContext<'_>,
    warned_missing: &mut HashSet<TileId>,
    stats: &mut RenderStats,
) {
    let (tw, th) = (ctx.tile_width, ctx.tile_height);
    for chunk in cache.chunks.values() {
        let Some(window) = chunk.tiles.intersection(&view.range) else {
            continue;
        };
        let source = PixelRect::new(
            (window.x_start - chunk.tiles.x_start) * tw,
            (window.y_start - chunk.tiles.y_start) * th,
            window.columns() * tw,
            window.rows() * th,
        );
        target.blit_region(
            &chunk.surface,
            source,
            screen_coord(window.x_start, tw, view.shift.0),
            screen_coord(window.y_start, th, view.shift.1),
            view.opacity,
        );

        for (x, y) in window.cells() {
            match chunk.cell(x, y) {
                Some(CellState::Drawn) => stats.tiles_drawn += 1,
                Some(CellState::Missing) => stats.tiles_skipped += 1,
                _ => {}
            }
        }

        for cell in chunk
            .animated_cells
            .iter()
            .filter(|cell| window.contains(cell.x, cell.y))
        {
            let displayed = ctx.displayed_id(cell.tile_id);
            let Some(region) = ctx.atlas.fetch_region(displayed) else {
                warn_missing_tile_once(warned_missing, displayed);
                stats.tiles_skipped += 1;
                continue;
            };
            target.blit_region(
                region.texture,
                fit_region(region.source, tw, th),
                screen_coord(cell.x, tw, view.shift.0),
                screen_coord(cell.y, th, view.shift.1),
                view.opacity,
            );
            stats.tiles_drawn += 1;
        }
    }
}

pub(crate) fn pixel_shift(camera: f32, scroll_factor: f32) -> i64 {
    let offset = camera * scroll_factor;
    if !offset.is_finite() {
        return 0;
    }
    (-(offset as f64)).floor() as i64
}

fn screen_coord(tile_index: u32, tile_size: u32, shift: i64) -> i32 {
    (tile_index as i64 * tile_size as i64 + shift).clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Atlas frames larger than a cell are cropped to the cell.
fn fit_region(source: PixelRect, tile_width: u32, tile_height: u32) -> PixelRect {
    PixelRect::new(
        source.x,
        source.y,
        source.width.min(tile_width),
        source.height.min(tile_height),
    )
}

fn warn_missing_tile_once(warned: &mut HashSet<TileId>, tile_id: TileId) {
    if !warned.insert(tile_id) {
        return;
    }
    warn!(tile_id, "tile_region_missing_skipped");
}
