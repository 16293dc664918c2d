use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::surface::Surface;

use super::render::TileRange;
use super::tile_config::TileId;
use super::TilemapError;

/// Side length, in tiles, of one cached chunk.
pub(crate) const CHUNK_TILES: u32 = 16;

/// Chunk column and row.
pub(crate) type ChunkKey = (u32, u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileLayerConfig {
    pub z_index: i32,
    pub scroll_factor_x: f32,
    pub scroll_factor_y: f32,
    pub opacity: u8,
    pub visible: bool,
}

impl Default for TileLayerConfig {
    fn default() -> Self {
        Self {
            z_index: 0,
            scroll_factor_x: 1.0,
            scroll_factor_y: 1.0,
            opacity: 255,
            visible: true,
        }
    }
}

/// Composited chunks of a layer, limited to the chunks the last render saw.
#[derive(Debug, Clone, Default)]
pub(crate) struct LayerCache {
    pub(crate) chunks: HashMap<ChunkKey, CacheChunk>,
}

/// Static cells of one chunk pre-blitted at native resolution, plus the cells
/// that must be redrawn every frame because their displayed id follows the clock.
#[derive(Debug, Clone)]
pub(crate) struct CacheChunk {
    pub(crate) tiles: TileRange,
    pub(crate) surface: Surface,
    /// Row-major over `tiles`.
    pub(crate) cells: Vec<CellState>,
    pub(crate) animated_cells: Vec<AnimatedCell>,
}

impl CacheChunk {
    pub(crate) fn cell(&self, x: u32, y: u32) -> Option<CellState> {
        if !self.tiles.contains(x, y) {
            return None;
        }
        let row = (y - self.tiles.y_start) as usize;
        let column = (x - self.tiles.x_start) as usize;
        self.cells
            .get(row * self.tiles.columns() as usize + column)
            .copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellState {
    Empty,
    Drawn,
    Missing,
    Animated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AnimatedCell {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) tile_id: TileId,
}

/// Chunks overlapped by a tile window, as a window of chunk keys.
pub(crate) fn chunk_span(range: TileRange) -> TileRange {
    if range.is_empty() {
        return TileRange::default();
    }
    TileRange {
        x_start: range.x_start / CHUNK_TILES,
        y_start: range.y_start / CHUNK_TILES,
        x_end: range.x_end.div_ceil(CHUNK_TILES),
        y_end: range.y_end.div_ceil(CHUNK_TILES),
    }
}

/// Fixed-size grid of optional tile ids, stored row-major.
///
/// The grid is only reachable through the mutators below. Each one marks the
/// layer dirty and drops the cached chunks it touched, so the next render
/// recomposites only those.
#[derive(Debug, Clone)]
pub struct TileLayer {
    width: u32,
    height: u32,
    tiles: Vec<Option<TileId>>,
    config: TileLayerConfig,
    dirty: bool,
    cache: Option<LayerCache>,
}

impl TileLayer {
    pub fn new(width: u32, height: u32) -> Result<Self, TilemapError> {
        if width == 0 || height == 0 {
            return Err(TilemapError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            tiles: vec![None; width as usize * height as usize],
            config: TileLayerConfig::default(),
            dirty: true,
            cache: None,
        })
    }

    pub fn with_config(mut self, config: TileLayerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn config(&self) -> &TileLayerConfig {
        &self.config
    }

    /// Render settings are applied at blit time, so editing them keeps the cache.
    pub fn config_mut(&mut self) -> &mut TileLayerConfig {
        &mut self.config
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    pub fn get_tile(&self, x: i32, y: i32) -> Result<Option<TileId>, TilemapError> {
        let index = self.checked_index(x, y)?;
        Ok(self.tiles[index])
    }

    pub fn set_tile(&mut self, x: i32, y: i32, tile_id: TileId) -> Result<(), TilemapError> {
        let index = self.checked_index(x, y)?;
        self.tiles[index] = Some(tile_id);
        self.invalidate_cell(x as u32, y as u32);
        Ok(())
    }

    pub fn remove_tile(&mut self, x: i32, y: i32) -> Result<Option<TileId>, TilemapError> {
        let index = self.checked_index(x, y)?;
        self.invalidate_cell(x as u32, y as u32);
        Ok(self.tiles[index].take())
    }

    pub fn fill(&mut self, tile_id: TileId) {
        self.tiles.fill(Some(tile_id));
        self.invalidate();
    }

    pub fn clear(&mut self) {
        self.tiles.fill(None);
        self.invalidate();
    }

    /// Non-empty cell count.
    pub fn tile_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_some()).count()
    }

    /// Every cell in row-major order as `(x, y, tile)`.
    pub fn tiles(&self) -> impl Iterator<Item = (u32, u32, Option<TileId>)> + '_ {
        let width = self.width as usize;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(index, tile)| ((index % width) as u32, (index / width) as u32, *tile))
    }

    pub(crate) fn tile_at(&self, x: u32, y: u32) -> Option<TileId> {
        self.index_of(x, y).and_then(|index| self.tiles[index])
    }

    pub(crate) fn invalidate(&mut self) {
        self.cache = None;
        self.dirty = true;
    }

    fn invalidate_cell(&mut self, x: u32, y: u32) {
        if let Some(cache) = self.cache.as_mut() {
            cache.chunks.remove(&(x / CHUNK_TILES, y / CHUNK_TILES));
        }
        self.dirty = true;
    }

    /// Tiles covered by the chunk at `key`, clipped to the grid.
    pub(crate) fn chunk_tiles(&self, key: ChunkKey) -> TileRange {
        let start = |index: u32| index.saturating_mul(CHUNK_TILES);
        TileRange {
            x_start: start(key.0).min(self.width),
            y_start: start(key.1).min(self.height),
            x_end: start(key.0).saturating_add(CHUNK_TILES).min(self.width),
            y_end: start(key.1).saturating_add(CHUNK_TILES).min(self.height),
        }
    }

    /// Caches every chunk overlapping `range`, building the missing ones with
    /// `build`, and evicts chunks outside it. Clean chunks are reused as-is.
    /// Returns the cache and how many chunks were built.
    pub(crate) fn cache_for_range<F>(
        &mut self,
        range: TileRange,
        mut build: F,
    ) -> (&LayerCache, u32)
    where
        F: FnMut(&TileLayer, TileRange) -> CacheChunk,
    {
        let mut cache = self.cache.take().unwrap_or_default();
        let span = chunk_span(range);
        cache.chunks.retain(|key, _| span.contains(key.0, key.1));

        let mut built = 0;
        for key in span.cells() {
            if let Entry::Vacant(entry) = cache.chunks.entry(key) {
                entry.insert(build(&*self, self.chunk_tiles(key)));
                built += 1;
            }
        }
        self.dirty = false;
        let cache: &LayerCache = self.cache.insert(cache);
        (cache, built)
    }

    #[cfg(test)]
    pub(crate) fn cached_chunks(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.chunks.len())
    }

    fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    fn checked_index(&self, x: i32, y: i32) -> Result<usize, TilemapError> {
        let out_of_bounds = TilemapError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        };
        if x < 0 || y < 0 {
            return Err(out_of_bounds);
        }
        self.index_of(x as u32, y as u32).ok_or(out_of_bounds)
    }
}
