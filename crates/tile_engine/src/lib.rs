mod atlas;
mod geometry;
pub mod map;
mod surface;

pub use atlas::{AtlasError, AtlasRegion, SpriteSheet, TileAtlas};
pub use geometry::{Rect, Vec2};
pub use map::{
    visible_tile_range, Collision, Contact, RenderStats, TileConfig, TileId, TileLayer,
    TileLayerConfig, TileRange, Tilemap, TilemapError,
};
pub use surface::{PixelRect, Surface, SurfaceError, TRANSPARENT};
