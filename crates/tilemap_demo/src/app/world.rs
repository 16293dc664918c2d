use std::sync::Arc;

use tile_engine::{
    AtlasError, PixelRect, SpriteSheet, Surface, TileAtlas, TileConfig, TileId, TileLayerConfig,
    Tilemap, TilemapError,
};
use tracing::info;

pub(crate) const TILE_SIZE: u32 = 32;
const ATLAS_COLUMNS: u32 = 4;

pub(crate) const SKY: TileId = 0;
pub(crate) const HILL: TileId = 1;
pub(crate) const GRASS: TileId = 2;
pub(crate) const DIRT: TileId = 3;
pub(crate) const WATER_FRAMES: [TileId; 4] = [4, 5, 6, 7];
pub(crate) const FLOWER: TileId = 8;
pub(crate) const ROCK: TileId = 9;
const WATER_FRAME_SECONDS: f64 = 0.2;

pub(crate) const GROUND_LAYER: &str = "ground";
pub(crate) const MAP_COLUMNS: u32 = 60;
pub(crate) const MAP_ROWS: u32 = 12;
const BASE_SURFACE_ROW: i32 = 8;
const POOL_COLUMNS: std::ops::Range<u32> = 24..29;

/// Fill color and border color per atlas frame. Frames without an entry stay
/// transparent.
const PALETTE: [([u8; 4], [u8; 4]); 10] = [
    ([112, 170, 230, 255], [112, 170, 230, 255]),
    ([78, 122, 160, 255], [66, 104, 138, 255]),
    ([86, 168, 70, 255], [60, 128, 48, 255]),
    ([128, 90, 58, 255], [100, 68, 42, 255]),
    ([40, 100, 200, 255], [30, 80, 170, 255]),
    ([48, 112, 212, 255], [30, 80, 170, 255]),
    ([58, 124, 222, 255], [30, 80, 170, 255]),
    ([48, 112, 212, 255], [30, 80, 170, 255]),
    ([0, 0, 0, 0], [236, 200, 64, 255]),
    ([120, 120, 128, 255], [88, 88, 96, 255]),
];

/// Procedural 4x4 atlas of 32px tiles.
pub(crate) fn build_tileset() -> Result<SpriteSheet, AtlasError> {
    let mut texture = Surface::new(ATLAS_COLUMNS * TILE_SIZE, ATLAS_COLUMNS * TILE_SIZE);
    for (index, (fill, border)) in PALETTE.iter().enumerate() {
        let index = index as u32;
        let x = (index % ATLAS_COLUMNS) * TILE_SIZE;
        let y = (index / ATLAS_COLUMNS) * TILE_SIZE;
        texture.fill_rect(PixelRect::new(x, y, TILE_SIZE, TILE_SIZE), *border);
        texture.fill_rect(
            PixelRect::new(x + 2, y + 2, TILE_SIZE - 4, TILE_SIZE - 4),
            *fill,
        );
    }
    let mut sheet = SpriteSheet::from_surface(texture);
    sheet.add_frames_grid(TILE_SIZE, TILE_SIZE, 0, 0)?;
    Ok(sheet)
}

/// Row of the topmost ground cell in `column`.
pub(crate) fn surface_row(column: u32) -> u32 {
    let wave = (column as f32 * 0.35).sin() * 1.5;
    (BASE_SURFACE_ROW + wave.round() as i32).clamp(1, MAP_ROWS as i32 - 2) as u32
}

/// Side-scrolling scene: parallax sky, wavy solid ground with an animated
/// pool and a translucent decoration layer.
pub(crate) fn build_demo_map(tileset: Arc<dyn TileAtlas>) -> Result<Tilemap, TilemapError> {
    let mut map = Tilemap::new(TILE_SIZE, TILE_SIZE, tileset)?;

    map.set_tile_config(GRASS, TileConfig::solid())?;
    map.set_tile_config(DIRT, TileConfig::solid())?;
    map.set_tile_config(ROCK, TileConfig::solid())?;
    map.set_tile_config(
        WATER_FRAMES[0],
        TileConfig::animated(WATER_FRAMES.to_vec(), WATER_FRAME_SECONDS),
    )?;

    let background = map.add_layer(
        "background",
        MAP_COLUMNS / 2 + 10,
        MAP_ROWS,
        Some(TileLayerConfig {
            z_index: -10,
            scroll_factor_x: 0.5,
            scroll_factor_y: 0.5,
            ..TileLayerConfig::default()
        }),
    )?;
    background.fill(SKY);
    for column in 0..background.width() {
        let peak = 5 + (column % 7).min(6 - column % 7);
        for row in peak..MAP_ROWS {
            background.set_tile(column as i32, row as i32, HILL)?;
        }
    }

    let ground = map.add_layer(GROUND_LAYER, MAP_COLUMNS, MAP_ROWS, None)?;
    for column in 0..MAP_COLUMNS {
        let top = surface_row(column);
        let in_pool = POOL_COLUMNS.contains(&column);
        let first = if in_pool { MAP_ROWS - 2 } else { top };
        for row in first..MAP_ROWS {
            let tile = if row == first { GRASS } else { DIRT };
            ground.set_tile(column as i32, row as i32, tile)?;
        }
    }
    for column in (5..MAP_COLUMNS).step_by(14) {
        let row = surface_row(column) - 1;
        ground.set_tile(column as i32, row as i32, ROCK)?;
    }

    let water = map.add_layer(
        "water",
        MAP_COLUMNS,
        MAP_ROWS,
        Some(TileLayerConfig {
            z_index: 1,
            opacity: 200,
            ..TileLayerConfig::default()
        }),
    )?;
    let pool_top = POOL_COLUMNS.map(surface_row).min().unwrap_or(MAP_ROWS - 2);
    for column in POOL_COLUMNS {
        for row in pool_top..MAP_ROWS - 2 {
            water.set_tile(column as i32, row as i32, WATER_FRAMES[0])?;
        }
    }

    let decoration = map.add_layer(
        "decoration",
        MAP_COLUMNS,
        MAP_ROWS,
        Some(TileLayerConfig {
            z_index: 2,
            opacity: 192,
            ..TileLayerConfig::default()
        }),
    )?;
    for column in (2..MAP_COLUMNS).step_by(7) {
        if POOL_COLUMNS.contains(&column) {
            continue;
        }
        let row = surface_row(column) - 1;
        decoration.set_tile(column as i32, row as i32, FLOWER)?;
    }

    map.set_collision_layer(GROUND_LAYER)?;
    info!(
        layers = map.layer_count(),
        width = map.width(),
        height = map.height(),
        "demo_map_built"
    );
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_engine::Rect;

    fn demo_map() -> Tilemap {
        let tileset = build_tileset().expect("tileset");
        build_demo_map(Arc::new(tileset)).expect("map")
    }

    #[test]
    fn tileset_has_one_frame_per_grid_cell() {
        let sheet = build_tileset().expect("tileset");
        assert_eq!(sheet.frames().len(), 16);
        assert!(sheet.fetch_region(GRASS).is_some());
        let flower = sheet.frame(FLOWER as usize).expect("flower");
        assert_eq!(sheet.texture().pixel(flower.x + 16, flower.y + 16), Some([0, 0, 0, 0]));
    }

    #[test]
    fn demo_map_layers_render_in_depth_order() {
        let map = demo_map();
        assert_eq!(
            map.layer_names(),
            vec!["background", GROUND_LAYER, "water", "decoration"]
        );
        assert_eq!(map.collision_layer(), Some(GROUND_LAYER));
        assert_eq!((map.width(), map.height()), (MAP_COLUMNS, MAP_ROWS));
    }

    #[test]
    fn ground_surface_is_solid() {
        let map = demo_map();
        for column in [0, 10, 40, 59] {
            let row = surface_row(column);
            let query = Rect::new(
                (column * TILE_SIZE) as f32 + 8.0,
                (row * TILE_SIZE) as f32 - 4.0,
                16.0,
                16.0,
            );
            let collision = map.check_collision(&query).expect("collision");
            assert_eq!(collision.normal.y, -1.0, "column {column}");
        }
    }

    #[test]
    fn pool_water_animates() {
        let mut map = demo_map();
        assert_eq!(map.displayed_tile_id(WATER_FRAMES[0]), WATER_FRAMES[0]);
        map.update(0.25);
        assert_eq!(map.displayed_tile_id(WATER_FRAMES[0]), WATER_FRAMES[1]);
        let water = map.get_layer("water").expect("water");
        assert!(water.tile_count() > 0);
    }
}
