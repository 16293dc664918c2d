use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::map::TileId;
use crate::surface::{PixelRect, Surface, SurfaceError};

/// Drawable region handed out by a [`TileAtlas`].
#[derive(Debug, Clone, Copy)]
pub struct AtlasRegion<'a> {
    pub texture: &'a Surface,
    pub source: PixelRect,
}

/// Pixel source for tile ids. Returning `None` means "nothing to draw" and is
/// never treated as an error by the renderer.
pub trait TileAtlas {
    fn fetch_region(&self, tile_id: TileId) -> Option<AtlasRegion<'_>>;
}

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error(
        "frame {frame:?} does not fit a {texture_width}x{texture_height} texture or has zero size"
    )]
    InvalidFrame {
        frame: PixelRect,
        texture_width: u32,
        texture_height: u32,
    },
    #[error("invalid frame grid: {reason}")]
    InvalidGrid { reason: String },
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Sprite sheet atlas: one texture plus an ordered frame list. Tile id `n`
/// resolves to frame `n`.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    texture: Surface,
    frames: Vec<PixelRect>,
}

impl SpriteSheet {
    pub fn from_surface(texture: Surface) -> Self {
        Self {
            texture,
            frames: Vec::new(),
        }
    }

    pub fn open(path: &Path) -> Result<Self, AtlasError> {
        let texture = Surface::open(path)?;
        debug!(
            path = %path.display(),
            width = texture.width(),
            height = texture.height(),
            "sprite_sheet_loaded"
        );
        Ok(Self::from_surface(texture))
    }

    pub fn texture(&self) -> &Surface {
        &self.texture
    }

    pub fn frames(&self) -> &[PixelRect] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<PixelRect> {
        self.frames.get(index).copied()
    }

    /// Appends a frame and returns its index.
    pub fn add_frame(&mut self, frame: PixelRect) -> Result<usize, AtlasError> {
        let fits = frame.width > 0
            && frame.height > 0
            && frame.right() <= self.texture.width() as u64
            && frame.bottom() <= self.texture.height() as u64;
        if !fits {
            return Err(AtlasError::InvalidFrame {
                frame,
                texture_width: self.texture.width(),
                texture_height: self.texture.height(),
            });
        }
        self.frames.push(frame);
        Ok(self.frames.len() - 1)
    }

    /// Slices the texture into a row-major grid of `frame_width` x `frame_height`
    /// cells, `margin` pixels from the texture border and `spacing` pixels apart.
    /// Returns how many frames were added.
    pub fn add_frames_grid(
        &mut self,
        frame_width: u32,
        frame_height: u32,
        margin: u32,
        spacing: u32,
    ) -> Result<usize, AtlasError> {
        if frame_width == 0 || frame_height == 0 {
            return Err(AtlasError::InvalidGrid {
                reason: format!("frame size must be positive, got {frame_width}x{frame_height}"),
            });
        }
        let columns = grid_cells(self.texture.width(), frame_width, margin, spacing);
        let rows = grid_cells(self.texture.height(), frame_height, margin, spacing);
        if columns == 0 || rows == 0 {
            return Err(AtlasError::InvalidGrid {
                reason: format!(
                    "no {frame_width}x{frame_height} frame fits a {}x{} texture with margin {margin}",
                    self.texture.width(),
                    self.texture.height()
                ),
            });
        }

        for row in 0..rows {
            for column in 0..columns {
                self.frames.push(PixelRect::new(
                    margin + column * (frame_width + spacing),
                    margin + row * (frame_height + spacing),
                    frame_width,
                    frame_height,
                ));
            }
        }
        let added = (columns * rows) as usize;
        debug!(
            frame_width,
            frame_height,
            margin,
            spacing,
            added,
            "sprite_sheet_grid_added"
        );
        Ok(added)
    }
}

fn grid_cells(extent: u32, frame: u32, margin: u32, spacing: u32) -> u32 {
    let usable = extent as i64 - 2 * margin as i64 + spacing as i64;
    if usable <= 0 {
        return 0;
    }
    (usable / (frame as i64 + spacing as i64)) as u32
}

impl TileAtlas for SpriteSheet {
    fn fetch_region(&self, tile_id: TileId) -> Option<AtlasRegion<'_>> {
        let source = self.frame(tile_id as usize)?;
        Some(AtlasRegion {
            texture: &self.texture,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sheet_64() -> SpriteSheet {
        SpriteSheet::from_surface(Surface::filled(64, 64, [255, 0, 0, 255]))
    }

    #[test]
    fn add_frame_returns_sequential_indices() {
        let mut sheet = sheet_64();
        let a = sheet.add_frame(PixelRect::new(0, 0, 32, 32)).expect("a");
        let b = sheet.add_frame(PixelRect::new(32, 0, 32, 32)).expect("b");
        assert_eq!((a, b), (0, 1));
        assert_eq!(sheet.frame(1), Some(PixelRect::new(32, 0, 32, 32)));
    }

    #[test]
    fn add_frame_rejects_frames_outside_texture() {
        let mut sheet = sheet_64();
        for frame in [
            PixelRect::new(0, 0, 0, 32),
            PixelRect::new(0, 0, 32, 0),
            PixelRect::new(40, 0, 32, 32),
            PixelRect::new(0, 40, 32, 32),
            PixelRect::new(32, 32, 64, 64),
        ] {
            let err = sheet.add_frame(frame).expect_err("frame should be rejected");
            assert!(matches!(err, AtlasError::InvalidFrame { .. }), "frame={frame:?}");
        }
        assert!(sheet.frames().is_empty());
    }

    #[test]
    fn grid_without_margin_is_row_major() {
        let mut sheet = sheet_64();
        assert_eq!(sheet.add_frames_grid(32, 32, 0, 0).expect("grid"), 4);
        let origins: Vec<(u32, u32)> = sheet.frames().iter().map(|f| (f.x, f.y)).collect();
        assert_eq!(origins, vec![(0, 0), (32, 0), (0, 32), (32, 32)]);
    }

    #[test]
    fn grid_with_margin_and_spacing() {
        let mut sheet = sheet_64();
        assert_eq!(sheet.add_frames_grid(16, 16, 8, 8).expect("grid"), 4);
        assert_eq!(sheet.frame(3), Some(PixelRect::new(32, 32, 16, 16)));
    }

    #[test]
    fn grid_rejects_invalid_parameters() {
        let mut sheet = sheet_64();
        assert!(matches!(
            sheet.add_frames_grid(0, 32, 0, 0),
            Err(AtlasError::InvalidGrid { .. })
        ));
        assert!(matches!(
            sheet.add_frames_grid(32, 0, 0, 0),
            Err(AtlasError::InvalidGrid { .. })
        ));
        assert!(matches!(
            sheet.add_frames_grid(32, 32, 64, 0),
            Err(AtlasError::InvalidGrid { .. })
        ));
        assert!(sheet.frames().is_empty());
    }

    #[test]
    fn unknown_tile_ids_have_no_region() {
        let mut sheet = sheet_64();
        sheet.add_frames_grid(32, 32, 0, 0).expect("grid");
        assert!(sheet.fetch_region(3).is_some());
        assert!(sheet.fetch_region(4).is_none());
        assert!(sheet.fetch_region(999).is_none());
    }

    #[test]
    fn open_reads_png_texture() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("tiles.png");
        Surface::filled(64, 32, [1, 2, 3, 255])
            .save_png(&path)
            .expect("save");

        let sheet = SpriteSheet::open(&path).expect("open");
        assert_eq!(sheet.texture().width(), 64);
        assert_eq!(sheet.texture().height(), 32);
        assert!(sheet.frames().is_empty());

        let missing = SpriteSheet::open(&temp.path().join("nope.png")).expect_err("missing");
        assert!(matches!(
            missing,
            AtlasError::Surface(SurfaceError::Open { .. })
        ));
    }
}
