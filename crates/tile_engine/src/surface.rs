use std::path::{Path, PathBuf};

use image::{ExtendedColorType, ImageReader};
use thiserror::Error;

pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to save image {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Owned RGBA8 pixel buffer, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut rgba = vec![0; width as usize * height as usize * 4];
        for chunk in rgba.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn open(path: &Path) -> Result<Self, SurfaceError> {
        let reader = ImageReader::open(path).map_err(|source| SurfaceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = reader.decode().map_err(|source| SurfaceError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let image = decoded.to_rgba8();
        Ok(Self {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        })
    }

    pub fn save_png(&self, path: &Path) -> Result<(), SurfaceError> {
        image::save_buffer(
            path,
            &self.rgba,
            self.width,
            self.height,
            ExtendedColorType::Rgba8,
        )
        .map_err(|source| SurfaceError::Save {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.rgba.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.offset_of(x, y)?;
        let mut out = [0; 4];
        out.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(out)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        if let Some(offset) = self.offset_of(x, y) {
            self.rgba[offset..offset + 4].copy_from_slice(&color);
        }
    }

    /// Overwrites a rectangle, clipped to the surface.
    pub fn fill_rect(&mut self, rect: PixelRect, color: [u8; 4]) {
        let right = rect.right().min(self.width as u64) as u32;
        let bottom = rect.bottom().min(self.height as u64) as u32;
        for y in rect.y..bottom {
            for x in rect.x..right {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// Source-over blit of `src_rect` from `src` with its top-left corner at
    /// `(dst_x, dst_y)`. Source alpha is scaled by `opacity`; both rectangles
    /// are clipped, so off-surface destinations are legal.
    pub fn blit_region(
        &mut self,
        src: &Surface,
        src_rect: PixelRect,
        dst_x: i32,
        dst_y: i32,
        opacity: u8,
    ) {
        if opacity == 0 || self.width == 0 || self.height == 0 {
            return;
        }
        let src_right = src_rect.right().min(src.width as u64) as i64;
        let src_bottom = src_rect.bottom().min(src.height as u64) as i64;
        let src_left = src_rect.x as i64;
        let src_top = src_rect.y as i64;
        if src_left >= src_right || src_top >= src_bottom {
            return;
        }

        let dst_left = dst_x as i64;
        let dst_top = dst_y as i64;
        let draw_left = dst_left.max(0);
        let draw_top = dst_top.max(0);
        let draw_right = (dst_left + (src_right - src_left)).min(self.width as i64);
        let draw_bottom = (dst_top + (src_bottom - src_top)).min(self.height as i64);
        if draw_left >= draw_right || draw_top >= draw_bottom {
            return;
        }

        let dst_width = self.width as usize;
        let src_width = src.width as usize;
        for out_y in draw_top..draw_bottom {
            let sy = (src_top + (out_y - dst_top)) as usize;
            let src_row = sy * src_width * 4;
            let dst_row = out_y as usize * dst_width * 4;
            for out_x in draw_left..draw_right {
                let sx = (src_left + (out_x - dst_left)) as usize;
                let src_offset = src_row + sx * 4;
                let dst_offset = dst_row + out_x as usize * 4;
                let mut color = [0; 4];
                color.copy_from_slice(&src.rgba[src_offset..src_offset + 4]);
                blend_pixel(&mut self.rgba[dst_offset..dst_offset + 4], color, opacity);
            }
        }
    }

    fn offset_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }
}

fn mul_div_255(a: u32, b: u32) -> u32 {
    (a * b + 127) / 255
}

fn blend_pixel(dst: &mut [u8], src: [u8; 4], opacity: u8) {
    let src_alpha = mul_div_255(src[3] as u32, opacity as u32);
    if src_alpha == 0 {
        return;
    }
    let dst_alpha = dst[3] as u32;
    if src_alpha == 255 || dst_alpha == 0 {
        dst[..3].copy_from_slice(&src[..3]);
        dst[3] = src_alpha as u8;
        return;
    }
    // Straight (non-premultiplied) source-over.
    let dst_weight = mul_div_255(dst_alpha, 255 - src_alpha);
    let out_alpha = src_alpha + dst_weight;
    for channel in 0..3 {
        let sum = src[channel] as u32 * src_alpha + dst[channel] as u32 * dst_weight;
        dst[channel] = ((sum + out_alpha / 2) / out_alpha) as u8;
    }
    dst[3] = out_alpha as u8;
}
