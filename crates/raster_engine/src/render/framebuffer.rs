//! Framebuffer storage
//!
//! A [`Framebuffer`] owns an RGBA8 color buffer and an `f32` depth buffer of
//! identical dimensions. Row 0 is the top row of the image. Shadow passes use
//! a depth-only framebuffer, in which case color writes are skipped by the
//! rasterizer.
//!
//! Dimensions are fixed at creation; the only mutations are the clears and
//! the per-pixel writes issued by [`draw_triangle`](super::graphics::draw_triangle).

use std::collections::TryReserveError;
use std::path::Path;

use thiserror::Error;

use crate::foundation::math::{utils, Vec4};
use crate::render::texture::DepthMap;

/// Framebuffer creation and export errors
#[derive(Error, Debug)]
pub enum FramebufferError {
    /// Width or height is zero
    #[error("Invalid framebuffer size {width}x{height}")]
    InvalidSize {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Buffer storage could not be allocated
    #[error("Failed to allocate framebuffer storage: {0}")]
    Allocation(#[from] TryReserveError),

    /// The operation needs a color buffer but the framebuffer is depth-only
    #[error("Framebuffer has no color buffer")]
    NoColorBuffer,

    /// Image encoding failed
    #[error("Image export failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Color + depth render target
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    color_buffer: Option<Vec<[u8; 4]>>,
    depth_buffer: Vec<f32>,
}

fn allocate<T: Clone>(len: usize, value: T) -> Result<Vec<T>, TryReserveError> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len)?;
    buffer.resize(len, value);
    Ok(buffer)
}

impl Framebuffer {
    /// Create a framebuffer with color and depth buffers
    ///
    /// Color is cleared to transparent black and depth to 1.0.
    ///
    /// # Errors
    /// [`FramebufferError::InvalidSize`] for a zero dimension,
    /// [`FramebufferError::Allocation`] when storage cannot be reserved.
    pub fn new(width: u32, height: u32) -> Result<Self, FramebufferError> {
        let mut framebuffer = Self::depth_only(width, height)?;
        framebuffer.color_buffer = Some(allocate(framebuffer.pixel_count(), [0u8; 4])?);
        log::debug!("Created {}x{} framebuffer", width, height);
        Ok(framebuffer)
    }

    /// Create a framebuffer with a depth buffer only (shadow maps)
    pub fn depth_only(width: u32, height: u32) -> Result<Self, FramebufferError> {
        if width == 0 || height == 0 {
            return Err(FramebufferError::InvalidSize { width, height });
        }

        let pixel_count = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            color_buffer: None,
            depth_buffer: allocate(pixel_count, 1.0)?,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether color writes land anywhere
    pub fn has_color_buffer(&self) -> bool {
        self.color_buffer.is_some()
    }

    fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Fill the color buffer with a single RGBA color (components in [0, 1])
    pub fn clear_color(&mut self, color: Vec4) {
        let color = utils::saturate(color);
        let texel = [
            utils::float_to_u8(color.x),
            utils::float_to_u8(color.y),
            utils::float_to_u8(color.z),
            utils::float_to_u8(color.w),
        ];
        if let Some(buffer) = &mut self.color_buffer {
            buffer.fill(texel);
        }
    }

    /// Fill the depth buffer with a single value
    pub fn clear_depth(&mut self, depth: f32) {
        self.depth_buffer.fill(depth);
    }

    fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// RGBA color at a pixel, `None` when out of bounds or depth-only
    pub fn color_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let index = self.index_of(x, y)?;
        self.color_buffer.as_ref().map(|buffer| buffer[index])
    }

    /// Depth at a pixel, `None` when out of bounds
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        self.index_of(x, y).map(|index| self.depth_buffer[index])
    }

    /// Color buffer as tightly packed RGBA8 rows, top row first
    pub fn color_bytes(&self) -> Option<&[u8]> {
        self.color_buffer.as_deref().map(bytemuck::cast_slice)
    }

    /// Raw depth buffer, top row first
    pub fn depth_buffer(&self) -> &[f32] {
        &self.depth_buffer
    }

    pub(crate) fn depth(&self, index: usize) -> f32 {
        self.depth_buffer[index]
    }

    pub(crate) fn set_depth(&mut self, index: usize, depth: f32) {
        self.depth_buffer[index] = depth;
    }

    pub(crate) fn color(&self, index: usize) -> Option<[u8; 4]> {
        self.color_buffer.as_ref().map(|buffer| buffer[index])
    }

    pub(crate) fn set_color(&mut self, index: usize, color: [u8; 4]) {
        if let Some(buffer) = &mut self.color_buffer {
            buffer[index] = color;
        }
    }

    /// Snapshot the depth buffer for sampling as a shadow map
    pub fn depth_map(&self) -> DepthMap {
        DepthMap::from_rows_top_down(self.width, self.height, &self.depth_buffer)
    }

    /// Write the color buffer to an image file (format from the extension)
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), FramebufferError> {
        let bytes = self.color_bytes().ok_or(FramebufferError::NoColorBuffer)?;
        let image = image::RgbaImage::from_raw(self.width, self.height, bytes.to_vec())
            .ok_or(FramebufferError::InvalidSize { width: self.width, height: self.height })?;
        image.save(path.as_ref())?;
        log::info!("Saved framebuffer to {}", path.as_ref().display());
        Ok(())
    }

    /// Release the framebuffer and its storage
    pub fn release(self) {
        log::debug!("Released {}x{} framebuffer", self.width, self.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(matches!(
            Framebuffer::new(0, 4),
            Err(FramebufferError::InvalidSize { width: 0, height: 4 })
        ));
        assert!(Framebuffer::depth_only(4, 0).is_err());
    }

    #[test]
    fn test_clear_color_and_depth() {
        let mut framebuffer = Framebuffer::new(4, 3).unwrap();
        framebuffer.clear_color(Vec4::new(1.0, 0.5, 0.0, 1.0));
        framebuffer.clear_depth(0.25);

        assert_eq!(framebuffer.color_at(3, 2), Some([255, 128, 0, 255]));
        assert_eq!(framebuffer.depth_at(0, 0), Some(0.25));
        assert_eq!(framebuffer.color_at(4, 0), None);
        assert_eq!(framebuffer.color_bytes().unwrap().len(), 4 * 3 * 4);
    }

    #[test]
    fn test_depth_only_has_no_color() {
        let mut framebuffer = Framebuffer::depth_only(2, 2).unwrap();
        framebuffer.clear_color(Vec4::new(1.0, 1.0, 1.0, 1.0));

        assert!(!framebuffer.has_color_buffer());
        assert_eq!(framebuffer.color_at(0, 0), None);
        assert_eq!(framebuffer.depth_at(1, 1), Some(1.0));
        assert!(matches!(framebuffer.save_png("unused.png"), Err(FramebufferError::NoColorBuffer)));
    }
}
