//! Sampled images for shaders
//!
//! [`Texture`] holds RGBA texels decoded through the `image` crate and is
//! sampled by fragment shaders with repeat wrapping. [`DepthMap`] is a frozen
//! copy of a framebuffer depth buffer that lighting shaders read back as a
//! shadow map.
//!
//! Both store rows bottom-up so a texture coordinate of `v = 0` addresses the
//! bottom row, the same convention as normalized device coordinates.

use std::path::Path;

use thiserror::Error;

use crate::foundation::math::{Vec2, Vec4};

/// Texture loading errors
#[derive(Error, Debug)]
pub enum TextureError {
    /// The image could not be opened or decoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Dimensions do not match the texel count
    #[error("Texture of {width}x{height} needs {expected} texels, got {actual}")]
    SizeMismatch {
        /// Width in texels
        width: u32,
        /// Height in texels
        height: u32,
        /// width * height
        expected: usize,
        /// Supplied texel count
        actual: usize,
    },
}

/// RGBA texture with floating point texels
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
}

impl Texture {
    /// Build a texture from texels given bottom row first
    pub fn from_texels(width: u32, height: u32, texels: Vec<Vec4>) -> Result<Self, TextureError> {
        let expected = width as usize * height as usize;
        if expected == 0 || texels.len() != expected {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                expected,
                actual: texels.len(),
            });
        }
        Ok(Self { width, height, texels })
    }

    /// Single-texel texture, handy as a neutral default
    pub fn solid(color: Vec4) -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![color],
        }
    }

    /// Load a texture from an image file
    ///
    /// Image rows are stored top-down, so they are flipped on load.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let image = image::open(path)?.to_rgba32f();
        let (width, height) = image.dimensions();

        let mut texels = Vec::with_capacity(width as usize * height as usize);
        for row in (0..height).rev() {
            for column in 0..width {
                let [r, g, b, a] = image.get_pixel(column, row).0;
                texels.push(Vec4::new(r, g, b, a));
            }
        }

        log::debug!("Loaded {}x{} texture from {}", width, height, path.display());
        Self::from_texels(width, height, texels)
    }

    /// Width in texels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest-texel sample with repeat wrapping
    pub fn sample(&self, texcoord: Vec2) -> Vec4 {
        let u = texcoord.x - texcoord.x.floor();
        let v = texcoord.y - texcoord.y.floor();
        let column = (self.width as f32 * u) as usize;
        let row = (self.height as f32 * v) as usize;
        let index = row.min(self.height as usize - 1) * self.width as usize
            + column.min(self.width as usize - 1);
        self.texels[index]
    }
}

/// Depth buffer snapshot sampled as a shadow map
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    depths: Vec<f32>,
}

impl DepthMap {
    /// Copy a top-down depth buffer into a bottom-up depth map
    pub(crate) fn from_rows_top_down(width: u32, height: u32, depths: &[f32]) -> Self {
        let row_len = width as usize;
        let mut flipped = Vec::with_capacity(depths.len());
        for row in depths.chunks_exact(row_len).rev() {
            flipped.extend_from_slice(row);
        }
        Self {
            width,
            height,
            depths: flipped,
        }
    }

    /// Width in texels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest-texel depth with clamp-to-edge addressing
    pub fn sample(&self, texcoord: Vec2) -> f32 {
        let u = texcoord.x.clamp(0.0, 1.0);
        let v = texcoord.y.clamp(0.0, 1.0);
        let column = ((self.width as f32 * u) as usize).min(self.width as usize - 1);
        let row = ((self.height as f32 * v) as usize).min(self.height as usize - 1);
        self.depths[row * self.width as usize + column]
    }
}
