//! # Unified Configuration System
//!
//! Concrete configuration structures for the rasterizer, asset loading and
//! logging. Every structure uses `#[serde(default)]` so configuration files
//! only need to mention the values they change.
//!
//! ## Configuration Categories
//!
//! - **Renderer Config**: framebuffer size, clear values, depth policy, shadows
//! - **Asset Config**: where meshes and textures are looked up
//! - **Logging Config**: `env_logger` filter and formatting

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};

/// # Renderer Configuration
///
/// Framebuffer dimensions and per-frame pipeline settings used by the frame
/// driver and [`Scene`](crate::scene::Scene).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Framebuffer width in pixels
    pub width: u32,
    /// Framebuffer height in pixels
    pub height: u32,
    /// RGBA color the color buffer is cleared to each frame
    pub clear_color: [f32; 4],
    /// Depth value the depth buffer is cleared to each frame
    pub clear_depth: f32,
    /// Whether opaque models render a shadow pass first
    pub enable_shadows: bool,
    /// Side length of the square shadow map
    pub shadow_map_size: u32,
    /// Depth test before running the fragment shader
    pub early_depth_test: bool,
}

impl RendererConfig {
    /// Create a renderer configuration for the given framebuffer size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Enable or disable the shadow pass
    pub fn with_shadows(mut self, enabled: bool, map_size: u32) -> Self {
        self.enable_shadows = enabled;
        self.shadow_map_size = map_size;
        self
    }

    /// Framebuffer aspect ratio (width / height)
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid {
                field: "renderer.width/height",
                reason: format!("framebuffer must be non-empty, got {}x{}", self.width, self.height),
            });
        }

        if self.enable_shadows && self.shadow_map_size == 0 {
            return Err(ConfigError::Invalid {
                field: "renderer.shadow_map_size",
                reason: "shadow map size must be at least 1".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.clear_depth) {
            return Err(ConfigError::Invalid {
                field: "renderer.clear_depth",
                reason: format!("{} is outside [0, 1]", self.clear_depth),
            });
        }

        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
            enable_shadows: false,
            shadow_map_size: 512,
            early_depth_test: true,
        }
    }
}

/// # Asset Configuration
///
/// Where the mesh cache and texture loader resolve relative names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Base directory for assets
    pub assets_dir: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            assets_dir: "assets".to_string(),
        }
    }
}

/// # Logging Configuration
///
/// `filter` follows the `env_logger` filter syntax
/// (e.g. `"info"`, `"raster_engine=debug"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Explicit filter; overrides `RUST_LOG` when set
    pub filter: Option<String>,
    /// Level used when neither `filter` nor `RUST_LOG` is set
    pub level: String,
    /// Prefix records with millisecond timestamps
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            level: "info".to_string(),
            timestamps: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct FrameConfig {
        renderer: RendererConfig,
        logging: LoggingConfig,
    }

    impl Config for FrameConfig {}

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FrameConfig::from_str_as(
            "[renderer]\nwidth = 64\nheight = 32\n",
            ConfigFormat::Toml,
        ).unwrap();

        assert_eq!(config.renderer.width, 64);
        assert_eq!(config.renderer.height, 32);
        assert_eq!(config.renderer.clear_depth, 1.0);
        assert!(config.renderer.early_depth_test);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_ron_roundtrip_through_string() {
        let config = FrameConfig {
            renderer: RendererConfig::new(320, 240).with_shadows(true, 256),
            logging: LoggingConfig::default(),
        };
        let text = ron::ser::to_string(&config).unwrap();
        let parsed = FrameConfig::from_str_as(&text, ConfigFormat::Ron).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validation_rejects_empty_framebuffer() {
        let config = RendererConfig::new(0, 10);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
        assert!(RendererConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = ConfigFormat::from_path(std::path::Path::new("scene.yaml"));
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
