//! Scene description loaded by the frame driver

use std::path::Path;
use std::sync::Arc;

use raster_engine::config::Config;
use raster_engine::core::config::{AssetConfig, LoggingConfig, RendererConfig};
use raster_engine::foundation::math::{utils, Mat4, Quat, Transform, Vec3, Vec4};
use raster_engine::render::{Camera, DirectionalLight, Texture, TextureError};
use raster_engine::shaders::{Material, ShaderKind};
use serde::{Deserialize, Serialize};

/// Everything needed to render a headless animation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Framebuffer and pipeline settings
    pub renderer: RendererConfig,
    /// Where meshes and textures are looked up
    pub assets: AssetConfig,
    /// Logger setup
    pub logging: LoggingConfig,
    /// Viewpoint and its animation
    pub camera: CameraConfig,
    /// The frame's directional light
    pub light: DirectionalLight,
    /// Frame count and output path
    pub run: RunConfig,
    /// Models to draw
    pub models: Vec<ModelConfig>,
}

impl Config for SceneConfig {}

/// Camera placement and orbit speed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Eye position
    pub position: [f32; 3],
    /// Look-at point
    pub target: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
    /// Orbit speed around the target in degrees per second
    pub orbit_degrees_per_second: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 1.5, 4.0],
            target: [0.0, 0.0, 0.0],
            fov_degrees: 60.0,
            near: 0.1,
            far: 100.0,
            orbit_degrees_per_second: 30.0,
        }
    }
}

impl CameraConfig {
    /// Build a camera with the given aspect ratio
    pub fn to_camera(&self, aspect: f32) -> Camera {
        let mut camera = Camera::perspective(Vec3::from(self.position), self.fov_degrees, aspect, self.near, self.far);
        camera.look_at(Vec3::from(self.target), Vec3::new(0.0, 1.0, 0.0));
        camera
    }
}

/// How long to run and where the result goes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of frames to render
    pub frames: u32,
    /// Fixed simulation step per frame in seconds
    pub time_step: f32,
    /// PNG written after the last frame
    pub output: String,
    /// Where to write the configuration actually used, defaults included
    pub resolved_config: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: 1,
            time_step: 1.0 / 30.0,
            output: "frame.png".to_string(),
            resolved_config: None,
        }
    }
}

/// One model instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Shader to draw with
    pub shader: ShaderKind,
    /// Mesh name understood by the mesh cache
    pub mesh: String,
    /// World position
    pub position: [f32; 3],
    /// Euler rotation (roll, pitch, yaw) in degrees
    pub rotation_degrees: [f32; 3],
    /// Per-axis scale
    pub scale: [f32; 3],
    /// Surface parameters
    pub material: MaterialConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            shader: ShaderKind::Unlit,
            mesh: "cube".to_string(),
            position: [0.0; 3],
            rotation_degrees: [0.0; 3],
            scale: [1.0; 3],
            material: MaterialConfig::default(),
        }
    }
}

impl ModelConfig {
    /// Model to world matrix
    pub fn transform(&self) -> Mat4 {
        let [roll, pitch, yaw] = self.rotation_degrees.map(utils::deg_to_rad);
        Transform::new(
            Vec3::from(self.position),
            Quat::from_euler_angles(roll, pitch, yaw),
            Vec3::from(self.scale),
        )
        .to_matrix()
    }
}

/// Serializable form of [`Material`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// RGBA color multiplier
    pub base_color: [f32; 4],
    /// Texture path relative to the assets directory
    pub texture: Option<String>,
    /// Discard fragments with alpha below this (0 disables)
    pub alpha_cutoff: f32,
    /// Opaque models write depth; transparent ones blend
    pub opaque: bool,
    /// Rasterize back faces (blinn only; unlit always does)
    pub double_sided: bool,
    /// Specular strength (blinn only)
    pub specular: f32,
    /// Specular exponent (blinn only)
    pub shininess: f32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        let material = Material::default();
        Self {
            base_color: material.base_factor.into(),
            texture: None,
            alpha_cutoff: material.alpha_cutoff,
            opaque: material.opaque,
            double_sided: material.double_sided,
            specular: material.specular_factor,
            shininess: material.shininess,
        }
    }
}

impl MaterialConfig {
    /// Resolve into a runtime material, loading the texture if one is named
    pub fn to_material(&self, assets_dir: &Path) -> Result<Material, TextureError> {
        let texture = match &self.texture {
            Some(name) => Some(Arc::new(Texture::load(assets_dir.join(name))?)),
            None => None,
        };

        Ok(Material {
            base_factor: Vec4::from(self.base_color),
            texture,
            alpha_cutoff: self.alpha_cutoff,
            opaque: self.opaque,
            double_sided: self.double_sided,
            specular_factor: self.specular,
            shininess: self.shininess,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_engine::config::ConfigFormat;

    #[test]
    fn test_minimal_scene_uses_defaults() {
        let config = SceneConfig::from_str_as(
            r#"
            [run]
            frames = 3

            [[models]]
            shader = "blinn"

            [[models]]
            mesh = "teapot.obj"
            material = { opaque = false, base_color = [1.0, 1.0, 1.0, 0.5] }
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(config.run.frames, 3);
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[0].shader, ShaderKind::Blinn);
        assert_eq!(config.models[0].mesh, "cube");
        assert_eq!(config.models[1].material.base_color[3], 0.5);
        assert!(!config.models[1].material.opaque);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn test_resolved_config_round_trips_through_ron() {
        let path = std::env::temp_dir().join(format!("scene_app_resolved_{}.ron", std::process::id()));
        let config = SceneConfig {
            models: vec![ModelConfig {
                shader: ShaderKind::Blinn,
                ..ModelConfig::default()
            }],
            ..SceneConfig::default()
        };

        config.save_to_file(&path).unwrap();
        let loaded = SceneConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.models, config.models);
        assert_eq!(loaded.run, config.run);
        assert_eq!(loaded.renderer, config.renderer);
    }

    #[test]
    fn test_material_without_texture() {
        let material = MaterialConfig::default().to_material(Path::new("assets")).unwrap();
        assert!(material.texture.is_none());
        assert!(material.opaque);
    }

    #[test]
    fn test_missing_texture_is_an_error() {
        let config = MaterialConfig {
            texture: Some("does_not_exist.png".to_string()),
            ..MaterialConfig::default()
        };
        assert!(config.to_material(Path::new("/nonexistent")).is_err());
    }

    #[test]
    fn test_transform_places_model() {
        let model = ModelConfig {
            position: [1.0, 2.0, 3.0],
            scale: [2.0, 2.0, 2.0],
            ..ModelConfig::default()
        };
        let matrix = model.transform();

        assert_eq!(matrix[(0, 3)], 1.0);
        assert_eq!(matrix[(1, 3)], 2.0);
        assert_eq!(matrix[(2, 3)], 3.0);
        assert_eq!(matrix[(0, 0)], 2.0);
    }
}
