//! # Raster Engine
//!
//! A CPU software rasterizer with a programmable shading pipeline.
//!
//! ## Features
//!
//! - **Typed Programs**: vertex/fragment shader pairs over `Pod` attribute,
//!   varying and uniform buffers
//! - **Exact Coverage**: fixed-point edge functions with the top-left rule
//! - **Clipping**: homogeneous clip-space polygon clipping with perspective
//!   correct varyings
//! - **Depth Testing**: early or late depth test, optional blending
//! - **Shader Kinds**: unlit and Blinn-Phong with a shadow map
//! - **Mesh Cache**: reference-counted mesh sharing across models
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use raster_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RendererConfig::new(320, 240);
//!     let mut cache = MeshCache::new("assets");
//!     let mut scene = Scene::new(config.clone())?;
//!
//!     let model = create_model(
//!         ShaderKind::Unlit,
//!         &mut cache,
//!         "cube",
//!         Mat4::identity(),
//!         &Material::default(),
//!     )?;
//!     scene.add(model);
//!
//!     let camera = Camera::perspective(Vec3::new(0.0, 1.0, 4.0), 60.0, config.aspect(), 0.1, 100.0);
//!     let perframe = Perframe::from_camera(&camera, &DirectionalLight::default());
//!
//!     let mut framebuffer = Framebuffer::new(config.width, config.height)?;
//!     scene.render(&mut framebuffer, &perframe);
//!     framebuffer.save_png("frame.png")?;
//!
//!     scene.release_all(&mut cache);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;
pub mod foundation;

// Pipeline and content
pub mod assets;
pub mod render;
pub mod scene;
pub mod shaders;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{MeshCache, ObjLoader},
        config::{Config, ConfigError},
        core::config::{AssetConfig, LoggingConfig, RendererConfig},
        foundation::{
            math::{Mat4, Mat4Ext, Transform, Vec2, Vec3, Vec4},
            time::Timer,
        },
        render::{
            draw_triangle, Camera, DepthMap, DirectionalLight, Framebuffer, Mesh, Perframe,
            Program, ProgramFlags, Texture, Varyings, Vertex,
        },
        scene::{ModelKey, Scene},
        shaders::{create_model, Material, Model, ModelError, ShaderKind},
    };
}
