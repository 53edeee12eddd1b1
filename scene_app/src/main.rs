//! Headless scene renderer
//!
//! Loads a scene description, renders a fixed number of frames with the
//! camera orbiting its target and writes the last frame to a PNG.
//!
//! ```text
//! scene_app [scene.toml]
//! ```

mod config;

use std::path::PathBuf;

use raster_engine::assets::MeshCache;
use raster_engine::config::{Config, ConfigError};
use raster_engine::foundation::logging;
use raster_engine::foundation::math::utils;
use raster_engine::foundation::time::{Stopwatch, Timer};
use raster_engine::render::{Camera, Framebuffer, FramebufferError, Perframe, TextureError};
use raster_engine::scene::{Scene, SceneError};
use raster_engine::shaders::{create_model, ModelError};
use thiserror::Error;

use crate::config::SceneConfig;

const DEFAULT_SCENE: &str = "scene_app/scene.toml";

/// Frame driver errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Scene file could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scene setup failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// A model could not be built
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// A material texture could not be loaded
    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),

    /// The output framebuffer failed
    #[error("Framebuffer error: {0}")]
    Framebuffer(#[from] FramebufferError),
}

/// Renders a configured scene without a window
pub struct SceneApp {
    config: SceneConfig,
    cache: MeshCache,
    scene: Scene,
    camera: Camera,
    framebuffer: Framebuffer,
    timer: Timer,
}

impl SceneApp {
    /// Build the scene, loading every mesh and texture it names
    pub fn new(config: SceneConfig) -> Result<Self, AppError> {
        let renderer = config.renderer.clone();
        renderer.validate()?;

        let assets_dir = PathBuf::from(&config.assets.assets_dir);
        let mut cache = MeshCache::new(&assets_dir);
        let mut scene = Scene::new(renderer.clone())?;

        for model in &config.models {
            let material = model.material.to_material(&assets_dir)?;
            let handle = create_model(model.shader, &mut cache, &model.mesh, model.transform(), &material)?;
            scene.add(handle);
        }
        log::info!("Scene has {} models sharing {} meshes", scene.len(), cache.len());

        let camera = config.camera.to_camera(renderer.aspect());
        let framebuffer = Framebuffer::new(renderer.width, renderer.height)?;

        Ok(Self {
            config,
            cache,
            scene,
            camera,
            framebuffer,
            timer: Timer::new(),
        })
    }

    /// Render every frame and save the last one
    pub fn run(&mut self) -> Result<(), AppError> {
        let frames = self.config.run.frames;
        let step = self.config.run.time_step;
        let orbit_speed = utils::deg_to_rad(self.config.camera.orbit_degrees_per_second);
        let stopwatch = Stopwatch::start_new();

        for frame in 0..frames {
            if frame > 0 {
                self.timer.advance(step);
                self.camera.orbit(orbit_speed * step, 0.0);
            }

            let perframe = Perframe::from_camera(&self.camera, &self.config.light).with_timer(&self.timer);
            self.scene.render(&mut self.framebuffer, &perframe);
            log::debug!("Frame {} rendered at t = {:.3}s", frame, self.timer.total_time());
        }

        log::info!(
            "Rendered {} frames at {}x{} in {:.1} ms",
            frames,
            self.framebuffer.width(),
            self.framebuffer.height(),
            stopwatch.elapsed_millis()
        );

        self.framebuffer.save_png(&self.config.run.output)?;
        Ok(())
    }

    /// Return every mesh to the cache
    pub fn cleanup(mut self) {
        self.scene.release_all(&mut self.cache);
        self.cache.cleanup();
        self.framebuffer.release();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_SCENE.to_string());
    let config = SceneConfig::load_or_default(&path)?;
    logging::init(&config.logging);

    log::info!("Loading scene from {}", path);
    if let Some(resolved) = &config.run.resolved_config {
        config.save_to_file(resolved)?;
        log::info!("Wrote resolved configuration to {}", resolved);
    }
    let mut app = SceneApp::new(config)?;
    let result = app.run();
    app.cleanup();

    result?;
    log::info!("Done");
    Ok(())
}
