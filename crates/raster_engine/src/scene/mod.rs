//! Scene management system
//!
//! Holds the models of a frame and decides the order they are drawn in.
//!
//! ## Frame Flow
//!
//! ```text
//! update all models (Perframe)
//!      ↓
//! view distances → RenderQueue (opaque front-to-back, transparent back-to-front)
//!      ↓
//! shadow pass (opaque only, depth-only framebuffer)   [if enabled]
//!      ↓
//! clear → opaque → transparent
//! ```

mod render_queue;

use std::sync::Arc;

use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::assets::MeshCache;
use crate::core::config::RendererConfig;
use crate::config::ConfigError;
use crate::foundation::math::Vec4;
use crate::render::{Framebuffer, FramebufferError, Perframe};
use crate::shaders::Model;

pub use render_queue::RenderQueue;

new_key_type! {
    /// Handle to a model owned by a [`Scene`]
    pub struct ModelKey;
}

/// Scene construction errors
#[derive(Error, Debug)]
pub enum SceneError {
    /// The renderer configuration is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The shadow framebuffer could not be created
    #[error("Framebuffer error: {0}")]
    Framebuffer(#[from] FramebufferError),
}

/// Collection of models rendered together
pub struct Scene {
    models: SlotMap<ModelKey, Box<dyn Model>>,
    config: RendererConfig,
    shadow_buffer: Option<Framebuffer>,
    queue: RenderQueue,
}

impl Scene {
    /// Create an empty scene
    ///
    /// Allocates the shadow framebuffer up front when shadows are enabled.
    pub fn new(config: RendererConfig) -> Result<Self, SceneError> {
        config.validate()?;

        let shadow_buffer = if config.enable_shadows {
            Some(Framebuffer::depth_only(config.shadow_map_size, config.shadow_map_size)?)
        } else {
            None
        };

        log::info!(
            "Scene created ({}x{}, shadows: {})",
            config.width,
            config.height,
            config.enable_shadows
        );

        Ok(Self {
            models: SlotMap::with_key(),
            config,
            shadow_buffer,
            queue: RenderQueue::new(),
        })
    }

    /// Renderer configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Take ownership of a model
    pub fn add(&mut self, mut model: Box<dyn Model>) -> ModelKey {
        model.set_early_depth_test(self.config.early_depth_test);
        self.models.insert(model)
    }

    /// Look up a model
    pub fn get(&self, key: ModelKey) -> Option<&dyn Model> {
        self.models.get(key).map(|model| model.as_ref())
    }

    /// Look up a model mutably
    pub fn get_mut(&mut self, key: ModelKey) -> Option<&mut Box<dyn Model>> {
        self.models.get_mut(key)
    }

    /// Remove and release a model; returns false for an unknown key
    pub fn remove(&mut self, key: ModelKey, cache: &mut MeshCache) -> bool {
        match self.models.remove(key) {
            Some(model) => {
                model.release(cache);
                true
            }
            None => false,
        }
    }

    /// Release every model
    pub fn release_all(&mut self, cache: &mut MeshCache) {
        let count = self.models.len();
        for (_, model) in self.models.drain() {
            model.release(cache);
        }
        self.queue = RenderQueue::new();
        log::info!("Released {} models", count);
    }

    /// Number of models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the scene has no models
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Draw order used by the last `render`
    pub fn render_queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Depth-only target of the shadow pass, if shadows are enabled
    pub fn shadow_buffer(&self) -> Option<&Framebuffer> {
        self.shadow_buffer.as_ref()
    }

    /// Render one frame into `framebuffer`
    pub fn render(&mut self, framebuffer: &mut Framebuffer, perframe: &Perframe) {
        for model in self.models.values_mut() {
            model.update(perframe);
            let center = model.desc().world_center();
            let view = perframe.camera_view_matrix * Vec4::new(center.x, center.y, center.z, 1.0);
            model.set_distance(-view.z);
        }
        self.queue = RenderQueue::from_models(&self.models);

        if let Some(shadow_buffer) = &mut self.shadow_buffer {
            shadow_buffer.clear_depth(1.0);
            for &key in self.queue.opaque() {
                if let Some(model) = self.models.get_mut(key) {
                    model.draw(shadow_buffer, true);
                }
            }

            let lit = Perframe {
                shadow_map: Some(Arc::new(shadow_buffer.depth_map())),
                ..perframe.clone()
            };
            for model in self.models.values_mut() {
                model.update(&lit);
            }
        }

        framebuffer.clear_color(Vec4::from(self.config.clear_color));
        framebuffer.clear_depth(self.config.clear_depth);

        for key in self.queue.iter() {
            if let Some(model) = self.models.get_mut(key) {
                model.draw(framebuffer, false);
            }
        }

        log::trace!(
            "Rendered {} opaque, {} transparent models",
            self.queue.opaque().len(),
            self.queue.transparent().len()
        );
    }
}
