//! Per-frame shading context
//!
//! [`Perframe`] is the read-only snapshot every model's `update` receives:
//! timing, camera and light matrices, light intensities and the shadow map
//! from the current frame's shadow pass. The driver builds a fresh one each
//! frame and drops it afterwards.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::foundation::time::Timer;
use crate::render::primitives::Camera;
use crate::render::texture::DepthMap;

/// Directional light shared by every model in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLight {
    /// Direction the light travels, from the light towards the scene
    pub direction: [f32; 3],
    /// Constant ambient term
    pub ambient_intensity: f32,
    /// Strength of the directional term
    pub punctual_intensity: f32,
    /// Half-size of the orthographic shadow volume
    pub shadow_extent: f32,
    /// Distance from the scene center to the virtual light position
    pub shadow_distance: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: [-0.5, -0.8, -0.6],
            ambient_intensity: 0.5,
            punctual_intensity: 1.0,
            shadow_extent: 2.0,
            shadow_distance: 4.0,
        }
    }
}

impl DirectionalLight {
    /// Normalized light direction, pointing straight down when degenerate
    pub fn direction(&self) -> Vec3 {
        Vec3::from(self.direction)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| Vec3::new(0.0, -1.0, 0.0))
    }

    /// View matrix of a virtual light looking along the light direction
    pub fn view_matrix(&self, target: Vec3) -> Mat4 {
        let direction = self.direction();
        let up = if direction.y.abs() > 0.99 {
            Vec3::new(0.0, 0.0, 1.0)
        } else {
            Vec3::new(0.0, 1.0, 0.0)
        };
        let eye = target - direction * self.shadow_distance;
        Mat4::look_at(eye, target, up)
    }

    /// Orthographic projection enclosing the shadow volume
    pub fn projection_matrix(&self) -> Mat4 {
        let extent = self.shadow_extent;
        Mat4::orthographic(extent, extent, 0.0, self.shadow_distance * 2.0)
    }
}

/// Everything a model needs to update its uniforms for one frame
#[derive(Debug, Clone)]
pub struct Perframe {
    /// Seconds since the driver started
    pub frame_time: f32,
    /// Seconds since the previous frame
    pub delta_time: f32,
    /// Normalized light direction
    pub light_dir: Vec3,
    /// Camera position in world space
    pub camera_pos: Vec3,
    /// World to light view space
    pub light_view_matrix: Mat4,
    /// Light view to light clip space
    pub light_proj_matrix: Mat4,
    /// World to camera view space
    pub camera_view_matrix: Mat4,
    /// Camera view to clip space
    pub camera_proj_matrix: Mat4,
    /// Ambient light scale
    pub ambient_intensity: f32,
    /// Directional light scale
    pub punctual_intensity: f32,
    /// Depth from this frame's shadow pass, if one ran
    pub shadow_map: Option<Arc<DepthMap>>,
}

impl Default for Perframe {
    fn default() -> Self {
        Self {
            frame_time: 0.0,
            delta_time: 0.0,
            light_dir: Vec3::new(0.0, -1.0, 0.0),
            camera_pos: Vec3::zeros(),
            light_view_matrix: Mat4::identity(),
            light_proj_matrix: Mat4::identity(),
            camera_view_matrix: Mat4::identity(),
            camera_proj_matrix: Mat4::identity(),
            ambient_intensity: 0.5,
            punctual_intensity: 1.0,
            shadow_map: None,
        }
    }
}

impl Perframe {
    /// Build the context for a frame seen through `camera` and lit by `light`
    ///
    /// The light matrices frame the camera target so the shadow volume
    /// follows whatever the camera is looking at.
    pub fn from_camera(camera: &Camera, light: &DirectionalLight) -> Self {
        Self {
            light_dir: light.direction(),
            camera_pos: camera.position,
            light_view_matrix: light.view_matrix(camera.target),
            light_proj_matrix: light.projection_matrix(),
            camera_view_matrix: camera.view_matrix(),
            camera_proj_matrix: camera.projection_matrix(),
            ambient_intensity: light.ambient_intensity,
            punctual_intensity: light.punctual_intensity,
            ..Self::default()
        }
    }

    /// Fill in frame timing from a timer
    pub fn with_timer(mut self, timer: &Timer) -> Self {
        self.frame_time = timer.total_time();
        self.delta_time = timer.delta_time();
        self
    }

    /// Camera view-projection (`P × V`)
    pub fn camera_vp_matrix(&self) -> Mat4 {
        self.camera_proj_matrix * self.camera_view_matrix
    }

    /// Light view-projection (`P × V`)
    pub fn light_vp_matrix(&self) -> Mat4 {
        self.light_proj_matrix * self.light_view_matrix
    }
}
