//! # 3D Camera System
//!
//! Provides the perspective camera the frame driver uses to fill the
//! per-frame context.
//!
//! ## Design Principles
//! - **Immutable operation**: Matrix getters never modify camera state
//! - **OpenGL conventions**: Right-handed Y-up view space looking down -Z,
//!   NDC depth in [-1, 1], matching what the rasterizer clips against

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// Default vertical field of view in degrees
pub const DEFAULT_FOVY_DEGREES: f32 = 60.0;

/// Default near clipping plane distance
pub const DEFAULT_NEAR: f32 = 0.1;

/// Default far clipping plane distance
pub const DEFAULT_FAR: f32 = 10000.0;

/// 3D Camera for perspective projection
///
/// Represents a camera in 3D space with position, orientation, and projection
/// parameters.
///
/// # Performance Notes
/// Matrix calculations are performed on-demand rather than cached. The
/// driver calls each getter once per frame, so caching would buy nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height) for projection calculations
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a new perspective camera with standard Y-up orientation
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the framebuffer
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// # Example
    /// ```rust
    /// use raster_engine::foundation::math::Vec3;
    /// use raster_engine::render::Camera;
    ///
    /// let camera = Camera::perspective(Vec3::new(0.0, 0.0, 3.0), 60.0, 4.0 / 3.0, 0.1, 100.0);
    /// assert_eq!(camera.target, Vec3::zeros());
    /// ```
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Configure camera to look at a specific point with custom up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }

    /// Update camera aspect ratio for framebuffer changes
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// Unit vector from the camera position towards the target
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Orbit the camera around its target
    ///
    /// Rotates the offset from target to camera by `yaw` radians about the
    /// world Y axis and `pitch` radians about the camera's right axis. Pitch
    /// is clamped so the camera never flips over the pole.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        let offset = self.position - self.target;
        let radius = offset.magnitude();
        if radius <= f32::EPSILON {
            return;
        }

        let current_pitch = (offset.y / radius).asin();
        let current_yaw = offset.x.atan2(offset.z);
        let limit = 89.0_f32.to_radians();
        let new_pitch = utils::clamp(current_pitch + pitch, -limit, limit);
        let new_yaw = current_yaw + yaw;

        let new_offset = Vec3::new(
            radius * new_pitch.cos() * new_yaw.sin(),
            radius * new_pitch.sin(),
            radius * new_pitch.cos() * new_yaw.cos(),
        );
        self.set_position(self.target + new_offset);
    }

    /// Generate view matrix for world-to-camera space transformation
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// Generate perspective projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// Generate combined view-projection matrix (`P × V`)
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Default for Camera {
    /// Camera two units in front of the origin looking at it
    fn default() -> Self {
        Self::perspective(
            Vec3::new(0.0, 0.0, 2.0),
            DEFAULT_FOVY_DEGREES,
            1.0,
            DEFAULT_NEAR,
            DEFAULT_FAR,
        )
    }
}
