//! Shader kinds and the model abstraction
//!
//! Every shader kind pairs a [`Program`](crate::render::Program) with a mesh
//! and knows how to fill its attribute slots and uniforms. The scene only
//! sees the [`Model`] trait; which program sits behind it is decided once at
//! construction.
//!
//! ## Shader Kinds
//!
//! - [`unlit`]: base color × per-corner color × texture, no lighting
//! - [`blinn`]: Blinn-Phong with ambient, diffuse, specular and shadow map

pub mod blinn;
pub mod unlit;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::MeshCache;
use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::{Framebuffer, Mesh, MeshError, Perframe, ProgramError, ProgramFlags, Texture, TextureError};

pub use blinn::BlinnModel;
pub use unlit::UnlitModel;

/// Model creation errors
#[derive(Error, Debug)]
pub enum ModelError {
    /// The mesh could not be loaded
    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),

    /// The program could not be created
    #[error("Program error: {0}")]
    Program(#[from] ProgramError),

    /// A texture could not be loaded
    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),
}

/// Which shader a model is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShaderKind {
    /// Unlit colors
    #[default]
    Unlit,
    /// Blinn-Phong lighting
    Blinn,
}

/// Surface parameters shared by the shader kinds
#[derive(Debug, Clone)]
pub struct Material {
    /// Multiplies every fragment color
    pub base_factor: Vec4,
    /// Optional base / diffuse texture
    pub texture: Option<Arc<Texture>>,
    /// Fragments with alpha below this are discarded (0 disables)
    pub alpha_cutoff: f32,
    /// Opaque models write depth; transparent ones blend
    pub opaque: bool,
    /// Rasterize back faces too (blinn only; unlit always does)
    pub double_sided: bool,
    /// Specular strength (blinn only)
    pub specular_factor: f32,
    /// Specular exponent (blinn only)
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_factor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            texture: None,
            alpha_cutoff: 0.0,
            opaque: true,
            double_sided: false,
            specular_factor: 0.5,
            shininess: 32.0,
        }
    }
}

impl Material {
    /// Raster state for this material
    pub fn program_flags(&self) -> ProgramFlags {
        if self.opaque {
            ProgramFlags::default()
        } else {
            ProgramFlags::BLEND | ProgramFlags::EARLY_DEPTH_TEST
        }
    }
}

/// Metadata every model carries regardless of shader kind
#[derive(Debug, Clone)]
pub struct ModelDesc {
    /// Shared mesh handle from the [`MeshCache`]
    pub mesh: Arc<Mesh>,
    /// Model to world transform
    pub transform: Mat4,
    /// Opaque models sort front-to-back, transparent ones back-to-front
    pub opaque: bool,
    /// View distance computed by the scene each frame
    pub distance: f32,
}

impl ModelDesc {
    /// Describe a model at `transform` drawing `mesh`
    pub fn new(mesh: Arc<Mesh>, transform: Mat4, opaque: bool) -> Self {
        Self {
            mesh,
            transform,
            opaque,
            distance: 0.0,
        }
    }

    /// Bounding box center in world space
    pub fn world_center(&self) -> Vec3 {
        let center = self.mesh.center();
        let world = self.transform * Vec4::new(center.x, center.y, center.z, 1.0);
        world.xyz()
    }
}

/// Drawable model: a mesh bound to a shader program
///
/// Implementations provide the program-specific `update` / `draw` /
/// `release`; the bookkeeping accessors come from [`ModelDesc`].
pub trait Model {
    /// Refresh uniforms from the frame context
    fn update(&mut self, perframe: &Perframe);

    /// Rasterize every face of the mesh into `framebuffer`
    fn draw(&mut self, framebuffer: &mut Framebuffer, shadow_pass: bool);

    /// Release the program and give the mesh back to the cache
    fn release(self: Box<Self>, cache: &mut MeshCache);

    /// Toggle the early depth test of the underlying program
    fn set_early_depth_test(&mut self, enabled: bool);

    /// Shared model metadata
    fn desc(&self) -> &ModelDesc;

    /// Mutable shared model metadata
    fn desc_mut(&mut self) -> &mut ModelDesc;

    /// Whether the model writes depth and sorts front-to-back
    fn opaque(&self) -> bool {
        self.desc().opaque
    }

    /// Sort distance from the last frame
    fn distance(&self) -> f32 {
        self.desc().distance
    }

    /// Record the sort distance for this frame
    fn set_distance(&mut self, distance: f32) {
        self.desc_mut().distance = distance;
    }

    /// Model to world transform
    fn transform(&self) -> &Mat4 {
        &self.desc().transform
    }

    /// Mesh being drawn
    fn mesh(&self) -> &Mesh {
        &self.desc().mesh
    }
}

/// Build a boxed model of the given shader kind
///
/// # Arguments
/// * `kind` - Shader to draw with
/// * `cache` - Mesh cache the mesh is acquired from
/// * `mesh` - Mesh name understood by the cache
/// * `transform` - Model to world transform
/// * `material` - Surface parameters
pub fn create_model(
    kind: ShaderKind,
    cache: &mut MeshCache,
    mesh: &str,
    transform: Mat4,
    material: &Material,
) -> Result<Box<dyn Model>, ModelError> {
    let model: Box<dyn Model> = match kind {
        ShaderKind::Unlit => Box::new(UnlitModel::new(cache, mesh, transform, material)?),
        ShaderKind::Blinn => Box::new(BlinnModel::new(cache, mesh, transform, material)?),
    };
    log::info!("Created {:?} model for mesh {}", kind, mesh);
    Ok(model)
}

/// Clear or set the early depth bit of a flag set
pub(crate) fn with_early_depth(flags: ProgramFlags, enabled: bool) -> ProgramFlags {
    let mut flags = flags;
    flags.set(ProgramFlags::EARLY_DEPTH_TEST, enabled);
    flags
}
