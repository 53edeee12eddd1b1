//! # Rendering System
//!
//! CPU rasterization pipeline: typed shader programs, clipping, coverage,
//! depth testing and the framebuffers they draw into.
//!
//! ## Architecture
//!
//! - **Program**: vertex/fragment shader pair with typed attribute, varying
//!   and uniform buffers
//! - **Graphics**: `draw_triangle`, the fixed-function path from attribute
//!   slots to pixels
//! - **Clipping**: homogeneous clip-space polygon clipping
//! - **Framebuffer / Texture**: render targets and sampled images
//! - **Perframe**: per-frame camera, light and timing snapshot
//! - **Primitives**: meshes, vertices and the camera
//!
//! ## Design Goals
//!
//! - **No global state**: every draw names its framebuffer and program
//! - **Geometry never fails**: bad triangles are skipped, not reported
//! - **Exact coverage**: shared edges are rasterized exactly once

pub mod clipping;
pub mod framebuffer;
pub mod graphics;
pub mod perframe;
pub mod primitives;
pub mod program;
pub mod texture;

#[cfg(test)]
mod pipeline_tests;

pub use framebuffer::{Framebuffer, FramebufferError};
pub use graphics::{barycentric, draw_triangle, viewport_transform};
pub use perframe::{DirectionalLight, Perframe};
pub use primitives::{Camera, Mesh, MeshError, Vertex};
pub use program::{
    FragmentShader, Program, ProgramError, ProgramFlags, Varyings, VertexShader, ATTRIB_SLOTS,
};
pub use texture::{DepthMap, Texture, TextureError};
