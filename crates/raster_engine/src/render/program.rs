//! Programmable shading contract
//!
//! A [`Program`] bundles a vertex shader, a fragment shader and the typed
//! buffers they communicate through:
//!
//! - three **attribute** slots of type `A`, one per triangle corner, filled
//!   by the caller before every [`draw_triangle`](super::graphics::draw_triangle)
//! - **varyings** of type `V`, written by the vertex shader once per corner
//!   and interpolated across the triangle for the fragment shader
//! - one **uniforms** value of type `U`, shared by every invocation
//!
//! The buffer types are fixed by the type parameters, so a buffer can never
//! be reinterpreted at a different size than the one it was created with.
//!
//! # Example
//! ```rust
//! use raster_engine::foundation::math::Vec4;
//! use raster_engine::render::{Program, ProgramFlags};
//!
//! #[repr(C)]
//! #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
//! struct Attribs { position: [f32; 3] }
//!
//! #[repr(C)]
//! #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
//! struct Varyings { shade: [f32; 1] }
//!
//! #[derive(Default)]
//! struct Uniforms { gray: f32 }
//!
//! fn vertex(attribs: &Attribs, varyings: &mut Varyings, uniforms: &Uniforms) -> Vec4 {
//!     varyings.shade = [uniforms.gray];
//!     let [x, y, z] = attribs.position;
//!     Vec4::new(x, y, z, 1.0)
//! }
//!
//! fn fragment(varyings: &Varyings, _: &Uniforms, _: &mut bool, _: bool) -> Vec4 {
//!     let s = varyings.shade[0];
//!     Vec4::new(s, s, s, 1.0)
//! }
//!
//! let mut program = Program::create(vertex, fragment, false, ProgramFlags::default())?;
//! program.uniforms_mut().gray = 0.5;
//! program.attribs_mut(0).position = [0.0, 0.5, 0.0];
//! # Ok::<(), raster_engine::render::ProgramError>(())
//! ```

use std::collections::TryReserveError;
use std::mem::{align_of, size_of};

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::foundation::math::{Vec3, Vec4};
use crate::render::clipping::ClipBuffers;

/// Number of attribute slots (one per triangle corner)
pub const ATTRIB_SLOTS: usize = 3;

/// Vertex shader: attributes + uniforms in, varyings written, clip position out
pub type VertexShader<A, V, U> = fn(&A, &mut V, &U) -> Vec4;

/// Fragment shader: interpolated varyings + uniforms in, RGBA out
///
/// The `&mut bool` is the discard flag; the trailing `bool` is true for
/// back-facing triangles.
pub type FragmentShader<V, U> = fn(&V, &U, &mut bool, bool) -> Vec4;

bitflags! {
    /// Per-program raster state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProgramFlags: u32 {
        /// Src-over alpha blend fragment colors into the color buffer
        const BLEND = 1 << 0;
        /// Run the depth test before the fragment shader
        const EARLY_DEPTH_TEST = 1 << 1;
        /// Write passing fragment depths to the depth buffer
        const DEPTH_WRITE = 1 << 2;
    }
}

impl Default for ProgramFlags {
    fn default() -> Self {
        Self::EARLY_DEPTH_TEST | Self::DEPTH_WRITE
    }
}

/// Program creation errors
#[derive(Error, Debug)]
pub enum ProgramError {
    /// One of the buffer types has size zero
    #[error("Program buffer `{buffer}` has zero size")]
    ZeroSized {
        /// Which buffer: attribs, varyings or uniforms
        buffer: &'static str,
    },

    /// The varyings type cannot be viewed as a flat run of `f32`s
    #[error("Varyings of {size} bytes (align {align}) are not a whole number of f32 components")]
    VaryingsLayout {
        /// `size_of::<V>()`
        size: usize,
        /// `align_of::<V>()`
        align: usize,
    },

    /// Buffer storage could not be reserved
    #[error("Failed to allocate program buffers: {0}")]
    Allocation(#[from] TryReserveError),
}

/// Interpolatable shader outputs
///
/// Varyings are plain records of `f32` components (`[f32; N]` fields in a
/// `#[repr(C)]` struct). The rasterizer treats them as a flat `f32` slice and
/// interpolates every component the same way.
///
/// # Panics
/// The provided methods panic if `Self` is not a whole number of
/// `f32`-aligned components. [`Program::create`] rejects such types up front.
pub trait Varyings: Pod {
    /// Flat component view
    fn components(&self) -> &[f32] {
        bytemuck::cast_slice(std::slice::from_ref(self))
    }

    /// Mutable flat component view
    fn components_mut(&mut self) -> &mut [f32] {
        bytemuck::cast_slice_mut(std::slice::from_mut(self))
    }

    /// Linear blend `self + (other - self) * t`, component-wise
    fn lerp(&self, other: &Self, t: f32) -> Self {
        let mut result = Self::zeroed();
        for ((out, a), b) in result
            .components_mut()
            .iter_mut()
            .zip(self.components())
            .zip(other.components())
        {
            *out = a + (b - a) * t;
        }
        result
    }

    /// Weighted sum of three corner values
    fn weighted_sum(corners: &[Self; 3], weights: Vec3) -> Self {
        let mut result = Self::zeroed();
        let [v0, v1, v2] = corners;
        for (((out, a), b), c) in result
            .components_mut()
            .iter_mut()
            .zip(v0.components())
            .zip(v1.components())
            .zip(v2.components())
        {
            *out = a * weights.x + b * weights.y + c * weights.z;
        }
        result
    }
}

impl<T: Pod> Varyings for T {}

/// Vertex/fragment shader pair plus its typed buffers
pub struct Program<A, V, U> {
    pub(crate) vertex_shader: VertexShader<A, V, U>,
    pub(crate) fragment_shader: FragmentShader<V, U>,
    pub(crate) double_sided: bool,
    pub(crate) flags: ProgramFlags,
    pub(crate) attribs: Vec<A>,
    pub(crate) uniforms: U,
    /// Per-corner vertex shader outputs
    pub(crate) shader_varyings: [V; ATTRIB_SLOTS],
    pub(crate) clip: ClipBuffers<V>,
}

impl<A, V, U> Program<A, V, U>
where
    A: Pod,
    V: Varyings,
    U: Default,
{
    /// Create a program with zero-initialized buffers
    ///
    /// # Arguments
    /// * `vertex_shader` - Runs once per corner, returns the clip position
    /// * `fragment_shader` - Runs once per covered pixel
    /// * `double_sided` - Rasterize back-facing triangles instead of culling
    /// * `flags` - Blend / depth state
    ///
    /// # Errors
    /// [`ProgramError::ZeroSized`] when `A`, `V` or `U` has size zero,
    /// [`ProgramError::VaryingsLayout`] when `V` is not a run of `f32`s,
    /// [`ProgramError::Allocation`] when storage cannot be reserved.
    pub fn create(
        vertex_shader: VertexShader<A, V, U>,
        fragment_shader: FragmentShader<V, U>,
        double_sided: bool,
        flags: ProgramFlags,
    ) -> Result<Self, ProgramError> {
        for (buffer, size) in [
            ("attribs", size_of::<A>()),
            ("varyings", size_of::<V>()),
            ("uniforms", size_of::<U>()),
        ] {
            if size == 0 {
                return Err(ProgramError::ZeroSized { buffer });
            }
        }

        if size_of::<V>() % size_of::<f32>() != 0 || align_of::<V>() < align_of::<f32>() {
            return Err(ProgramError::VaryingsLayout {
                size: size_of::<V>(),
                align: align_of::<V>(),
            });
        }

        let mut attribs = Vec::new();
        attribs.try_reserve_exact(ATTRIB_SLOTS)?;
        attribs.resize(ATTRIB_SLOTS, A::zeroed());

        log::debug!(
            "Created program (attribs {}B, varyings {}B, uniforms {}B, flags {:?})",
            size_of::<A>(),
            size_of::<V>(),
            size_of::<U>(),
            flags
        );

        Ok(Self {
            vertex_shader,
            fragment_shader,
            double_sided,
            flags,
            attribs,
            uniforms: U::default(),
            shader_varyings: [V::zeroed(); ATTRIB_SLOTS],
            clip: ClipBuffers::new()?,
        })
    }
}

impl<A, V, U> Program<A, V, U> {
    /// Shared uniform buffer
    pub fn uniforms(&self) -> &U {
        &self.uniforms
    }

    /// Mutable uniform buffer
    pub fn uniforms_mut(&mut self) -> &mut U {
        &mut self.uniforms
    }

    /// Attributes of one corner
    ///
    /// # Panics
    /// `slot` must be below [`ATTRIB_SLOTS`].
    pub fn attribs(&self, slot: usize) -> &A {
        debug_assert!(slot < ATTRIB_SLOTS, "attribute slot {slot} out of range");
        &self.attribs[slot]
    }

    /// Mutable attributes of one corner
    ///
    /// # Panics
    /// `slot` must be below [`ATTRIB_SLOTS`].
    pub fn attribs_mut(&mut self, slot: usize) -> &mut A {
        debug_assert!(slot < ATTRIB_SLOTS, "attribute slot {slot} out of range");
        &mut self.attribs[slot]
    }

    /// Whether back faces are rasterized
    pub fn double_sided(&self) -> bool {
        self.double_sided
    }

    /// Raster state flags
    pub fn flags(&self) -> ProgramFlags {
        self.flags
    }

    /// Replace the raster state flags
    pub fn set_flags(&mut self, flags: ProgramFlags) {
        self.flags = flags;
    }

    /// Release the program and all of its buffers
    pub fn release(self) {
        log::debug!("Released program");
    }
}
