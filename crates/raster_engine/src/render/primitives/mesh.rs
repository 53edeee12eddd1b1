//! Mesh representation for 3D models
//!
//! A [`Mesh`] is immutable triangle soup: a flat, ordered list of vertices
//! where every consecutive triple forms one face. Meshes are loaded once and
//! shared between models through the
//! [`MeshCache`](crate::assets::MeshCache), so nothing here hands out
//! mutable access after construction.
//!
//! # Vertex Layout
//! Each face corner carries its own position, normal and texture coordinate.
//! Storing corners instead of indexed vertices duplicates shared positions,
//! but it lets the draw loop fill the three attribute slots of a program
//! straight from `faces()` without an index lookup.

use thiserror::Error;

use crate::foundation::math::Vec3;

/// Mesh construction and loading errors
#[derive(Error, Debug)]
pub enum MeshError {
    /// IO error while reading a mesh file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A token could not be parsed
    #[error("Parse error on line {line}: {message}")]
    Parse {
        /// 1-based source line
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Structurally invalid mesh data
    #[error("Invalid mesh: {0}")]
    InvalidFormat(String),

    /// The requested mesh does not exist
    #[error("Mesh not found: {0}")]
    NotFound(String),
}

/// 3D vertex data structure for rendering
///
/// Represents a single face corner with position, normal, and texture
/// coordinate data.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// 3D mesh stored as a flat list of triangle corners
///
/// # Invariants
/// - `vertices.len()` is a multiple of 3
/// - the data never changes after construction
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    bbox_min: Vec3,
    bbox_max: Vec3,
}

impl Mesh {
    /// Create a new mesh from face corners (3 per face)
    ///
    /// # Errors
    /// Returns [`MeshError::InvalidFormat`] when the vertex count is not a
    /// multiple of 3.
    pub fn new(vertices: Vec<Vertex>) -> Result<Self, MeshError> {
        if vertices.len() % 3 != 0 {
            return Err(MeshError::InvalidFormat(format!(
                "vertex count {} is not a multiple of 3",
                vertices.len()
            )));
        }

        let (bbox_min, bbox_max) = Self::bounds(&vertices);
        Ok(Self {
            vertices,
            bbox_min,
            bbox_max,
        })
    }

    fn bounds(vertices: &[Vertex]) -> (Vec3, Vec3) {
        if vertices.is_empty() {
            return (Vec3::zeros(), Vec3::zeros());
        }

        let mut min = Vec3::repeat(f32::MAX);
        let mut max = Vec3::repeat(f32::MIN);
        for vertex in vertices {
            let position = Vec3::from(vertex.position);
            min = min.inf(&position);
            max = max.sup(&position);
        }
        (min, max)
    }

    /// Number of triangular faces
    pub fn face_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// All face corners in storage order
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Iterate faces in storage order, three corners each
    pub fn faces(&self) -> impl Iterator<Item = &[Vertex]> + '_ {
        self.vertices.chunks_exact(3)
    }

    /// Minimum corner of the model-space bounding box
    pub fn bbox_min(&self) -> Vec3 {
        self.bbox_min
    }

    /// Maximum corner of the model-space bounding box
    pub fn bbox_max(&self) -> Vec3 {
        self.bbox_max
    }

    /// Center of the model-space bounding box
    ///
    /// Used by the scene to compute per-model sort distances.
    pub fn center(&self) -> Vec3 {
        (self.bbox_min + self.bbox_max) * 0.5
    }

    /// Create a unit cube centered at the origin
    ///
    /// Faces wind counter-clockwise when seen from outside, so all twelve
    /// triangles are front-facing from their visible side.
    pub fn cube() -> Self {
        // (normal, tangent u, tangent v) per face; u x v == normal
        let sides: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut vertices = Vec::with_capacity(36);
        for (normal, u, v) in sides {
            let corner = |(a, b): (f32, f32)| {
                let position = [
                    normal[0] + a * u[0] + b * v[0],
                    normal[1] + a * u[1] + b * v[1],
                    normal[2] + a * u[2] + b * v[2],
                ];
                Vertex::new(position, normal, [(a + 1.0) * 0.5, (b + 1.0) * 0.5])
            };
            for index in [0, 1, 2, 2, 3, 0] {
                vertices.push(corner(corners[index]));
            }
        }

        let (bbox_min, bbox_max) = Self::bounds(&vertices);
        Self {
            vertices,
            bbox_min,
            bbox_max,
        }
    }
}
