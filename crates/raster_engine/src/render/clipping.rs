//! Homogeneous clip-space polygon clipping
//!
//! Triangles are clipped against seven planes before the perspective divide:
//! `w >= EPSILON` plus the six sides of the canonical view volume
//! (`-w <= x, y, z <= w`). Intersection points interpolate the clip position
//! and every varying linearly in clip space, which stays perspective-correct
//! because both are affine there.

use std::collections::TryReserveError;

use crate::foundation::math::Vec4;
use crate::render::program::Varyings;

/// Minimum `w` a vertex may keep after clipping
pub const EPSILON: f32 = 1e-5;

/// Upper bound on vertices after clipping a triangle against seven planes
pub const MAX_CLIP_VERTICES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plane {
    PositiveW,
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

const PLANES: [Plane; 7] = [
    Plane::PositiveW,
    Plane::PositiveX,
    Plane::NegativeX,
    Plane::PositiveY,
    Plane::NegativeY,
    Plane::PositiveZ,
    Plane::NegativeZ,
];

impl Plane {
    /// Signed distance, non-negative on the visible side
    fn distance(self, coord: &Vec4) -> f32 {
        match self {
            Plane::PositiveW => coord.w - EPSILON,
            Plane::PositiveX => coord.w - coord.x,
            Plane::NegativeX => coord.w + coord.x,
            Plane::PositiveY => coord.w - coord.y,
            Plane::NegativeY => coord.w + coord.y,
            Plane::PositiveZ => coord.w - coord.z,
            Plane::NegativeZ => coord.w + coord.z,
        }
    }
}

fn is_vertex_visible(coord: &Vec4) -> bool {
    coord.x.abs() <= coord.w && coord.y.abs() <= coord.w && coord.z.abs() <= coord.w
}

/// Scratch storage for clipping, owned by a program
///
/// Two ping-pong polygon buffers sized for the worst case so clipping never
/// allocates during a draw.
#[derive(Debug, Clone)]
pub struct ClipBuffers<V> {
    in_coords: Vec<Vec4>,
    in_varyings: Vec<V>,
    out_coords: Vec<Vec4>,
    out_varyings: Vec<V>,
}

impl<V: Varyings> ClipBuffers<V> {
    /// Reserve buffers for [`MAX_CLIP_VERTICES`] vertices
    pub fn new() -> Result<Self, TryReserveError> {
        let mut buffers = Self {
            in_coords: Vec::new(),
            in_varyings: Vec::new(),
            out_coords: Vec::new(),
            out_varyings: Vec::new(),
        };
        buffers.in_coords.try_reserve_exact(MAX_CLIP_VERTICES)?;
        buffers.in_varyings.try_reserve_exact(MAX_CLIP_VERTICES)?;
        buffers.out_coords.try_reserve_exact(MAX_CLIP_VERTICES)?;
        buffers.out_varyings.try_reserve_exact(MAX_CLIP_VERTICES)?;
        Ok(buffers)
    }

    /// Clip one triangle, returning the number of polygon vertices produced
    ///
    /// The polygon is left in [`coords`](Self::coords) and
    /// [`varyings`](Self::varyings). A fully visible triangle is copied
    /// through untouched; a triangle entirely outside any plane yields 0.
    pub fn clip_triangle(&mut self, coords: &[Vec4; 3], varyings: &[V; 3]) -> usize {
        self.out_coords.clear();
        self.out_varyings.clear();

        if coords.iter().all(is_vertex_visible) {
            self.out_coords.extend_from_slice(coords);
            self.out_varyings.extend_from_slice(varyings);
            return 3;
        }

        self.out_coords.extend_from_slice(coords);
        self.out_varyings.extend_from_slice(varyings);
        for plane in PLANES {
            std::mem::swap(&mut self.in_coords, &mut self.out_coords);
            std::mem::swap(&mut self.in_varyings, &mut self.out_varyings);
            self.clip_against(plane);
            if self.out_coords.len() < 3 {
                self.out_coords.clear();
                self.out_varyings.clear();
                return 0;
            }
        }
        self.out_coords.len()
    }

    fn clip_against(&mut self, plane: Plane) {
        self.out_coords.clear();
        self.out_varyings.clear();

        let count = self.in_coords.len();
        for i in 0..count {
            let prev = (i + count - 1) % count;
            let prev_coord = self.in_coords[prev];
            let curr_coord = self.in_coords[i];
            let prev_distance = plane.distance(&prev_coord);
            let curr_distance = plane.distance(&curr_coord);
            let prev_inside = prev_distance >= 0.0;
            let curr_inside = curr_distance >= 0.0;

            if prev_inside != curr_inside {
                let ratio = prev_distance / (prev_distance - curr_distance);
                self.out_coords.push(prev_coord.lerp(&curr_coord, ratio));
                let varying = self.in_varyings[prev].lerp(&self.in_varyings[i], ratio);
                self.out_varyings.push(varying);
            }

            if curr_inside {
                self.out_coords.push(curr_coord);
                self.out_varyings.push(self.in_varyings[i]);
            }
        }
    }

    /// Clip positions of the last clipped polygon
    pub fn coords(&self) -> &[Vec4] {
        &self.out_coords
    }

    /// Varyings of the last clipped polygon
    pub fn varyings(&self) -> &[V] {
        &self.out_varyings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn buffers() -> ClipBuffers<[f32; 1]> {
        ClipBuffers::new().unwrap()
    }

    #[test]
    fn test_visible_triangle_passes_through() {
        let coords = [
            Vec4::new(-0.5, -0.5, 0.1, 1.0),
            Vec4::new(0.5, -0.5, 0.2, 1.0),
            Vec4::new(0.0, 0.5, 0.3, 1.0),
        ];
        let varyings = [[1.0], [2.0], [3.0]];
        let mut clip = buffers();

        assert_eq!(clip.clip_triangle(&coords, &varyings), 3);
        assert_eq!(clip.coords(), &coords);
        assert_eq!(clip.varyings(), &varyings);
    }

    #[test]
    fn test_triangle_beyond_one_plane_is_removed() {
        let coords = [
            Vec4::new(2.0, 0.0, 0.0, 1.0),
            Vec4::new(3.0, 0.5, 0.0, 1.0),
            Vec4::new(2.5, -0.5, 0.0, 1.0),
        ];
        let mut clip = buffers();

        assert_eq!(clip.clip_triangle(&coords, &[[0.0]; 3]), 0);
        assert!(clip.coords().is_empty());
    }

    #[test]
    fn test_triangle_behind_camera_is_removed() {
        let coords = [
            Vec4::new(0.0, 0.0, 0.0, -1.0),
            Vec4::new(1.0, 0.0, 0.0, -2.0),
            Vec4::new(0.0, 1.0, 0.0, -1.0),
        ];
        let mut clip = buffers();

        assert_eq!(clip.clip_triangle(&coords, &[[0.0]; 3]), 0);
    }

    #[test]
    fn test_partial_triangle_stays_in_volume() {
        let coords = [
            Vec4::new(0.0, 0.0, 0.0, 1.0),
            Vec4::new(2.0, 0.0, 0.0, 1.0),
            Vec4::new(0.0, 0.5, 0.0, 1.0),
        ];
        let varyings = [[0.0], [2.0], [0.0]];
        let mut clip = buffers();

        let count = clip.clip_triangle(&coords, &varyings);
        assert_eq!(count, 4);
        for coord in clip.coords() {
            assert!(coord.x <= coord.w + 1e-6);
        }

        // The cut along x = 1 lands halfway along the edge towards x = 2
        let cut = clip
            .coords()
            .iter()
            .zip(clip.varyings())
            .find(|(coord, _)| (coord.x - 1.0).abs() < 1e-6 && coord.y == 0.0)
            .map(|(_, varying)| varying[0]);
        assert_relative_eq!(cut.unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_polygon_count_is_bounded() {
        // Large triangle crossing every side plane
        let coords = [
            Vec4::new(-3.0, -3.0, 0.0, 1.0),
            Vec4::new(3.0, -3.0, 0.0, 1.0),
            Vec4::new(0.0, 4.0, 0.0, 1.0),
        ];
        let mut clip = buffers();

        let count = clip.clip_triangle(&coords, &[[0.0]; 3]);
        assert!((3..=MAX_CLIP_VERTICES).contains(&count));
    }
}
