//! Triangle rasterization engine
//!
//! [`draw_triangle`] takes the three attribute slots of a [`Program`] through
//! the whole fixed-function pipeline:
//!
//! 1. vertex shader per corner
//! 2. clipping in homogeneous clip space
//! 3. perspective divide and viewport transform
//! 4. facing / culling
//! 5. coverage with exact fixed-point edge functions
//! 6. depth test, fragment shader, blending and writes
//!
//! Malformed geometry is skipped silently. Nothing in here returns an error
//! or panics on bad input; the worst a broken triangle can do is not appear.
//!
//! # Coverage rules
//! Screen positions are snapped to [`SUBPIXEL_BITS`] bits of sub-pixel
//! precision and tested at pixel centers with integer edge functions. A
//! center lying exactly on an edge belongs to the triangle only when that
//! edge is a top-left edge, so neighbouring triangles sharing an edge shade
//! every pixel on it exactly once.

use crate::foundation::math::{utils, Vec2, Vec3, Vec4};
use crate::render::framebuffer::Framebuffer;
use crate::render::program::{Program, ProgramFlags, Varyings};

/// Sub-pixel precision of snapped screen positions
pub const SUBPIXEL_BITS: u32 = 8;

const SUBPIXEL_ONE: i64 = 1 << SUBPIXEL_BITS;
const SUBPIXEL_HALF: i64 = SUBPIXEL_ONE / 2;

/// Map a normalized device coordinate to screen space
///
/// Returns `(x, y, depth)` where `x` spans `[0, width]`, `y` spans
/// `[0, height]` with row 0 at the top, and depth maps `[-1, 1]` to `[0, 1]`.
pub fn viewport_transform(ndc: Vec3, width: u32, height: u32) -> Vec3 {
    Vec3::new(
        (ndc.x + 1.0) * 0.5 * width as f32,
        (1.0 - ndc.y) * 0.5 * height as f32,
        (ndc.z + 1.0) * 0.5,
    )
}

/// Barycentric weights of `p` with respect to a 2D triangle
///
/// Returns `None` for a degenerate (zero area) triangle. Weights may be
/// negative when `p` is outside.
pub fn barycentric(points: &[Vec2; 3], p: Vec2) -> Option<Vec3> {
    let [a, b, c] = points;
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let denominator = ab.x * ac.y - ac.x * ab.y;
    if denominator.abs() <= f32::EPSILON || !denominator.is_finite() {
        return None;
    }

    let s = (ap.x * ac.y - ac.x * ap.y) / denominator;
    let t = (ab.x * ap.y - ap.x * ab.y) / denominator;
    Some(Vec3::new(1.0 - s - t, s, t))
}

/// Rasterize the triangle described by the program's attribute slots
///
/// Returns `true` when nothing was rasterized: the triangle was degenerate,
/// non-finite, fully clipped or back-face culled.
pub fn draw_triangle<A, V, U>(framebuffer: &mut Framebuffer, program: &mut Program<A, V, U>) -> bool
where
    V: Varyings,
{
    let mut clip_coords = [Vec4::zeros(); 3];
    for (slot, clip_coord) in clip_coords.iter_mut().enumerate() {
        let varyings = &mut program.shader_varyings[slot];
        *varyings = V::zeroed();
        *clip_coord = (program.vertex_shader)(&program.attribs[slot], varyings, &program.uniforms);
    }

    if clip_coords.iter().any(|coord| !coord.iter().all(|c| c.is_finite())) {
        log::trace!("Skipping triangle with non-finite clip coordinates");
        return true;
    }

    let shader_varyings = program.shader_varyings;
    let vertex_count = program.clip.clip_triangle(&clip_coords, &shader_varyings);
    if vertex_count < 3 {
        return true;
    }

    let mut culled = true;
    for i in 1..vertex_count - 1 {
        let coords = program.clip.coords();
        let varyings = program.clip.varyings();
        let triangle_coords = [coords[0], coords[i], coords[i + 1]];
        let triangle_varyings = [varyings[0], varyings[i], varyings[i + 1]];
        if !rasterize_triangle(framebuffer, program, &triangle_coords, &triangle_varyings) {
            culled = false;
        }
    }
    culled
}

/// Screen-space triangle ready for coverage tests
struct ScreenTriangle {
    /// Snapped positions in sub-pixel units, positively oriented
    points: [(i64, i64); 3],
    /// Maps oriented corner -> original corner
    order: [usize; 3],
    /// Twice the signed area in sub-pixel units (> 0)
    area: i64,
    depths: [f32; 3],
    recip_w: [f32; 3],
}

impl ScreenTriangle {
    fn new(screen: &[Vec3; 3], recip_w: [f32; 3]) -> Option<Self> {
        let snap = |v: f32| (v * SUBPIXEL_ONE as f32).round() as i64;
        let mut points = screen.map(|p| (snap(p.x), snap(p.y)));
        let mut order = [0, 1, 2];

        let mut area = edge_function(points[0], points[1], points[2]);
        if area == 0 {
            return None;
        }
        if area < 0 {
            points.swap(1, 2);
            order.swap(1, 2);
            area = -area;
        }

        Some(Self {
            points,
            order,
            area,
            depths: [screen[0].z, screen[1].z, screen[2].z],
            recip_w,
        })
    }

    /// Pixel bounds `(min_x, min_y, max_x, max_y)` clamped to the target
    fn bounds(&self, width: u32, height: u32) -> Option<(i64, i64, i64, i64)> {
        let xs = self.points.map(|p| p.0);
        let ys = self.points.map(|p| p.1);
        let min_x = (xs.into_iter().min()? >> SUBPIXEL_BITS).max(0);
        let min_y = (ys.into_iter().min()? >> SUBPIXEL_BITS).max(0);
        let max_x = (xs.into_iter().max()? >> SUBPIXEL_BITS).min(i64::from(width) - 1);
        let max_y = (ys.into_iter().max()? >> SUBPIXEL_BITS).min(i64::from(height) - 1);
        (min_x <= max_x && min_y <= max_y).then_some((min_x, min_y, max_x, max_y))
    }

    /// Barycentric weights of a covered pixel center, indexed by original corner
    fn coverage(&self, center: (i64, i64)) -> Option<Vec3> {
        let [p0, p1, p2] = self.points;
        let edges = [(p1, p2), (p2, p0), (p0, p1)];

        let mut weights = [0.0f32; 3];
        for (opposite, (from, to)) in edges.into_iter().enumerate() {
            let value = edge_function(from, to, center);
            if value < 0 || (value == 0 && !is_top_left(from, to)) {
                return None;
            }
            weights[self.order[opposite]] = value as f32 / self.area as f32;
        }
        Some(Vec3::from(weights))
    }
}

/// Twice the signed area of `(a, b, p)`
fn edge_function(a: (i64, i64), b: (i64, i64), p: (i64, i64)) -> i64 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn is_top_left(from: (i64, i64), to: (i64, i64)) -> bool {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    dy > 0 || (dy == 0 && dx < 0)
}

/// Rasterize one clipped triangle, returning `true` when culled
fn rasterize_triangle<A, V, U>(
    framebuffer: &mut Framebuffer,
    program: &Program<A, V, U>,
    clip_coords: &[Vec4; 3],
    varyings: &[V; 3],
) -> bool
where
    V: Varyings,
{
    let recip_w = clip_coords.map(|coord| 1.0 / coord.w);
    let ndc = [0, 1, 2].map(|i| clip_coords[i].xyz() * recip_w[i]);

    // Counter-clockwise in NDC is front-facing
    let signed_area = (ndc[1].x - ndc[0].x) * (ndc[2].y - ndc[0].y)
        - (ndc[2].x - ndc[0].x) * (ndc[1].y - ndc[0].y);
    if !signed_area.is_finite() || signed_area == 0.0 {
        return true;
    }
    let backface = signed_area < 0.0;
    if backface && !program.double_sided {
        return true;
    }

    let width = framebuffer.width();
    let height = framebuffer.height();
    let screen = ndc.map(|p| viewport_transform(p, width, height));
    let Some(triangle) = ScreenTriangle::new(&screen, recip_w) else {
        return true;
    };
    let Some((min_x, min_y, max_x, max_y)) = triangle.bounds(width, height) else {
        return false;
    };

    let flags = program.flags;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let center = (
                x * SUBPIXEL_ONE + SUBPIXEL_HALF,
                y * SUBPIXEL_ONE + SUBPIXEL_HALF,
            );
            let Some(weights) = triangle.coverage(center) else {
                continue;
            };

            let index = y as usize * width as usize + x as usize;
            shade_pixel(framebuffer, program, flags, &triangle, varyings, weights, index, backface);
        }
    }
    false
}

fn shade_pixel<A, V, U>(
    framebuffer: &mut Framebuffer,
    program: &Program<A, V, U>,
    flags: ProgramFlags,
    triangle: &ScreenTriangle,
    varyings: &[V; 3],
    weights: Vec3,
    index: usize,
    backface: bool,
) where
    V: Varyings,
{
    let depth = weights.x * triangle.depths[0]
        + weights.y * triangle.depths[1]
        + weights.z * triangle.depths[2];
    let depth_passes = depth <= framebuffer.depth(index);
    if flags.contains(ProgramFlags::EARLY_DEPTH_TEST) && !depth_passes {
        return;
    }

    let perspective = Vec3::new(
        weights.x * triangle.recip_w[0],
        weights.y * triangle.recip_w[1],
        weights.z * triangle.recip_w[2],
    );
    let normalizer = perspective.x + perspective.y + perspective.z;
    if !normalizer.is_finite() || normalizer == 0.0 {
        return;
    }
    let interpolated = V::weighted_sum(varyings, perspective / normalizer);

    let mut discard = false;
    let color = (program.fragment_shader)(&interpolated, &program.uniforms, &mut discard, backface);
    if discard || !depth_passes {
        return;
    }

    if let Some(destination) = framebuffer.color(index) {
        let color = utils::saturate(color);
        let color = if flags.contains(ProgramFlags::BLEND) {
            blend(color, destination)
        } else {
            color
        };
        framebuffer.set_color(index, to_rgba8(color));
    }

    if flags.contains(ProgramFlags::DEPTH_WRITE) {
        framebuffer.set_depth(index, depth);
    }
}

/// Src-over blend of `source` onto an RGBA8 destination
fn blend(source: Vec4, destination: [u8; 4]) -> Vec4 {
    let destination = Vec4::new(
        utils::u8_to_float(destination[0]),
        utils::u8_to_float(destination[1]),
        utils::u8_to_float(destination[2]),
        utils::u8_to_float(destination[3]),
    );
    let alpha = source.w;
    let rgb = source.xyz() * alpha + destination.xyz() * (1.0 - alpha);
    Vec4::new(rgb.x, rgb.y, rgb.z, alpha + destination.w * (1.0 - alpha))
}

fn to_rgba8(color: Vec4) -> [u8; 4] {
    [
        utils::float_to_u8(color.x),
        utils::float_to_u8(color.y),
        utils::float_to_u8(color.z),
        utils::float_to_u8(color.w),
    ]
}
