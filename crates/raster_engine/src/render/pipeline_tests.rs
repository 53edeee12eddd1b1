//! End-to-end pipeline tests
//!
//! These drive `draw_triangle` through a minimal program whose vertex shader
//! passes clip positions straight through, and check coverage, depth and
//! shading rules on small framebuffers.

use std::cell::Cell;
use std::collections::HashSet;

use approx::assert_relative_eq;
use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Vec4;
use crate::render::{draw_triangle, Framebuffer, Program, ProgramFlags};

const SIZE: u32 = 64;
const BLACK: [u8; 4] = [0, 0, 0, 255];

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct TestAttribs {
    position: [f32; 4],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct TestVaryings {
    color: [f32; 4],
}

#[derive(Default)]
struct TestUniforms {
    discard: bool,
    fragment_calls: Cell<u32>,
}

fn test_vertex(attribs: &TestAttribs, varyings: &mut TestVaryings, _: &TestUniforms) -> Vec4 {
    varyings.color = attribs.color;
    Vec4::from(attribs.position)
}

fn test_fragment(varyings: &TestVaryings, uniforms: &TestUniforms, discard: &mut bool, backface: bool) -> Vec4 {
    uniforms.fragment_calls.set(uniforms.fragment_calls.get() + 1);
    *discard = uniforms.discard;
    if backface {
        Vec4::new(0.0, 0.0, 1.0, 1.0)
    } else {
        Vec4::from(varyings.color)
    }
}

type TestProgram = Program<TestAttribs, TestVaryings, TestUniforms>;

fn program(double_sided: bool, flags: ProgramFlags) -> TestProgram {
    Program::create(test_vertex, test_fragment, double_sided, flags).unwrap()
}

fn black_framebuffer() -> Framebuffer {
    let mut framebuffer = Framebuffer::new(SIZE, SIZE).unwrap();
    framebuffer.clear_color(Vec4::new(0.0, 0.0, 0.0, 1.0));
    framebuffer.clear_depth(1.0);
    framebuffer
}

/// Clip position (w = 1) of a screen-space point on the test framebuffer
fn screen_to_clip(x: f32, y: f32, z: f32) -> [f32; 4] {
    let half = SIZE as f32 / 2.0;
    [x / half - 1.0, 1.0 - y / half, z, 1.0]
}

fn set_triangle(program: &mut TestProgram, corners: [(f32, f32); 3], z: f32, color: [f32; 4]) {
    for (slot, (x, y)) in corners.into_iter().enumerate() {
        let attribs = program.attribs_mut(slot);
        attribs.position = screen_to_clip(x, y, z);
        attribs.color = color;
    }
}

fn painted(framebuffer: &Framebuffer) -> HashSet<(u32, u32)> {
    let mut pixels = HashSet::new();
    for y in 0..framebuffer.height() {
        for x in 0..framebuffer.width() {
            if framebuffer.color_at(x, y) != Some(BLACK) {
                pixels.insert((x, y));
            }
        }
    }
    pixels
}

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

// Counter-clockwise on screen once y is flipped into NDC
const RIGHT_TRIANGLE: [(f32, f32); 3] = [(10.0, 10.0), (10.0, 50.0), (50.0, 10.0)];

#[test]
fn test_right_triangle_end_to_end() {
    let mut framebuffer = black_framebuffer();
    let mut program = program(false, ProgramFlags::default());
    set_triangle(&mut program, RIGHT_TRIANGLE, 0.0, RED);

    assert!(!draw_triangle(&mut framebuffer, &mut program));

    let pixels = painted(&framebuffer);
    assert!((780..=820).contains(&pixels.len()), "covered {} pixels", pixels.len());
    for &(x, y) in &pixels {
        assert!(x >= 10 && y >= 10 && x + y <= 59, "pixel ({x}, {y}) outside the triangle");
        assert_eq!(framebuffer.color_at(x, y), Some([255, 0, 0, 255]));
        assert_relative_eq!(framebuffer.depth_at(x, y).unwrap(), 0.5, epsilon = 1e-5);
    }
    assert_eq!(framebuffer.color_at(5, 5), Some(BLACK));
    assert_eq!(framebuffer.color_at(40, 40), Some(BLACK));
    assert_eq!(framebuffer.depth_at(40, 40), Some(1.0));
}

#[test]
fn test_screen_clockwise_triangle_needs_double_sided() {
    // Same right triangle listed (10,10), (50,10), (10,50): clockwise in NDC
    let corners = [(10.0, 10.0), (50.0, 10.0), (10.0, 50.0)];

    let mut framebuffer = black_framebuffer();
    let mut single = program(false, ProgramFlags::default());
    set_triangle(&mut single, corners, 0.0, RED);
    assert!(draw_triangle(&mut framebuffer, &mut single));
    assert!(painted(&framebuffer).is_empty());

    let mut double = program(true, ProgramFlags::default());
    set_triangle(&mut double, corners, 0.0, RED);
    assert!(!draw_triangle(&mut framebuffer, &mut double));

    let pixels = painted(&framebuffer);
    assert!((780..=820).contains(&pixels.len()), "covered {} pixels", pixels.len());
    for &(x, y) in &pixels {
        assert!(x >= 10 && y >= 10 && x + y <= 59, "pixel ({x}, {y}) outside the triangle");
        // The test fragment shader paints back faces blue
        assert_eq!(framebuffer.color_at(x, y), Some([0, 0, 255, 255]));
    }
    assert_eq!(framebuffer.color_at(5, 5), Some(BLACK));
    assert_eq!(framebuffer.color_at(40, 40), Some(BLACK));
    assert_eq!(framebuffer.color_at(60, 20), Some(BLACK));
}

#[test]
fn test_shared_edge_is_shaded_once() {
    let halves = [
        [(8.0, 8.0), (8.0, 40.0), (40.0, 40.0)],
        [(8.0, 8.0), (40.0, 40.0), (40.0, 8.0)],
    ];

    let mut coverage = Vec::new();
    for corners in halves {
        let mut framebuffer = black_framebuffer();
        let mut program = program(false, ProgramFlags::default());
        set_triangle(&mut program, corners, 0.0, GREEN);
        assert!(!draw_triangle(&mut framebuffer, &mut program));
        coverage.push(painted(&framebuffer));
    }

    assert!(coverage[0].is_disjoint(&coverage[1]));
    let union: HashSet<_> = coverage[0].union(&coverage[1]).copied().collect();
    assert_eq!(union.len(), 32 * 32);
    assert!(union.iter().all(|&(x, y)| (8..40).contains(&x) && (8..40).contains(&y)));
}

#[test]
fn test_shared_edge_with_arbitrary_slope() {
    let quad = [(3.3, 5.1), (12.7, 58.2), (61.4, 49.9), (44.6, 2.2)];
    let halves = [[quad[0], quad[1], quad[2]], [quad[0], quad[2], quad[3]]];

    let mut coverage = Vec::new();
    for corners in halves {
        let mut framebuffer = black_framebuffer();
        let mut program = program(true, ProgramFlags::default());
        set_triangle(&mut program, corners, 0.0, GREEN);
        draw_triangle(&mut framebuffer, &mut program);
        coverage.push(painted(&framebuffer));
    }

    assert!(!coverage[0].is_empty() && !coverage[1].is_empty());
    assert!(coverage[0].is_disjoint(&coverage[1]));
}

#[test]
fn test_depth_test_keeps_nearest() {
    let mut framebuffer = black_framebuffer();
    let mut program = program(false, ProgramFlags::default());

    set_triangle(&mut program, RIGHT_TRIANGLE, 0.0, RED);
    draw_triangle(&mut framebuffer, &mut program);

    // Farther: rejected
    set_triangle(&mut program, RIGHT_TRIANGLE, 0.5, GREEN);
    draw_triangle(&mut framebuffer, &mut program);
    assert_eq!(framebuffer.color_at(20, 20), Some([255, 0, 0, 255]));
    assert_relative_eq!(framebuffer.depth_at(20, 20).unwrap(), 0.5, epsilon = 1e-5);

    // Nearer: wins
    set_triangle(&mut program, RIGHT_TRIANGLE, -0.5, BLUE);
    draw_triangle(&mut framebuffer, &mut program);
    assert_eq!(framebuffer.color_at(20, 20), Some([0, 0, 255, 255]));
    assert_relative_eq!(framebuffer.depth_at(20, 20).unwrap(), 0.25, epsilon = 1e-5);

    // Equal depth overwrites
    set_triangle(&mut program, RIGHT_TRIANGLE, -0.5, GREEN);
    draw_triangle(&mut framebuffer, &mut program);
    assert_eq!(framebuffer.color_at(20, 20), Some([0, 255, 0, 255]));
}

#[test]
fn test_discard_leaves_buffers_untouched() {
    let mut framebuffer = black_framebuffer();
    let before = framebuffer.clone();
    let mut program = program(false, ProgramFlags::default());
    program.uniforms_mut().discard = true;
    set_triangle(&mut program, RIGHT_TRIANGLE, 0.0, RED);

    draw_triangle(&mut framebuffer, &mut program);

    assert!(program.uniforms().fragment_calls.get() > 0);
    assert_eq!(framebuffer.color_bytes(), before.color_bytes());
    assert_eq!(framebuffer.depth_buffer(), before.depth_buffer());
}

#[test]
fn test_early_depth_skips_occluded_fragments() {
    let mut framebuffer = black_framebuffer();
    framebuffer.clear_depth(0.0);
    let mut program = program(false, ProgramFlags::default());
    set_triangle(&mut program, RIGHT_TRIANGLE, 0.0, RED);

    draw_triangle(&mut framebuffer, &mut program);

    assert_eq!(program.uniforms().fragment_calls.get(), 0);
    assert!(painted(&framebuffer).is_empty());
}

#[test]
fn test_late_depth_runs_shader_but_drops_result() {
    let mut framebuffer = black_framebuffer();
    framebuffer.clear_depth(0.0);
    let mut program = program(false, ProgramFlags::DEPTH_WRITE);
    set_triangle(&mut program, RIGHT_TRIANGLE, 0.0, RED);

    draw_triangle(&mut framebuffer, &mut program);

    assert!(program.uniforms().fragment_calls.get() >= 780);
    assert!(painted(&framebuffer).is_empty());
    assert!(framebuffer.depth_buffer().iter().all(|&depth| depth == 0.0));
}

#[test]
fn test_depth_write_disabled() {
    let mut framebuffer = black_framebuffer();
    let mut program = program(false, ProgramFlags::EARLY_DEPTH_TEST);
    set_triangle(&mut program, RIGHT_TRIANGLE, 0.0, RED);

    draw_triangle(&mut framebuffer, &mut program);

    assert_eq!(framebuffer.color_at(20, 20), Some([255, 0, 0, 255]));
    assert_eq!(framebuffer.depth_at(20, 20), Some(1.0));
}

#[test]
fn test_vertex_pixels_take_vertex_values() {
    let mut framebuffer = black_framebuffer();
    let mut program = program(false, ProgramFlags::default());
    let corners = [(4.0, 4.0), (4.0, 60.0), (60.0, 4.0)];
    for (slot, ((x, y), color)) in corners.into_iter().zip([RED, GREEN, BLUE]).enumerate() {
        let attribs = program.attribs_mut(slot);
        attribs.position = screen_to_clip(x, y, 0.0);
        attribs.color = color;
    }

    draw_triangle(&mut framebuffer, &mut program);

    // Pixels just inside each corner are dominated by that corner's color
    let near_red = framebuffer.color_at(4, 4).unwrap();
    let near_green = framebuffer.color_at(4, 58).unwrap();
    let near_blue = framebuffer.color_at(58, 4).unwrap();
    assert!(near_red[0] >= 240 && near_red[1] <= 15 && near_red[2] <= 15);
    assert!(near_green[1] >= 240 && near_green[0] <= 15);
    assert!(near_blue[2] >= 240 && near_blue[0] <= 15);
}

#[test]
fn test_constant_varyings_survive_perspective() {
    let mut framebuffer = black_framebuffer();
    let mut program = program(false, ProgramFlags::default());
    for (slot, ((x, y), w)) in RIGHT_TRIANGLE.into_iter().zip([1.0, 3.0, 7.0]).enumerate() {
        let [cx, cy, cz, _] = screen_to_clip(x, y, 0.0);
        let attribs = program.attribs_mut(slot);
        attribs.position = [cx * w, cy * w, cz * w, w];
        attribs.color = [0.6, 0.6, 0.6, 1.0];
    }

    assert!(!draw_triangle(&mut framebuffer, &mut program));

    let pixels = painted(&framebuffer);
    assert!(!pixels.is_empty());
    for (x, y) in pixels {
        assert_eq!(framebuffer.color_at(x, y), Some([153, 153, 153, 255]));
    }
}

#[test]
fn test_back_faces_are_culled_unless_double_sided() {
    let clockwise = [RIGHT_TRIANGLE[0], RIGHT_TRIANGLE[2], RIGHT_TRIANGLE[1]];

    let mut framebuffer = black_framebuffer();
    let mut single = program(false, ProgramFlags::default());
    set_triangle(&mut single, clockwise, 0.0, RED);
    assert!(draw_triangle(&mut framebuffer, &mut single));
    assert!(painted(&framebuffer).is_empty());

    let mut double = program(true, ProgramFlags::default());
    set_triangle(&mut double, clockwise, 0.0, RED);
    assert!(!draw_triangle(&mut framebuffer, &mut double));
    assert_eq!(framebuffer.color_at(20, 20), Some([0, 0, 255, 255]));
}

#[test]
fn test_degenerate_and_invalid_triangles_are_skipped() {
    let mut framebuffer = black_framebuffer();
    let before = framebuffer.clone();
    let mut program = program(true, ProgramFlags::default());

    set_triangle(&mut program, [(10.0, 10.0), (20.0, 20.0), (30.0, 30.0)], 0.0, RED);
    assert!(draw_triangle(&mut framebuffer, &mut program));

    set_triangle(&mut program, RIGHT_TRIANGLE, 0.0, RED);
    program.attribs_mut(1).position[0] = f32::NAN;
    assert!(draw_triangle(&mut framebuffer, &mut program));

    set_triangle(&mut program, RIGHT_TRIANGLE, 0.0, RED);
    program.attribs_mut(2).position[3] = f32::INFINITY;
    assert!(draw_triangle(&mut framebuffer, &mut program));

    // Entirely behind the camera
    for slot in 0..3 {
        program.attribs_mut(slot).position = [0.1 * slot as f32, 0.2, 0.0, -1.0];
    }
    assert!(draw_triangle(&mut framebuffer, &mut program));

    assert_eq!(framebuffer.color_bytes(), before.color_bytes());
    assert_eq!(program.uniforms().fragment_calls.get(), 0);
}

#[test]
fn test_offscreen_parts_are_clipped() {
    let mut framebuffer = black_framebuffer();
    let mut program = program(false, ProgramFlags::default());
    set_triangle(&mut program, [(-40.0, -40.0), (-40.0, 120.0), (120.0, -40.0)], 0.0, RED);

    assert!(!draw_triangle(&mut framebuffer, &mut program));

    // Hypotenuse x + y = 80 crosses the target
    let pixels = painted(&framebuffer);
    assert!(pixels.contains(&(0, 0)));
    assert!(pixels.contains(&(63, 0)));
    assert!(!pixels.contains(&(63, 63)));
}

#[test]
fn test_near_plane_crossing_is_clipped() {
    let mut framebuffer = black_framebuffer();
    let mut program = program(true, ProgramFlags::default());
    // Two corners in front of the camera on the NDC line y = -0.5, one behind
    program.attribs_mut(0).position = [-0.5, -0.5, 0.0, 1.0];
    program.attribs_mut(1).position = [0.5, -0.5, 0.0, 1.0];
    program.attribs_mut(2).position = [0.0, 0.5, 0.0, -0.5];
    for slot in 0..3 {
        program.attribs_mut(slot).color = RED;
    }

    assert!(!draw_triangle(&mut framebuffer, &mut program));

    // The visible part fans out from the front edge (row 48) to the top
    let pixels = painted(&framebuffer);
    assert!(pixels.len() > 1000, "covered {} pixels", pixels.len());
    assert!(pixels.contains(&(32, 47)));
    assert!(pixels.contains(&(32, 0)));
    for &(x, y) in &pixels {
        assert!(x < SIZE && y < 48, "pixel ({x}, {y}) below the front edge");
        assert_eq!(framebuffer.color_at(x, y), Some([255, 0, 0, 255]));
        assert_relative_eq!(framebuffer.depth_at(x, y).unwrap(), 0.5, epsilon = 1e-5);
    }
    assert_eq!(framebuffer.color_at(32, 50), Some(BLACK));
}

#[test]
fn test_blending_composites_over_destination() {
    let mut framebuffer = black_framebuffer();
    framebuffer.clear_color(Vec4::new(0.0, 0.0, 1.0, 1.0));
    let mut program = program(false, ProgramFlags::BLEND | ProgramFlags::EARLY_DEPTH_TEST);
    set_triangle(&mut program, RIGHT_TRIANGLE, 0.0, [1.0, 0.0, 0.0, 0.25]);

    draw_triangle(&mut framebuffer, &mut program);

    assert_eq!(framebuffer.color_at(20, 20), Some([64, 0, 191, 255]));
    assert_eq!(framebuffer.color_at(60, 60), Some([0, 0, 255, 255]));
}

#[test]
fn test_depth_only_target_records_depth() {
    let mut framebuffer = Framebuffer::depth_only(SIZE, SIZE).unwrap();
    let mut program = program(false, ProgramFlags::default());
    set_triangle(&mut program, RIGHT_TRIANGLE, 0.5, RED);

    assert!(!draw_triangle(&mut framebuffer, &mut program));

    assert_relative_eq!(framebuffer.depth_at(20, 20).unwrap(), 0.75, epsilon = 1e-5);
    assert_eq!(framebuffer.depth_at(60, 60), Some(1.0));
}
