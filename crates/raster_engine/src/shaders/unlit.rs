//! Unlit shader
//!
//! Colors each fragment with `base_factor × corner color × base texture`.
//! Every face gets the same corner colors (red, green, blue for corners 0, 1
//! and 2), which makes winding and interpolation visible at a glance. Unlit
//! models always rasterize both faces of every triangle.
//!
//! In the shadow pass the vertex shader projects through the light matrix
//! and the fragment shader only applies the alpha cutoff, so the pass writes
//! depth and nothing else.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::assets::MeshCache;
use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};
use crate::render::{draw_triangle, Framebuffer, Perframe, Program, Texture};
use crate::shaders::{with_early_depth, Material, Model, ModelDesc, ModelError};

/// Per-corner colors assigned in face order
pub const CORNER_COLORS: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Per-corner inputs
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UnlitAttribs {
    /// Model-space position
    pub position: [f32; 3],
    /// Corner color
    pub color: [f32; 3],
    /// Texture coordinate
    pub texcoord: [f32; 2],
}

/// Interpolated vertex outputs
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UnlitVaryings {
    /// World-space position
    pub world_position: [f32; 3],
    /// Corner color
    pub color: [f32; 3],
    /// Texture coordinate
    pub texcoord: [f32; 2],
}

/// Values shared by every corner and fragment of a draw
#[derive(Debug, Clone)]
pub struct UnlitUniforms {
    /// Camera position in world space
    pub camera_pos: Vec3,
    /// Model to world
    pub model_matrix: Mat4,
    /// World to camera clip space
    pub camera_vp_matrix: Mat4,
    /// World to light clip space
    pub light_vp_matrix: Mat4,
    /// Whether the current draw is the shadow pass
    pub shadow_pass: bool,
    /// Color multiplier
    pub base_factor: Vec4,
    /// Optional base texture
    pub base_texture: Option<Arc<Texture>>,
    /// Alpha below which fragments are discarded (0 disables)
    pub alpha_cutoff: f32,
}

impl Default for UnlitUniforms {
    fn default() -> Self {
        Self {
            camera_pos: Vec3::zeros(),
            model_matrix: Mat4::identity(),
            camera_vp_matrix: Mat4::identity(),
            light_vp_matrix: Mat4::identity(),
            shadow_pass: false,
            base_factor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            base_texture: None,
            alpha_cutoff: 0.0,
        }
    }
}

/// Unlit vertex shader
pub fn unlit_vertex_shader(attribs: &UnlitAttribs, varyings: &mut UnlitVaryings, uniforms: &UnlitUniforms) -> Vec4 {
    let [x, y, z] = attribs.position;
    let world_position = uniforms.model_matrix * Vec4::new(x, y, z, 1.0);

    varyings.world_position = world_position.xyz().into();
    varyings.color = attribs.color;
    varyings.texcoord = attribs.texcoord;

    if uniforms.shadow_pass {
        uniforms.light_vp_matrix * world_position
    } else {
        uniforms.camera_vp_matrix * world_position
    }
}

/// Unlit fragment shader
pub fn unlit_fragment_shader(
    varyings: &UnlitVaryings,
    uniforms: &UnlitUniforms,
    discard: &mut bool,
    _backface: bool,
) -> Vec4 {
    let [r, g, b] = varyings.color;
    let mut color = uniforms.base_factor.component_mul(&Vec4::new(r, g, b, 1.0));
    if let Some(texture) = &uniforms.base_texture {
        color = color.component_mul(&texture.sample(Vec2::from(varyings.texcoord)));
    }

    if uniforms.alpha_cutoff > 0.0 && color.w < uniforms.alpha_cutoff {
        *discard = true;
        return Vec4::zeros();
    }

    if uniforms.shadow_pass {
        Vec4::zeros()
    } else {
        color
    }
}

type UnlitProgram = Program<UnlitAttribs, UnlitVaryings, UnlitUniforms>;

/// Mesh drawn with the unlit shader
pub struct UnlitModel {
    desc: ModelDesc,
    program: UnlitProgram,
}

impl UnlitModel {
    /// Acquire `mesh` from the cache and build the program for `material`
    ///
    /// `material.double_sided` is ignored: the program never culls.
    pub fn new(cache: &mut MeshCache, mesh: &str, transform: Mat4, material: &Material) -> Result<Self, ModelError> {
        let mut program = Program::create(
            unlit_vertex_shader,
            unlit_fragment_shader,
            true,
            material.program_flags(),
        )?;

        let uniforms = program.uniforms_mut();
        uniforms.model_matrix = transform;
        uniforms.base_factor = material.base_factor;
        uniforms.base_texture = material.texture.clone();
        uniforms.alpha_cutoff = material.alpha_cutoff;

        let mesh = cache.acquire(mesh)?;
        Ok(Self {
            desc: ModelDesc::new(mesh, transform, material.opaque),
            program,
        })
    }

    /// Uniforms as of the last `update`
    pub fn uniforms(&self) -> &UnlitUniforms {
        self.program.uniforms()
    }
}

impl Model for UnlitModel {
    fn update(&mut self, perframe: &Perframe) {
        let uniforms = self.program.uniforms_mut();
        uniforms.camera_pos = perframe.camera_pos;
        uniforms.model_matrix = self.desc.transform;
        uniforms.camera_vp_matrix = perframe.camera_vp_matrix();
        uniforms.light_vp_matrix = perframe.light_vp_matrix();
    }

    fn draw(&mut self, framebuffer: &mut Framebuffer, shadow_pass: bool) {
        self.program.uniforms_mut().shadow_pass = shadow_pass;

        let mut skipped = 0usize;
        for face in self.desc.mesh.faces() {
            for (slot, (vertex, color)) in face.iter().zip(CORNER_COLORS).enumerate() {
                let attribs = self.program.attribs_mut(slot);
                attribs.position = vertex.position;
                attribs.color = color;
                attribs.texcoord = vertex.tex_coord;
            }
            if draw_triangle(framebuffer, &mut self.program) {
                skipped += 1;
            }
        }

        log::trace!(
            "Unlit draw: {} faces, {} skipped (shadow pass: {})",
            self.desc.mesh.face_count(),
            skipped,
            shadow_pass
        );
    }

    fn release(self: Box<Self>, cache: &mut MeshCache) {
        let UnlitModel { desc, program } = *self;
        program.release();
        cache.release(desc.mesh);
    }

    fn set_early_depth_test(&mut self, enabled: bool) {
        let flags = with_early_depth(self.program.flags(), enabled);
        self.program.set_flags(flags);
    }

    fn desc(&self) -> &ModelDesc {
        &self.desc
    }

    fn desc_mut(&mut self) -> &mut ModelDesc {
        &mut self.desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::test_support::triangle_cache;

    fn painted(framebuffer: &Framebuffer) -> usize {
        let bytes = framebuffer.color_bytes().unwrap();
        bytes.chunks_exact(4).filter(|px| px[..3] != [0, 0, 0]).count()
    }

    fn framebuffer() -> Framebuffer {
        let mut framebuffer = Framebuffer::new(32, 32).unwrap();
        framebuffer.clear_color(Vec4::new(0.0, 0.0, 0.0, 1.0));
        framebuffer
    }

    #[test]
    fn test_update_writes_frame_matrices() {
        let mut cache = triangle_cache();
        let transform = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let mut model = UnlitModel::new(&mut cache, "tri", transform, &Material::default()).unwrap();
        let perframe = Perframe {
            camera_pos: Vec3::new(0.0, 0.0, 5.0),
            camera_proj_matrix: Mat4::new_scaling(2.0),
            ..Perframe::default()
        };

        model.update(&perframe);

        assert_eq!(model.uniforms().camera_pos, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(model.uniforms().model_matrix, transform);
        assert_eq!(model.uniforms().camera_vp_matrix, perframe.camera_vp_matrix());
    }

    #[test]
    fn test_draw_colors_corners() {
        let mut cache = triangle_cache();
        let mut model = UnlitModel::new(&mut cache, "tri", Mat4::identity(), &Material::default()).unwrap();
        let mut framebuffer = framebuffer();
        model.update(&Perframe::default());

        model.draw(&mut framebuffer, false);

        assert!(painted(&framebuffer) > 100);
        // Bottom-left is vertex 0, bottom-right vertex 1, top-left vertex 2
        let near_red = framebuffer.color_at(4, 27).unwrap();
        let near_green = framebuffer.color_at(26, 27).unwrap();
        let near_blue = framebuffer.color_at(4, 5).unwrap();
        assert!(near_red[0] > 200 && near_red[1] < 60 && near_red[2] < 60);
        assert!(near_green[1] > 200 && near_green[0] < 60);
        assert!(near_blue[2] > 200 && near_blue[0] < 60);
        assert_eq!(framebuffer.color_at(28, 4), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_alpha_cutoff_discards() {
        let mut cache = triangle_cache();
        let material = Material {
            base_factor: Vec4::new(1.0, 1.0, 1.0, 0.25),
            alpha_cutoff: 0.5,
            ..Material::default()
        };
        let mut model = UnlitModel::new(&mut cache, "tri", Mat4::identity(), &material).unwrap();
        let mut framebuffer = framebuffer();
        model.update(&Perframe::default());

        model.draw(&mut framebuffer, false);

        assert_eq!(painted(&framebuffer), 0);
        assert!(framebuffer.depth_buffer().iter().all(|&depth| depth == 1.0));
    }

    #[test]
    fn test_shadow_pass_uses_light_matrix() {
        let mut cache = triangle_cache();
        let mut model = UnlitModel::new(&mut cache, "tri", Mat4::identity(), &Material::default()).unwrap();
        // Camera pushed far off-screen; the light sees the triangle head-on
        let perframe = Perframe {
            camera_view_matrix: Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0)),
            ..Perframe::default()
        };
        model.update(&perframe);

        let mut camera_target = framebuffer();
        model.draw(&mut camera_target, false);
        assert_eq!(painted(&camera_target), 0);

        let mut shadow_target = Framebuffer::depth_only(32, 32).unwrap();
        model.draw(&mut shadow_target, true);
        assert!(shadow_target.depth_buffer().iter().any(|&depth| depth < 1.0));
    }

    #[test]
    fn test_clockwise_faces_are_drawn() {
        use crate::render::{Mesh, Vertex};

        // Corners 1 and 2 of the test triangle swapped
        let mut cache = MeshCache::with_loader(|_| {
            Mesh::new(vec![
                Vertex::new([-0.8, -0.8, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
                Vertex::new([-0.8, 0.8, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
                Vertex::new([0.8, -0.8, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            ])
        });
        let mut model = UnlitModel::new(&mut cache, "cw", Mat4::identity(), &Material::default()).unwrap();
        let mut framebuffer = framebuffer();
        model.update(&Perframe::default());

        model.draw(&mut framebuffer, false);

        assert!(painted(&framebuffer) > 100);
        // Corner 1 now sits top-left
        let near_green = framebuffer.color_at(4, 5).unwrap();
        assert!(near_green[1] > 200 && near_green[0] < 60);
        assert_eq!(framebuffer.color_at(28, 4), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_release_returns_mesh() {
        let mut cache = triangle_cache();
        let model: Box<dyn Model> =
            Box::new(UnlitModel::new(&mut cache, "tri", Mat4::identity(), &Material::default()).unwrap());
        assert_eq!(cache.len(), 1);

        model.release(&mut cache);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_texture_modulates_color() {
        let mut cache = triangle_cache();
        let material = Material {
            texture: Some(Arc::new(Texture::solid(Vec4::new(0.0, 1.0, 1.0, 1.0)))),
            ..Material::default()
        };
        let mut model = UnlitModel::new(&mut cache, "tri", Mat4::identity(), &material).unwrap();
        let mut framebuffer = framebuffer();
        model.update(&Perframe::default());

        model.draw(&mut framebuffer, false);

        // Red channel is masked out everywhere
        let bytes = framebuffer.color_bytes().unwrap();
        assert!(bytes.chunks_exact(4).all(|px| px[0] == 0));
        assert!(painted(&framebuffer) > 100);
    }
}
