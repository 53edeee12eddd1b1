//! Blinn-Phong shader
//!
//! Ambient + Lambert diffuse + Blinn specular from a single directional
//! light, with an optional shadow map lookup. Back faces shade with the
//! flipped normal so double-sided geometry lights correctly from behind.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::assets::MeshCache;
use crate::foundation::math::{Mat3, Mat4, Vec2, Vec3, Vec4};
use crate::render::{draw_triangle, DepthMap, Framebuffer, Perframe, Program, Texture};
use crate::shaders::{with_early_depth, Material, Model, ModelDesc, ModelError};

/// Depth bias applied before comparing against the shadow map
pub const SHADOW_BIAS: f32 = 0.005;

/// Per-corner inputs
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BlinnAttribs {
    /// Model-space position
    pub position: [f32; 3],
    /// Model-space normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub texcoord: [f32; 2],
}

/// Interpolated vertex outputs
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BlinnVaryings {
    /// World-space position
    pub world_position: [f32; 3],
    /// World-space normal (not normalized)
    pub world_normal: [f32; 3],
    /// Texture coordinate
    pub texcoord: [f32; 2],
    /// Position in light clip space, for the shadow lookup
    pub light_clip: [f32; 4],
}

/// Values shared by every corner and fragment of a draw
#[derive(Debug, Clone)]
pub struct BlinnUniforms {
    /// Direction the light travels (normalized)
    pub light_dir: Vec3,
    /// Camera position in world space
    pub camera_pos: Vec3,
    /// Model to world
    pub model_matrix: Mat4,
    /// Inverse transpose of the model matrix's linear part
    pub normal_matrix: Mat3,
    /// World to camera clip space
    pub camera_vp_matrix: Mat4,
    /// World to light clip space
    pub light_vp_matrix: Mat4,
    /// Ambient light scale
    pub ambient_intensity: f32,
    /// Directional light scale
    pub punctual_intensity: f32,
    /// Whether the current draw is the shadow pass
    pub shadow_pass: bool,
    /// Diffuse color multiplier
    pub diffuse_factor: Vec4,
    /// Specular strength
    pub specular_factor: f32,
    /// Specular exponent
    pub shininess: f32,
    /// Alpha below which fragments are discarded (0 disables)
    pub alpha_cutoff: f32,
    /// Optional diffuse texture
    pub diffuse_texture: Option<Arc<Texture>>,
    /// Depth from the light's point of view
    pub shadow_map: Option<Arc<DepthMap>>,
}

impl Default for BlinnUniforms {
    fn default() -> Self {
        Self {
            light_dir: Vec3::new(0.0, -1.0, 0.0),
            camera_pos: Vec3::zeros(),
            model_matrix: Mat4::identity(),
            normal_matrix: Mat3::identity(),
            camera_vp_matrix: Mat4::identity(),
            light_vp_matrix: Mat4::identity(),
            ambient_intensity: 0.5,
            punctual_intensity: 1.0,
            shadow_pass: false,
            diffuse_factor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            specular_factor: 0.5,
            shininess: 32.0,
            alpha_cutoff: 0.0,
            diffuse_texture: None,
            shadow_map: None,
        }
    }
}

/// Inverse transpose of the upper-left 3x3, identity when singular
pub fn normal_matrix(model_matrix: &Mat4) -> Mat3 {
    let linear: Mat3 = model_matrix.fixed_view::<3, 3>(0, 0).into_owned();
    linear
        .try_inverse()
        .map_or_else(Mat3::identity, |inverse| inverse.transpose())
}

/// Blinn-Phong vertex shader
pub fn blinn_vertex_shader(attribs: &BlinnAttribs, varyings: &mut BlinnVaryings, uniforms: &BlinnUniforms) -> Vec4 {
    let [x, y, z] = attribs.position;
    let world_position = uniforms.model_matrix * Vec4::new(x, y, z, 1.0);
    let light_clip = uniforms.light_vp_matrix * world_position;

    if uniforms.shadow_pass {
        varyings.texcoord = attribs.texcoord;
        return light_clip;
    }

    let world_normal = uniforms.normal_matrix * Vec3::from(attribs.normal);
    varyings.world_position = world_position.xyz().into();
    varyings.world_normal = world_normal.into();
    varyings.texcoord = attribs.texcoord;
    varyings.light_clip = light_clip.into();
    uniforms.camera_vp_matrix * world_position
}

fn is_in_shadow(light_clip: Vec4, shadow_map: &DepthMap) -> bool {
    if light_clip.w <= 0.0 {
        return false;
    }
    let ndc = light_clip.xyz() / light_clip.w;
    let texcoord = Vec2::new((ndc.x + 1.0) * 0.5, (ndc.y + 1.0) * 0.5);
    if !(0.0..=1.0).contains(&texcoord.x) || !(0.0..=1.0).contains(&texcoord.y) {
        return false;
    }
    let depth = (ndc.z + 1.0) * 0.5;
    depth - SHADOW_BIAS > shadow_map.sample(texcoord)
}

/// Blinn-Phong fragment shader
pub fn blinn_fragment_shader(
    varyings: &BlinnVaryings,
    uniforms: &BlinnUniforms,
    discard: &mut bool,
    backface: bool,
) -> Vec4 {
    let texcoord = Vec2::from(varyings.texcoord);
    let mut base = uniforms.diffuse_factor;
    if let Some(texture) = &uniforms.diffuse_texture {
        base = base.component_mul(&texture.sample(texcoord));
    }

    if uniforms.alpha_cutoff > 0.0 && base.w < uniforms.alpha_cutoff {
        *discard = true;
        return Vec4::zeros();
    }
    if uniforms.shadow_pass {
        return Vec4::zeros();
    }

    let mut normal = Vec3::from(varyings.world_normal)
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(|| Vec3::new(0.0, 0.0, 1.0));
    if backface {
        normal = -normal;
    }

    let world_position = Vec3::from(varyings.world_position);
    let to_light = -uniforms.light_dir;
    let to_camera = (uniforms.camera_pos - world_position)
        .try_normalize(f32::EPSILON)
        .unwrap_or(normal);

    let albedo = base.xyz();
    let ambient = albedo * uniforms.ambient_intensity;

    let n_dot_l = normal.dot(&to_light).max(0.0);
    let mut punctual = Vec3::zeros();
    if n_dot_l > 0.0 {
        let shadowed = uniforms
            .shadow_map
            .as_deref()
            .is_some_and(|map| is_in_shadow(Vec4::from(varyings.light_clip), map));
        if !shadowed {
            let diffuse = albedo * n_dot_l;
            let half = (to_light + to_camera).try_normalize(f32::EPSILON).unwrap_or(normal);
            let specular = normal.dot(&half).max(0.0).powf(uniforms.shininess) * uniforms.specular_factor;
            punctual = (diffuse + Vec3::repeat(specular)) * uniforms.punctual_intensity;
        }
    }

    let color = ambient + punctual;
    Vec4::new(color.x, color.y, color.z, base.w)
}

type BlinnProgram = Program<BlinnAttribs, BlinnVaryings, BlinnUniforms>;

/// Mesh drawn with the Blinn-Phong shader
pub struct BlinnModel {
    desc: ModelDesc,
    program: BlinnProgram,
}

impl BlinnModel {
    /// Acquire `mesh` from the cache and build the program for `material`
    pub fn new(cache: &mut MeshCache, mesh: &str, transform: Mat4, material: &Material) -> Result<Self, ModelError> {
        let mut program = Program::create(
            blinn_vertex_shader,
            blinn_fragment_shader,
            material.double_sided,
            material.program_flags(),
        )?;

        let uniforms = program.uniforms_mut();
        uniforms.model_matrix = transform;
        uniforms.normal_matrix = normal_matrix(&transform);
        uniforms.diffuse_factor = material.base_factor;
        uniforms.diffuse_texture = material.texture.clone();
        uniforms.specular_factor = material.specular_factor;
        uniforms.shininess = material.shininess;
        uniforms.alpha_cutoff = material.alpha_cutoff;

        let mesh = cache.acquire(mesh)?;
        Ok(Self {
            desc: ModelDesc::new(mesh, transform, material.opaque),
            program,
        })
    }

    /// Uniforms as of the last `update`
    pub fn uniforms(&self) -> &BlinnUniforms {
        self.program.uniforms()
    }
}

impl Model for BlinnModel {
    fn update(&mut self, perframe: &Perframe) {
        let transform = self.desc.transform;
        let uniforms = self.program.uniforms_mut();
        uniforms.light_dir = perframe.light_dir;
        uniforms.camera_pos = perframe.camera_pos;
        uniforms.model_matrix = transform;
        uniforms.normal_matrix = normal_matrix(&transform);
        uniforms.camera_vp_matrix = perframe.camera_vp_matrix();
        uniforms.light_vp_matrix = perframe.light_vp_matrix();
        uniforms.ambient_intensity = perframe.ambient_intensity;
        uniforms.punctual_intensity = perframe.punctual_intensity;
        uniforms.shadow_map = perframe.shadow_map.clone();
    }

    fn draw(&mut self, framebuffer: &mut Framebuffer, shadow_pass: bool) {
        self.program.uniforms_mut().shadow_pass = shadow_pass;

        let mut skipped = 0usize;
        for face in self.desc.mesh.faces() {
            for (slot, vertex) in face.iter().enumerate() {
                let attribs = self.program.attribs_mut(slot);
                attribs.position = vertex.position;
                attribs.normal = vertex.normal;
                attribs.texcoord = vertex.tex_coord;
            }
            if draw_triangle(framebuffer, &mut self.program) {
                skipped += 1;
            }
        }

        log::trace!(
            "Blinn draw: {} faces, {} skipped (shadow pass: {})",
            self.desc.mesh.face_count(),
            skipped,
            shadow_pass
        );
    }

    fn release(self: Box<Self>, cache: &mut MeshCache) {
        let BlinnModel { desc, program } = *self;
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
