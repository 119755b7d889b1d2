use super::{
    reflect::{self, GlslType, UniformInfo, UniformTable},
    sources::{ProgramId, StageSource},
};
use crate::{renderer::TextureRef, um_error::UmError};
use log::{debug, warn};
use nalgebra_glm as glm;
use smallvec::SmallVec;

/// A value for `ShaderProgram::set_uniform`. Arrays may be shorter than the
/// declared array, in which case only the leading elements are written.
#[derive(Clone, Copy, Debug)]
pub enum UniformValue<'a> {
    Int(i32),
    Float(f32),
    Vec2(glm::Vec2),
    Vec3(glm::Vec3),
    Vec4(glm::Vec4),
    Mat4(glm::Mat4),
    FloatArray(&'a [f32]),
    Vec3Array(&'a [glm::Vec3]),
    Mat4Array(&'a [glm::Mat4]),
}

impl UniformValue<'_> {
    const fn glsl_type(&self) -> GlslType {
        match self {
            Self::Int(_) => GlslType::Int,
            Self::Float(_) | Self::FloatArray(_) => GlslType::Float,
            Self::Vec2(_) => GlslType::Vec2,
            Self::Vec3(_) | Self::Vec3Array(_) => GlslType::Vec3,
            Self::Vec4(_) => GlslType::Vec4,
            Self::Mat4(_) | Self::Mat4Array(_) => GlslType::Mat4,
        }
    }

    const fn array_len(&self) -> Option<usize> {
        match self {
            Self::FloatArray(a) => Some(a.len()),
            Self::Vec3Array(a) => Some(a.len()),
            Self::Mat4Array(a) => Some(a.len()),
            _ => None,
        }
    }

    /// Whether the value can be written to the declaration
    fn fits(&self, info: &UniformInfo) -> bool {
        if self.glsl_type() != info.ty {
            return false;
        }
        match (self.array_len(), info.count) {
            (None, None) => true,
            (Some(len), Some(count)) => len <= count,
            _ => false,
        }
    }

    fn write(&self, block: &mut [u8], info: &UniformInfo) {
        let stride = info.stride();
        match self {
            Self::Int(v) => put(block, info.offset, &[*v]),
            Self::Float(v) => put(block, info.offset, &[*v]),
            Self::Vec2(v) => put(block, info.offset, v.as_slice()),
            Self::Vec3(v) => put(block, info.offset, v.as_slice()),
            Self::Vec4(v) => put(block, info.offset, v.as_slice()),
            Self::Mat4(m) => put(block, info.offset, m.as_slice()),
            Self::FloatArray(a) => {
                for (i, v) in a.iter().enumerate() {
                    put(block, info.offset + i * stride, &[*v]);
                }
            }
            Self::Vec3Array(a) => {
                for (i, v) in a.iter().enumerate() {
                    put(block, info.offset + i * stride, v.as_slice());
                }
            }
            // A mat4 is already a multiple of vec4 so the array is packed
            Self::Mat4Array(a) => put(block, info.offset, *a),
        }
    }
}

fn put<T: bytemuck::Pod>(block: &mut [u8], offset: usize, values: &[T]) {
    let bytes: &[u8] = bytemuck::cast_slice(values);
    if let Some(dst) = block.get_mut(offset..offset + bytes.len()) {
        dst.copy_from_slice(bytes);
    }
}

impl From<i32> for UniformValue<'_> {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for UniformValue<'_> {
    fn from(v: bool) -> Self {
        Self::Int(i32::from(v))
    }
}

impl From<f32> for UniformValue<'_> {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<glm::Vec2> for UniformValue<'_> {
    fn from(v: glm::Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<glm::Vec3> for UniformValue<'_> {
    fn from(v: glm::Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<glm::Vec4> for UniformValue<'_> {
    fn from(v: glm::Vec4) -> Self {
        Self::Vec4(v)
    }
}

impl From<glm::Mat4> for UniformValue<'_> {
    fn from(v: glm::Mat4) -> Self {
        Self::Mat4(v)
    }
}

impl<'a> From<&'a [f32]> for UniformValue<'a> {
    fn from(v: &'a [f32]) -> Self {
        Self::FloatArray(v)
    }
}

impl<'a> From<&'a [glm::Vec3]> for UniformValue<'a> {
    fn from(v: &'a [glm::Vec3]) -> Self {
        Self::Vec3Array(v)
    }
}

impl<'a> From<&'a [glm::Mat4]> for UniformValue<'a> {
    fn from(v: &'a [glm::Mat4]) -> Self {
        Self::Mat4Array(v)
    }
}

/// A linked program: the merged uniform table of its stages plus the CPU
/// copy of its uniform block and the current sampler bindings. Values
/// persist between draws until overwritten.
#[derive(Clone, Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    table: UniformTable,
    block: Vec<u8>,
    textures: SmallVec<[(u32, TextureRef); 8]>,
}

impl ShaderProgram {
    /// Reflects and merges every stage of a program
    ///
    /// # Errors
    /// May return `UmError`
    pub fn link(id: ProgramId) -> Result<Self, UmError> {
        let modules: SmallVec<[&[u8]; 3]> =
            id.stages().iter().filter_map(StageSource::spirv).collect();
        Self::from_modules(id, &modules)
    }

    /// Links from SPIR-V modules. Stages that declare the same name
    /// differently fail with `ResourceError`.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn from_modules(
        id: ProgramId,
        modules: &[&[u8]],
    ) -> Result<Self, UmError> {
        let mut table = UniformTable::default();
        for module in modules {
            table.merge(&reflect::reflect(module)?)?;
        }
        debug!(
            "Linked {} with {} uniforms in {} bytes",
            id.name(),
            table.uniform_count(),
            table.block_size()
        );
        Ok(Self {
            id,
            block: vec![0; table.block_size()],
            table,
            textures: SmallVec::new(),
        })
    }

    #[must_use]
    pub const fn id(&self) -> ProgramId {
        self.id
    }

    #[must_use]
    pub const fn table(&self) -> &UniformTable {
        &self.table
    }

    /// Current uniform block bytes
    #[must_use]
    pub fn block(&self) -> &[u8] {
        &self.block
    }

    #[must_use]
    pub fn textures(&self) -> &[(u32, TextureRef)] {
        &self.textures
    }

    #[must_use]
    pub fn has_uniform(&self, name: &str) -> bool {
        self.table.uniform(name).is_some()
    }

    /// Writes a uniform. A name the program does not declare, or a value
    /// of the wrong type, is logged and ignored; the return value says
    /// whether anything was written.
    pub fn set_uniform<'a>(
        &mut self,
        name: &str,
        value: impl Into<UniformValue<'a>>,
    ) -> bool {
        let value = value.into();
        let Some(info) = self.table.uniform(name) else {
            warn!("{}: no active uniform '{}'", self.id.name(), name);
            return false;
        };
        if !value.fits(info) {
            warn!(
                "{}: uniform '{}' is {:?}{}, not {:?}",
                self.id.name(),
                name,
                info.ty,
                info.count.map_or_else(String::new, |n| format!("[{n}]")),
                value
            );
            return false;
        }
        value.write(&mut self.block, info);
        true
    }

    /// Binds a texture to a named sampler, replacing any previous binding.
    /// Unknown names are logged and ignored like uniforms.
    pub fn set_texture(&mut self, name: &str, texture: TextureRef) -> bool {
        let Some(sampler) = self.table.sampler(name) else {
            warn!("{}: no active sampler '{}'", self.id.name(), name);
            return false;
        };
        let binding = sampler.binding;
        if let Some(slot) =
            self.textures.iter_mut().find(|(b, _)| *b == binding)
        {
            slot.1 = texture;
        } else {
            self.textures.push((binding, texture));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        renderer::Target,
        shader::uniforms::{
            U_BONES, U_LIGHT_COUNT, U_LIGHT_LINEAR, U_MODEL, U_ROUGHNESS,
            U_VIEW, U_VIEW_POS,
        },
        types::{TextureId, MAX_BONES, MAX_LIGHTS},
    };

    fn read_f32(block: &[u8], offset: usize) -> f32 {
        let bytes: [u8; 4] = block[offset..offset + 4].try_into().unwrap();
        f32::from_le_bytes(bytes)
    }

    fn lighting() -> ShaderProgram {
        ShaderProgram::link(ProgramId::LightingPass).unwrap()
    }

    #[test]
    fn writes_at_std140_offsets() {
        let mut p = lighting();
        assert_eq!(p.block().len(), p.table().block_size());
        let m = glm::translation(&glm::vec3(1.0, 2.0, 3.0));
        assert!(p.set_uniform(U_VIEW, m));
        // Column major, so the translation is floats 12 to 14
        assert!((read_f32(p.block(), 2560 + 13 * 4) - 2.0).abs() < 1e-6);
        assert!(p.set_uniform(U_LIGHT_LINEAR, &[0.5_f32, 0.25][..]));
        assert!((read_f32(p.block(), 1024) - 0.5).abs() < f32::EPSILON);
        assert!((read_f32(p.block(), 1040) - 0.25).abs() < f32::EPSILON);
        assert!(p.set_uniform(U_VIEW_POS, glm::vec3(7.0, 8.0, 9.0)));
        assert!((read_f32(p.block(), 2696) - 9.0).abs() < f32::EPSILON);
        assert!(p.set_uniform(U_LIGHT_COUNT, 3));
        assert_eq!(p.block()[2700], 3);
    }

    #[test]
    fn unknown_uniform_is_a_no_op() {
        let mut p = lighting();
        p.set_uniform(U_VIEW, glm::Mat4::identity());
        let before = p.block().to_vec();
        assert!(!p.set_uniform("uNotThere", 1.0_f32));
        assert!(!p.set_uniform(U_VIEW, 1.0_f32));
        let long = [1.0_f32; MAX_LIGHTS + 1];
        assert!(!p.set_uniform(U_LIGHT_LINEAR, &long[..]));
        assert_eq!(p.block(), &before[..]);
    }

    #[test]
    fn textures_replace_by_binding() {
        let mut p = ShaderProgram::link(ProgramId::Gui).unwrap();
        assert!(p.set_texture("uTexture", TextureRef::Texture(TextureId(3))));
        assert!(p.set_texture("uTexture", TextureRef::Target(Target::Hdr)));
        assert!(!p.set_texture("uMissing", TextureRef::Target(Target::Hdr)));
        assert_eq!(p.textures(), &[(1, TextureRef::Target(Target::Hdr))]);
    }

    #[test]
    fn geometry_program_links() {
        let mut p = ShaderProgram::link(ProgramId::GeometryPass).unwrap();
        assert!(p.has_uniform(U_ROUGHNESS));
        let bones = vec![glm::Mat4::identity(); MAX_BONES];
        assert!(p.set_uniform(U_BONES, &bones[..]));
        assert!(p.set_uniform(U_MODEL, glm::Mat4::identity()));
    }

    #[test]
    fn every_program_links() {
        for id in ProgramId::ALL {
            let p = ShaderProgram::link(id).unwrap();
            assert_eq!(p.id(), id);
        }
    }

    #[test]
    fn conflicting_stages_fail_to_link() {
        let e = ShaderProgram::from_modules(
            ProgramId::LightingPass,
            &[
                include_bytes!(concat!(env!("OUT_DIR"), "/lighting.frag.spv")),
                include_bytes!(concat!(env!("OUT_DIR"), "/geometry.vert.spv")),
            ],
        )
        .unwrap_err();
        assert_eq!(e.kind(), crate::um_error::ErrorKind::ResourceError);
    }
}
