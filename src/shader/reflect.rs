//! Uniform reflection from compiled SPIR-V
//!
//! Each stage declares one `Uniforms` block at binding 0 plus any number of
//! combined image samplers. Offsets and array strides are the ones the
//! compiler decorated the block with, so the CPU side copy can be uploaded
//! byte for byte.
use crate::um_error::UmError;
use ahash::AHashMap;
use vulkano::shader::spirv::{
    bytes_to_words, Decoration, Dim, Id, Instruction, Spirv, StorageClass,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlslType {
    Int,
    UInt,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

impl GlslType {
    /// 32 bit scalars, float vectors and square float matrices. A GLSL
    /// `bool` in a block is compiled to a `uint`.
    fn from_spirv(spirv: &Spirv, ty: Id) -> Option<Self> {
        match *spirv.id(ty).instruction() {
            Instruction::TypeInt {
                width: 32,
                signedness,
                ..
            } => Some(if signedness == 0 { Self::UInt } else { Self::Int }),
            Instruction::TypeFloat { width: 32, .. } => Some(Self::Float),
            Instruction::TypeVector {
                component_type,
                component_count,
                ..
            } => match (
                Self::from_spirv(spirv, component_type)?,
                component_count,
            ) {
                (Self::Float, 2) => Some(Self::Vec2),
                (Self::Float, 3) => Some(Self::Vec3),
                (Self::Float, 4) => Some(Self::Vec4),
                _ => None,
            },
            Instruction::TypeMatrix {
                column_type,
                column_count,
                ..
            } => match (Self::from_spirv(spirv, column_type)?, column_count)
            {
                (Self::Vec3, 3) => Some(Self::Mat3),
                (Self::Vec4, 4) => Some(Self::Mat4),
                _ => None,
            },
            _ => None,
        }
    }

    /// Bytes written for one value
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 => 16,
            Self::Mat3 => 48,
            Self::Mat4 => 64,
        }
    }
}

/// Location of one member of the uniform block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformInfo {
    pub ty: GlslType,
    pub offset: usize,
    /// Element count for arrays
    pub count: Option<usize>,
    array_stride: usize,
}

impl UniformInfo {
    /// Distance between array elements, from the `ArrayStride` decoration.
    /// Under std140 every element is rounded up to a vec4, scalars
    /// included.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.array_stride
    }

    #[must_use]
    pub const fn is_array(&self) -> bool {
        self.count.is_some()
    }

    const fn byte_size(&self) -> usize {
        match self.count {
            Some(n) => n * self.stride(),
            None => self.ty.size(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerKind {
    Sampler2D,
    SamplerCube,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerInfo {
    pub binding: u32,
    pub kind: SamplerKind,
}

/// Active uniforms of a program, by name
#[derive(Clone, Debug, Default)]
pub struct UniformTable {
    uniforms: AHashMap<String, UniformInfo>,
    samplers: AHashMap<String, SamplerInfo>,
    block_size: usize,
}

impl UniformTable {
    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&UniformInfo> {
        self.uniforms.get(name)
    }

    #[must_use]
    pub fn sampler(&self, name: &str) -> Option<&SamplerInfo> {
        self.samplers.get(name)
    }

    pub fn samplers(&self) -> impl Iterator<Item = (&str, &SamplerInfo)> {
        self.samplers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Size in bytes of the uniform block, zero if there is none
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    #[must_use]
    pub fn uniform_count(&self) -> usize {
        self.uniforms.len()
    }

    /// Combines the table of another stage of the same program. A name
    /// declared differently by two stages fails the link.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn merge(&mut self, other: &Self) -> Result<(), UmError> {
        for (name, info) in &other.uniforms {
            match self.uniforms.get(name) {
                Some(existing) if existing != info => {
                    return Err(conflict(name));
                }
                Some(_) => {}
                None => {
                    self.uniforms.insert(name.clone(), *info);
                }
            }
        }
        for (name, info) in &other.samplers {
            match self.samplers.get(name) {
                Some(existing) if existing != info => {
                    return Err(conflict(name));
                }
                Some(_) => {}
                None => {
                    self.samplers.insert(name.clone(), *info);
                }
            }
        }
        self.block_size = self.block_size.max(other.block_size);
        Ok(())
    }
}

#[track_caller]
fn conflict(name: &str) -> UmError {
    UmError::resource(
        format!("conflicting declarations of uniform '{name}'"),
        "UniformTable::merge",
    )
}

const fn round_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

/// Builds the uniform table of one compiled stage
///
/// # Errors
/// May return `UmError`
pub fn reflect(bytes: &[u8]) -> Result<UniformTable, UmError> {
    let words = bytes_to_words(bytes)
        .map_err(|_| malformed("length is not a multiple of 4"))?;
    let spirv = Spirv::new(&words).map_err(|e| malformed(&e.to_string()))?;
    let mut table = UniformTable::default();
    for instruction in spirv.iter_global() {
        let Instruction::Variable {
            result_id,
            result_type_id,
            storage_class,
            ..
        } = *instruction
        else {
            continue;
        };
        let Instruction::TypePointer { ty, .. } =
            *spirv.id(result_type_id).instruction()
        else {
            continue;
        };
        match storage_class {
            StorageClass::Uniform => read_block(&spirv, ty, &mut table)?,
            StorageClass::UniformConstant => {
                read_sampler(&spirv, result_id, ty, &mut table)?;
            }
            _ => {}
        }
    }
    Ok(table)
}

#[track_caller]
fn malformed(what: &str) -> UmError {
    UmError::resource(format!("malformed shader module: {what}"), "reflect")
}

fn read_block(
    spirv: &Spirv,
    ty: Id,
    table: &mut UniformTable,
) -> Result<(), UmError> {
    let info = spirv.id(ty);
    let Instruction::TypeStruct {
        ref member_types, ..
    } = *info.instruction()
    else {
        return Err(malformed("uniforms must be declared in a block"));
    };
    let mut end = 0;
    for (&member, member_info) in member_types.iter().zip(info.iter_members())
    {
        let name = member_info
            .iter_name()
            .find_map(|i| match i {
                Instruction::MemberName { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .ok_or_else(|| malformed("block member without a name"))?;
        let offset = member_info
            .iter_decoration()
            .find_map(|i| match *i {
                Instruction::MemberDecorate {
                    decoration: Decoration::Offset { byte_offset },
                    ..
                } => Some(byte_offset as usize),
                _ => None,
            })
            .ok_or_else(|| malformed("block member without an offset"))?;
        let uniform = member_uniform(spirv, member, offset).ok_or_else(|| {
            malformed(&format!("unsupported type of uniform '{name}'"))
        })?;
        end = end.max(uniform.offset + uniform.byte_size());
        table.uniforms.insert(name.to_string(), uniform);
    }
    table.block_size = table.block_size.max(round_up(end, 16));
    Ok(())
}

fn member_uniform(
    spirv: &Spirv,
    ty: Id,
    offset: usize,
) -> Option<UniformInfo> {
    let info = spirv.id(ty);
    let Instruction::TypeArray {
        element_type,
        length,
        ..
    } = *info.instruction()
    else {
        let ty = GlslType::from_spirv(spirv, ty)?;
        return Some(UniformInfo {
            ty,
            offset,
            count: None,
            array_stride: ty.size(),
        });
    };
    let array_stride = info.iter_decoration().find_map(|i| match *i {
        Instruction::Decorate {
            decoration: Decoration::ArrayStride { array_stride },
            ..
        } => Some(array_stride as usize),
        _ => None,
    })?;
    let count = match spirv.id(length).instruction() {
        Instruction::Constant { value, .. } => *value.first()? as usize,
        _ => return None,
    };
    Some(UniformInfo {
        ty: GlslType::from_spirv(spirv, element_type)?,
        offset,
        count: Some(count),
        array_stride,
    })
}

fn read_sampler(
    spirv: &Spirv,
    variable: Id,
    ty: Id,
    table: &mut UniformTable,
) -> Result<(), UmError> {
    let Instruction::TypeSampledImage { image_type, .. } =
        *spirv.id(ty).instruction()
    else {
        return Ok(());
    };
    let kind = match *spirv.id(image_type).instruction() {
        Instruction::TypeImage { dim: Dim::Dim2D, .. } => {
            SamplerKind::Sampler2D
        }
        Instruction::TypeImage { dim: Dim::Cube, .. } => {
            SamplerKind::SamplerCube
        }
        _ => return Err(malformed("unsupported sampler dimension")),
    };
    let info = spirv.id(variable);
    let name = info
        .iter_name()
        .find_map(|i| match i {
            Instruction::Name { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .ok_or_else(|| malformed("sampler without a name"))?;
    let binding = info
        .iter_decoration()
        .find_map(|i| match *i {
            Instruction::Decorate {
                decoration: Decoration::Binding { binding_point },
                ..
            } => Some(binding_point),
            _ => None,
        })
        .ok_or_else(|| malformed("sampler without a binding"))?;
    table
        .samplers
        .insert(name.to_string(), SamplerInfo { binding, kind });
    Ok(())
}
