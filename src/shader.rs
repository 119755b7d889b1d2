mod program;
mod reflect;
mod sources;
pub mod uniforms;

// Re-exports
pub use {
    program::{ShaderProgram, UniformValue},
    reflect::{
        reflect, GlslType, SamplerInfo, SamplerKind, UniformInfo,
        UniformTable,
    },
    sources::{ProgramId, Stage, StageCode, StageSource},
};
