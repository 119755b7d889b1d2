mod animated;
mod material;
mod mesh;
mod resource;

// Re-exports
pub use {
    animated::AnimatedModel,
    material::{
        Material, DEFAULT_METALLIC, DEFAULT_ROUGHNESS, FLAT_NORMAL_MAP,
    },
    mesh::Mesh,
    resource::Model,
};
