mod gltf_file;
mod types;
mod util;

// Re-exports
pub use {
    gltf_file::{load_clips, load_scene},
    types::{ImportError, ImportedMaterial, ImportedMesh, ImportedScene},
};
