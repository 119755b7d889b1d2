mod backend;
mod frame;
mod matrix_stack;
mod minimap;
mod recording;
mod shadow;
mod ssao;

// Re-exports
pub use {
    backend::{DrawCall, Geometry, Pass, RenderBackend, Target, TextureRef},
    frame::Renderer,
    matrix_stack::MatrixStack,
    minimap::{quads as minimap_quads, MINIMAP_MARGIN, MINIMAP_TILE},
    recording::{Event, RecordedMesh, RecordingBackend},
    shadow::face_matrices,
    ssao::{kernel as ssao_kernel, noise_scale, noise_texture},
};
