use nalgebra_glm as glm;
use winit::event::{ElementState, VirtualKeyCode};

/// Bone slots in the skinning uniform array. This must match `MAX_BONES` in
/// the shaders.
pub const MAX_BONES: usize = 64;

/// Lights uploaded to the lighting pass. This must match `MAX_LIGHTS` in
/// `lighting.frag`.
pub const MAX_LIGHTS: usize = 32;

/// Edge length of each shadow cube face in texels
pub const SHADOW_SIZE: u32 = 2048;
pub const SHADOW_NEAR: f32 = 0.1;
pub const SHADOW_FAR: f32 = 25.0;

pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;

pub const SSAO_KERNEL_SIZE: usize = 64;
pub const SSAO_NOISE_DIM: u32 = 4;

/// Gaussian passes over the bloom ping-pong pair
pub const BLOOM_ITERATIONS: usize = 10;

/// Relative per-light intensity flicker
pub const LIGHT_JITTER: f32 = 0.1;

/// World units per map tile
pub const TILE_SIZE: f32 = 1.5;

/// Playback rate used when an asset reports zero ticks per second
pub const DEFAULT_TICKS_PER_SECOND: f32 = 25.0;

/// Handle to a mesh uploaded to a render backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub usize);

/// Handle to a texture uploaded to a render backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// Trait for something that handles keyboard input events
pub trait KeyboardHandler {
    fn input(&mut self, keycode: VirtualKeyCode, state: ElementState);
}

/// Trait for the camera matrices needed for rendering
pub trait CameraTrait {
    fn view_matrix(&self) -> glm::Mat4;
    fn proj_matrix(&self, aspect_ratio: f32) -> glm::Mat4;
    fn position(&self) -> glm::Vec3;
}
