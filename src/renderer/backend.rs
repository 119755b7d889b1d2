use crate::{
    shader::{ProgramId, UniformTable},
    texture::TextureData,
    types::{MeshHandle, TextureId},
    um_error::UmError,
    vertex::{OverlayVertex, Vertex},
};

/// Passes of the frame graph in the order they run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pass {
    Shadow,
    Geometry,
    Ssao,
    SsaoBlur,
    Lighting,
    Forward,
    /// One Gaussian blur pass writing ping-pong target `n`
    Blur(usize),
    /// Bloom blend and tone map to the swapchain image
    Composite,
    Overlay,
}

/// Render targets owned by the backend that later passes sample
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    GPosition,
    GNormal,
    GAlbedoSpec,
    Ssao,
    SsaoBlur,
    Hdr,
    Bright,
    PingPong(usize),
    ShadowCube,
}

/// What a sampler binding reads from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureRef {
    Texture(TextureId),
    Target(Target),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Mesh(MeshHandle),
    /// A single point, expanded by the billboard geometry shader
    Point([f32; 3]),
    FullscreenQuad,
    /// Screen space quads, six vertices each
    Quads(Vec<OverlayVertex>),
}

/// Everything a backend needs for one draw. `uniforms` is the std140 block
/// of the program and `textures` the sampler bindings.
#[derive(Clone, Debug)]
pub struct DrawCall<'a> {
    pub program: ProgramId,
    pub uniforms: &'a [u8],
    pub textures: &'a [(u32, TextureRef)],
    pub geometry: Geometry,
}

/// The GPU seam. The frame graph drives a backend through these calls in a
/// fixed order each frame: `begin_frame`, then for each pass `begin_pass`,
/// any number of `draw`s and `end_pass`, then `end_frame`.
pub trait RenderBackend {
    /// Builds whatever the backend needs to draw with a program. Called once
    /// per program at renderer construction.
    ///
    /// # Errors
    /// May return `UmError`
    fn load_program(
        &mut self,
        id: ProgramId,
        table: &UniformTable,
    ) -> Result<(), UmError>;

    /// # Errors
    /// May return `UmError`
    fn create_mesh(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<MeshHandle, UmError>;

    /// # Errors
    /// May return `UmError`
    fn create_texture(
        &mut self,
        data: &TextureData,
    ) -> Result<TextureId, UmError>;

    /// Starts recording a frame. Returns `UmError::SwapchainOutOfDate` if
    /// the frame can not be drawn, which callers treat as a skipped frame.
    ///
    /// # Errors
    /// May return `UmError`
    fn begin_frame(&mut self) -> Result<(), UmError>;

    /// # Errors
    /// May return `UmError`
    fn begin_pass(&mut self, pass: Pass) -> Result<(), UmError>;

    /// # Errors
    /// May return `UmError`
    fn draw(&mut self, call: &DrawCall) -> Result<(), UmError>;

    /// # Errors
    /// May return `UmError`
    fn end_pass(&mut self) -> Result<(), UmError>;

    /// Copies the geometry pass depth into the forward pass depth target
    ///
    /// # Errors
    /// May return `UmError`
    fn copy_depth(&mut self) -> Result<(), UmError>;

    /// Submits and presents
    ///
    /// # Errors
    /// May return `UmError`
    fn end_frame(&mut self) -> Result<(), UmError>;

    /// Recreates size dependent targets
    ///
    /// # Errors
    /// May return `UmError`
    fn resize(&mut self, dimensions: [u32; 2]) -> Result<(), UmError>;

    fn dimensions(&self) -> [u32; 2];
}
