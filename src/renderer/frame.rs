use super::{
    backend::{DrawCall, Geometry, Pass, RenderBackend, Target, TextureRef},
    matrix_stack::MatrixStack,
    minimap, shadow, ssao,
};
use crate::{
    animation::Animator,
    camera::CameraSnapshot,
    lights::{Light, LightSet},
    model::{Material, Mesh, DEFAULT_METALLIC, DEFAULT_ROUGHNESS},
    render_queue::{Overlay, OverlayQueue, RenderQueue, Renderable},
    shader::{
        uniforms::{
            G_ALBEDO_SPEC, G_NORMAL, G_POSITION, U_BILLBOARD_HEIGHT,
            U_BILLBOARD_WIDTH, U_BLOOM, U_BLOOM_ENABLED, U_BONES, U_DIFFUSE,
            U_EXPOSURE, U_FAR_PLANE, U_HORIZONTAL, U_IMAGE, U_INVERSE_VIEW,
            U_LIGHT_COLORS, U_LIGHT_COUNT, U_LIGHT_INTENSITY, U_LIGHT_LINEAR,
            U_LIGHT_POS, U_LIGHT_POSITIONS, U_LIGHT_QUADRATIC, U_METALLIC,
            U_MODEL, U_MVP, U_NOISE, U_NOISE_SCALE, U_NORMAL_MAP,
            U_PROJECTION, U_ROUGHNESS, U_SAMPLES, U_SCENE, U_SHADOW_ENABLED,
            U_SHADOW_LIGHT_POS, U_SHADOW_MAP, U_SHADOW_MATRICES, U_SSAO,
            U_SSAO_INPUT, U_TEXTURE, U_VIEW, U_VIEW_POS,
        },
        ProgramId, ShaderProgram, UniformValue,
    },
    text_overlay::{self, GlyphAtlas},
    texture::{TextureData, TextureFormat, TextureManager},
    types::{
        TextureId, BLOOM_ITERATIONS, LIGHT_JITTER, MAX_BONES, SHADOW_FAR,
    },
    um_error::UmError,
    vertex::OverlayVertex,
    world::TileSource,
};
use log::{debug, error, info, trace, warn};
use nalgebra_glm as glm;
use rand::{rngs::StdRng, SeedableRng};
use std::{sync::Arc, time::Instant};

const OVERLAY_PROGRAMS: [ProgramId; 3] =
    [ProgramId::TextOverlay, ProgramId::Gui, ProgramId::Minimap];

/// Ping-pong target written by bloom pass `i`. The first pass writes
/// target 1 so the horizontal passes always land there.
const fn blur_target(i: usize) -> usize {
    if i % 2 == 0 {
        1
    } else {
        0
    }
}

/// The deferred frame graph. Owns the backend, the linked programs and the
/// per-frame queues; everything else is handed in by the caller.
///
/// A frame is `begin_frame`, any number of `enqueue_*` calls, then
/// `end_frame`, which runs every pass in a fixed order and leaves both
/// queues empty.
pub struct Renderer<B: RenderBackend> {
    backend: B,
    programs: Vec<ShaderProgram>,
    current: ProgramId,
    pass: Option<Pass>,
    textures: TextureManager,
    white: TextureId,
    flat_normal: TextureId,
    matrix_stack: MatrixStack,
    camera: CameraSnapshot,
    lights: LightSet,
    light_jitter: f32,
    exposure: f32,
    bloom: bool,
    render_queue: RenderQueue,
    overlay_queue: OverlayQueue,
    minimap_enabled: bool,
    minimap: Option<Arc<dyn TileSource + Send + Sync>>,
    font: Option<GlyphAtlas>,
}

impl<B: RenderBackend> Renderer<B> {
    /// Links every program, loads it into the backend and creates the
    /// built-in textures and the SSAO kernel. Runs once; any failure is
    /// fatal.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn new(
        mut backend: B,
        textures: TextureManager,
    ) -> Result<Self, UmError> {
        let mut programs = Vec::with_capacity(ProgramId::ALL.len());
        for id in ProgramId::ALL {
            let program = ShaderProgram::link(id)?;
            backend.load_program(id, program.table())?;
            programs.push(program);
        }
        let (white, flat_normal) = textures.load_builtins(&mut backend)?;

        let mut rng = StdRng::from_entropy();
        let noise = textures.insert(
            "<ssao noise>",
            &ssao::noise_texture(&mut rng)?,
            &mut backend,
        )?;
        let kernel = ssao::kernel(&mut rng);

        let mut renderer = Self {
            backend,
            programs,
            current: ProgramId::GeometryPass,
            pass: None,
            textures,
            white,
            flat_normal,
            matrix_stack: MatrixStack::default(),
            camera: CameraSnapshot::default(),
            lights: LightSet::new(),
            light_jitter: LIGHT_JITTER,
            exposure: 1.0,
            bloom: true,
            render_queue: RenderQueue::default(),
            overlay_queue: OverlayQueue::default(),
            minimap_enabled: false,
            minimap: None,
            font: None,
        };
        renderer.bind_fixed_inputs(&kernel, noise);
        info!("Renderer ready with {} programs", ProgramId::ALL.len());
        Ok(renderer)
    }

    /// Sampler bindings and constants that never change between frames
    fn bind_fixed_inputs(&mut self, kernel: &[glm::Vec3], noise: TextureId) {
        let target = TextureRef::Target;

        self.use_program(ProgramId::Ssao);
        self.uniform(U_SAMPLES, kernel);
        self.bind_texture(G_POSITION, target(Target::GPosition));
        self.bind_texture(G_NORMAL, target(Target::GNormal));
        self.bind_texture(U_NOISE, TextureRef::Texture(noise));

        self.use_program(ProgramId::SsaoBlur);
        self.bind_texture(U_SSAO_INPUT, target(Target::Ssao));

        self.use_program(ProgramId::LightingPass);
        self.bind_texture(G_POSITION, target(Target::GPosition));
        self.bind_texture(G_NORMAL, target(Target::GNormal));
        self.bind_texture(G_ALBEDO_SPEC, target(Target::GAlbedoSpec));
        self.bind_texture(U_SSAO, target(Target::SsaoBlur));
        self.bind_texture(U_SHADOW_MAP, target(Target::ShadowCube));
        self.uniform(U_FAR_PLANE, SHADOW_FAR);

        self.use_program(ProgramId::DepthMap);
        self.uniform(U_FAR_PLANE, SHADOW_FAR);

        self.use_program(ProgramId::HdrBlend);
        self.bind_texture(U_SCENE, target(Target::Hdr));
        let last = blur_target(BLOOM_ITERATIONS - 1);
        self.bind_texture(U_BLOOM, target(Target::PingPong(last)));
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// # Errors
    /// May return `UmError`
    pub fn set_viewport(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<(), UmError> {
        debug!("Viewport {}x{}", width, height);
        self.backend.resize([width, height])
    }

    pub fn update_camera(&mut self, camera: CameraSnapshot) {
        self.camera = camera;
    }

    #[must_use]
    pub const fn camera(&self) -> &CameraSnapshot {
        &self.camera
    }

    #[must_use]
    pub const fn current_pass(&self) -> Option<Pass> {
        self.pass
    }

    pub fn use_program(&mut self, id: ProgramId) {
        self.current = id;
    }

    #[must_use]
    pub fn program(&self, id: ProgramId) -> &ShaderProgram {
        &self.programs[id.index()]
    }

    fn current_program(&mut self) -> &mut ShaderProgram {
        &mut self.programs[self.current.index()]
    }

    /// Sets a uniform of the current program. Unknown names and type
    /// mismatches are logged and skipped.
    pub fn uniform<'a>(
        &mut self,
        name: &str,
        value: impl Into<UniformValue<'a>>,
    ) -> bool {
        self.current_program().set_uniform(name, value)
    }

    pub fn bind_texture(&mut self, name: &str, texture: TextureRef) -> bool {
        self.current_program().set_texture(name, texture)
    }

    /// Texture from the cache, loaded on first use
    ///
    /// # Errors
    /// May return `UmError`
    pub fn load_texture(
        &mut self,
        name: &str,
        format: TextureFormat,
    ) -> Result<TextureId, UmError> {
        self.textures.load(name, format, &mut self.backend)
    }

    /// Uploads generated texture data and caches it under `name`
    ///
    /// # Errors
    /// May return `UmError`
    pub fn insert_texture(
        &mut self,
        name: &str,
        data: &TextureData,
    ) -> Result<TextureId, UmError> {
        self.textures.insert(name, data, &mut self.backend)
    }

    #[must_use]
    pub const fn white_texture(&self) -> TextureId {
        self.white
    }

    #[must_use]
    pub const fn texture_manager(&self) -> &TextureManager {
        &self.textures
    }

    pub fn push_matrix(&mut self) {
        self.matrix_stack.push();
    }

    pub fn pop_matrix(&mut self) {
        self.matrix_stack.pop();
        self.update_mvp();
    }

    pub fn translate(&mut self, v: &glm::Vec3) {
        self.matrix_stack.translate(v);
        self.update_mvp();
    }

    pub fn rotate(&mut self, angle: f32, axis: &glm::Vec3) {
        self.matrix_stack.rotate(angle, axis);
        self.update_mvp();
    }

    pub fn rotate_quat(&mut self, q: &glm::Quat) {
        self.matrix_stack.rotate_quat(q);
        self.update_mvp();
    }

    pub fn scale(&mut self, v: &glm::Vec3) {
        self.matrix_stack.scale(v);
        self.update_mvp();
    }

    pub fn multiply(&mut self, m: &glm::Mat4) {
        self.matrix_stack.multiply(m);
        self.update_mvp();
    }

    #[must_use]
    pub const fn model_matrix(&self) -> &glm::Mat4 {
        self.matrix_stack.top()
    }

    /// Refreshes `uModel` and `uMVP` if the current program has them
    fn update_mvp(&mut self) {
        let model = *self.matrix_stack.top();
        let mvp = self.camera.projection * self.camera.view * model;
        let program = &mut self.programs[self.current.index()];
        if program.has_uniform(U_MODEL) {
            program.set_uniform(U_MODEL, model);
        }
        if program.has_uniform(U_MVP) {
            program.set_uniform(U_MVP, mvp);
        }
    }

    /// # Errors
    /// Returns `InvalidState` once `MAX_LIGHTS` lights are registered
    pub fn add_light(&mut self, light: Light) -> Result<usize, UmError> {
        self.lights.add(light)
    }

    pub fn clear_lights(&mut self) {
        self.lights.clear();
    }

    #[must_use]
    pub const fn lights(&self) -> &LightSet {
        &self.lights
    }

    /// Strength of the per-pass light flicker, 0 to disable
    pub fn set_light_jitter(&mut self, jitter: f32) {
        self.light_jitter = jitter.abs();
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.exposure = exposure;
    }

    pub fn set_bloom(&mut self, enabled: bool) {
        self.bloom = enabled;
    }

    pub fn enqueue_renderable(&mut self, renderable: Renderable) {
        self.render_queue.push(renderable);
    }

    pub fn enqueue_overlay(&mut self, overlay: Overlay) {
        self.overlay_queue.push(overlay);
    }

    #[must_use]
    pub const fn render_queue(&self) -> &RenderQueue {
        &self.render_queue
    }

    #[must_use]
    pub const fn overlay_queue(&self) -> &OverlayQueue {
        &self.overlay_queue
    }

    pub fn toggle_minimap(&mut self, enabled: bool) {
        self.minimap_enabled = enabled;
    }

    pub fn set_minimap(&mut self, tiles: Arc<dyn TileSource + Send + Sync>) {
        self.minimap = Some(tiles);
    }

    pub fn set_font(&mut self, font: GlyphAtlas) {
        self.font = Some(font);
    }

    #[must_use]
    pub const fn glyphs(&self) -> Option<&GlyphAtlas> {
        self.font.as_ref()
    }

    /// Draws a mesh with a bone palette. Only valid in the shadow and
    /// geometry passes; the palette is padded with identity matrices or
    /// cut to `MAX_BONES`.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn draw_mesh(
        &mut self,
        mesh: &Mesh,
        palette: &[glm::Mat4],
    ) -> Result<(), UmError> {
        match self.pass {
            Some(Pass::Shadow) => {}
            Some(Pass::Geometry) => {
                self.bind_material(mesh.material.as_ref())?;
            }
            other => {
                warn!("Mesh '{}' drawn in {:?}, skipped", mesh.name, other);
                return Ok(());
            }
        }
        let mut bones = vec![glm::Mat4::identity(); MAX_BONES];
        for (slot, m) in bones.iter_mut().zip(palette) {
            *slot = *m;
        }
        self.update_mvp();
        self.uniform(U_BONES, bones.as_slice());
        self.submit(Geometry::Mesh(mesh.handle))
    }

    fn bind_material(
        &mut self,
        material: Option<&Material>,
    ) -> Result<(), UmError> {
        let (diffuse, normal, roughness, metallic) = match material {
            Some(m) => (
                self.load_texture(&m.diffuse, TextureFormat::Rgba8Srgb)?,
                self.load_texture(&m.normal_map, TextureFormat::Rgba8Unorm)?,
                m.roughness,
                m.metallic,
            ),
            None => (
                self.white,
                self.flat_normal,
                DEFAULT_ROUGHNESS,
                DEFAULT_METALLIC,
            ),
        };
        self.bind_texture(U_DIFFUSE, TextureRef::Texture(diffuse));
        self.bind_texture(U_NORMAL_MAP, TextureRef::Texture(normal));
        self.uniform(U_ROUGHNESS, roughness);
        self.uniform(U_METALLIC, metallic);
        Ok(())
    }

    /// Draws a camera facing quad in the forward pass
    ///
    /// # Errors
    /// May return `UmError`
    pub fn draw_point(
        &mut self,
        position: &glm::Vec3,
        width: f32,
        height: f32,
        texture: &str,
    ) -> Result<(), UmError> {
        if self.pass != Some(Pass::Forward) {
            warn!("Billboard '{}' drawn in {:?}, skipped", texture, self.pass);
            return Ok(());
        }
        let id = self.load_texture(texture, TextureFormat::Rgba8Srgb)?;
        self.use_program(ProgramId::Billboard);
        self.uniform(U_BILLBOARD_WIDTH, width);
        self.uniform(U_BILLBOARD_HEIGHT, height);
        self.bind_texture(U_TEXTURE, TextureRef::Texture(id));
        self.submit(Geometry::Point([position.x, position.y, position.z]))
    }

    /// Draws screen space quads with the current program in the overlay
    /// pass
    ///
    /// # Errors
    /// May return `UmError`
    pub fn draw_overlay_quads(
        &mut self,
        vertices: Vec<OverlayVertex>,
    ) -> Result<(), UmError> {
        if self.pass != Some(Pass::Overlay) {
            warn!("Overlay drawn in {:?}, skipped", self.pass);
            return Ok(());
        }
        if vertices.is_empty() {
            return Ok(());
        }
        self.submit(Geometry::Quads(vertices))
    }

    fn submit(&mut self, geometry: Geometry) -> Result<(), UmError> {
        let program = &self.programs[self.current.index()];
        let call = DrawCall {
            program: program.id(),
            uniforms: program.block(),
            textures: program.textures(),
            geometry,
        };
        self.backend.draw(&call)
    }

    /// Drops anything queued and resets the model matrix
    pub fn begin_frame(&mut self) {
        self.render_queue.clear();
        self.overlay_queue.clear();
        self.matrix_stack.reset();
    }

    /// Runs every pass over the queued items. The queues are empty
    /// afterwards whatever the outcome. A swapchain that went out of date
    /// skips the frame without an error.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn end_frame(&mut self, animator: &Animator) -> Result<(), UmError> {
        let renderables = std::mem::take(&mut self.render_queue);
        let overlays = std::mem::take(&mut self.overlay_queue);
        let start = Instant::now();
        let result = self.run_passes(&renderables, &overlays, animator);
        self.pass = None;
        match result {
            Ok(()) => {
                trace!("Frame took {:?}", start.elapsed());
                Ok(())
            }
            Err(UmError::SwapchainOutOfDate) => {
                debug!("Swapchain out of date, frame skipped");
                Ok(())
            }
            Err(e) => {
                error!("Frame failed: {}", e);
                Err(e)
            }
        }
    }

    fn run_passes(
        &mut self,
        renderables: &RenderQueue,
        overlays: &OverlayQueue,
        animator: &Animator,
    ) -> Result<(), UmError> {
        self.backend.begin_frame()?;
        self.matrix_stack.reset();

        let shadow_light =
            self.lights.nearest(&self.camera.position).map(|l| l.position);
        if let Some(light_pos) = shadow_light {
            self.run_pass(Pass::Shadow, |r| {
                r.shadow_pass(&light_pos, renderables, animator)
            })?;
        }
        self.run_pass(Pass::Geometry, |r| {
            r.geometry_pass(renderables, animator)
        })?;
        self.run_pass(Pass::Ssao, Self::ssao_pass)?;
        self.run_pass(Pass::SsaoBlur, |r| {
            r.fullscreen(ProgramId::SsaoBlur)
        })?;
        self.run_pass(Pass::Lighting, |r| r.lighting_pass(shadow_light))?;
        self.backend.copy_depth()?;
        self.run_pass(Pass::Forward, |r| {
            r.forward_pass(renderables, animator)
        })?;
        for i in 0..BLOOM_ITERATIONS {
            self.run_pass(Pass::Blur(blur_target(i)), |r| r.blur_pass(i))?;
        }
        self.run_pass(Pass::Composite, Self::composite_pass)?;
        self.run_pass(Pass::Overlay, |r| r.overlay_pass(overlays))?;
        self.backend.end_frame()
    }

    fn run_pass(
        &mut self,
        pass: Pass,
        body: impl FnOnce(&mut Self) -> Result<(), UmError>,
    ) -> Result<(), UmError> {
        let start = Instant::now();
        self.backend.begin_pass(pass)?;
        self.pass = Some(pass);
        body(self)?;
        self.pass = None;
        self.backend.end_pass()?;
        trace!("{:?} pass took {:?}", pass, start.elapsed());
        Ok(())
    }

    fn draw_queued(
        &mut self,
        renderables: &RenderQueue,
        animator: &Animator,
        opaque: bool,
    ) -> Result<(), UmError> {
        for r in renderables.iter().filter(|r| r.is_opaque() == opaque) {
            r.draw(self, animator)?;
        }
        Ok(())
    }

    fn shadow_pass(
        &mut self,
        light_pos: &glm::Vec3,
        renderables: &RenderQueue,
        animator: &Animator,
    ) -> Result<(), UmError> {
        let faces = shadow::face_matrices(light_pos);
        self.use_program(ProgramId::DepthMap);
        self.uniform(U_SHADOW_MATRICES, faces.as_slice());
        self.uniform(U_LIGHT_POS, *light_pos);
        self.draw_queued(renderables, animator, true)
    }

    fn geometry_pass(
        &mut self,
        renderables: &RenderQueue,
        animator: &Animator,
    ) -> Result<(), UmError> {
        self.use_program(ProgramId::GeometryPass);
        self.uniform(U_VIEW, self.camera.view);
        self.uniform(U_PROJECTION, self.camera.projection);
        self.draw_queued(renderables, animator, true)
    }

    fn ssao_pass(&mut self) -> Result<(), UmError> {
        let scale = ssao::noise_scale(self.backend.dimensions());
        self.use_program(ProgramId::Ssao);
        self.uniform(U_PROJECTION, self.camera.projection);
        self.uniform(U_NOISE_SCALE, scale);
        self.submit(Geometry::FullscreenQuad)
    }

    fn fullscreen(&mut self, program: ProgramId) -> Result<(), UmError> {
        self.use_program(program);
        self.submit(Geometry::FullscreenQuad)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn lighting_pass(
        &mut self,
        shadow_light: Option<glm::Vec3>,
    ) -> Result<(), UmError> {
        // Reseeded every pass so the flicker never settles into a pattern
        let mut rng = StdRng::from_entropy();
        let intensities =
            self.lights.jittered_intensities(&mut rng, self.light_jitter);
        let lights = self.lights.as_slice();
        let positions: Vec<glm::Vec3> =
            lights.iter().map(|l| l.position).collect();
        let colours: Vec<glm::Vec3> = lights.iter().map(|l| l.colour).collect();
        let linear: Vec<f32> = lights.iter().map(|l| l.linear).collect();
        let quadratic: Vec<f32> = lights.iter().map(|l| l.quadratic).collect();
        // At most MAX_LIGHTS
        let count = lights.len() as i32;
        let view = self.camera.view;

        self.use_program(ProgramId::LightingPass);
        self.uniform(U_LIGHT_POSITIONS, positions.as_slice());
        self.uniform(U_LIGHT_COLORS, colours.as_slice());
        self.uniform(U_LIGHT_LINEAR, linear.as_slice());
        self.uniform(U_LIGHT_QUADRATIC, quadratic.as_slice());
        self.uniform(U_LIGHT_INTENSITY, intensities.as_slice());
        self.uniform(U_LIGHT_COUNT, count);
        self.uniform(U_VIEW, view);
        self.uniform(U_INVERSE_VIEW, glm::inverse(&view));
        self.uniform(U_VIEW_POS, self.camera.position);
        self.uniform(U_SHADOW_ENABLED, shadow_light.is_some());
        self.uniform(
            U_SHADOW_LIGHT_POS,
            shadow_light.unwrap_or_else(glm::Vec3::zeros),
        );
        self.submit(Geometry::FullscreenQuad)
    }

    fn forward_pass(
        &mut self,
        renderables: &RenderQueue,
        animator: &Animator,
    ) -> Result<(), UmError> {
        self.use_program(ProgramId::Billboard);
        self.uniform(U_VIEW, self.camera.view);
        self.uniform(U_PROJECTION, self.camera.projection);
        self.draw_queued(renderables, animator, false)
    }

    fn blur_pass(&mut self, i: usize) -> Result<(), UmError> {
        let target = blur_target(i);
        let source = if i == 0 {
            Target::Bright
        } else {
            Target::PingPong(1 - target)
        };
        self.use_program(ProgramId::GaussianBlur);
        self.uniform(U_HORIZONTAL, target == 1);
        self.bind_texture(U_IMAGE, TextureRef::Target(source));
        self.submit(Geometry::FullscreenQuad)
    }

    fn composite_pass(&mut self) -> Result<(), UmError> {
        self.use_program(ProgramId::HdrBlend);
        self.uniform(U_EXPOSURE, self.exposure);
        self.uniform(U_BLOOM_ENABLED, self.bloom);
        self.submit(Geometry::FullscreenQuad)
    }

    fn overlay_pass(
        &mut self,
        overlays: &OverlayQueue,
    ) -> Result<(), UmError> {
        let dimensions = self.backend.dimensions();
        let projection = text_overlay::overlay_projection(dimensions);
        for id in OVERLAY_PROGRAMS {
            self.programs[id.index()].set_uniform(U_PROJECTION, projection);
        }
        for overlay in overlays {
            overlay.draw(self)?;
        }
        if self.minimap_enabled {
            if let Some(tiles) = self.minimap.clone() {
                let quads = minimap::quads(
                    tiles.as_ref(),
                    dimensions,
                    &self.camera.position,
                );
                self.use_program(ProgramId::Minimap);
                self.draw_overlay_quads(quads)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RecordingBackend;

    #[test]
    fn bloom_ends_on_the_bound_target() {
        let writes: Vec<usize> =
            (0..BLOOM_ITERATIONS).map(blur_target).collect();
        assert_eq!(writes[0], 1);
        assert_eq!(writes[1], 0);
        assert_eq!(
            *writes.last().unwrap(),
            blur_target(BLOOM_ITERATIONS - 1)
        );
    }

    #[test]
    fn construction_links_programs_and_builtins() {
        let renderer = Renderer::new(
            RecordingBackend::new([64, 64]),
            TextureManager::new("no/such/dir"),
        );
        let mut renderer = renderer.unwrap();
        renderer.set_light_jitter(-0.2);
        assert!((renderer.light_jitter - 0.2).abs() < f32::EPSILON);
        assert_eq!(renderer.current_pass(), None);
        assert_eq!(renderer.backend().loaded_programs().len(), 11);
        // white, flat normal and noise
        assert_eq!(renderer.backend().textures().len(), 3);
    }
}
