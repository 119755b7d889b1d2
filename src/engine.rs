//! The top level context. One `Engine` owns everything that lives for the
//! whole run, so there are no globals and everything is torn down together
//! when it is dropped.
use crate::{
    animation::{Animator, ClipCache},
    billboard::ParticleSystem,
    camera::CameraSnapshot,
    config::Config,
    renderer::{RenderBackend, Renderer},
    text_overlay::{GlyphAtlas, FONT_DIR},
    texture::{TextureManager, TEXTURE_DIR},
    um_error::{ErrorKind, UmError},
    vk::{VkBackend, VkWindow, WindowProperties},
};
use log::{info, warn};
use std::path::Path;
use winit::event_loop::EventLoop;

pub struct Engine<B: RenderBackend> {
    config: Config,
    renderer: Renderer<B>,
    animator: Animator,
    clips: ClipCache,
    particles: ParticleSystem,
}

impl<B: RenderBackend> Engine<B> {
    /// Builds the renderer over `backend` and loads the configured font. A
    /// missing font only disables text.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn new(config: Config, backend: B) -> Result<Self, UmError> {
        let mut renderer =
            Renderer::new(backend, TextureManager::new(TEXTURE_DIR))?;
        match GlyphAtlas::load(
            Path::new(FONT_DIR),
            &config.graphics.font,
            &mut renderer,
        ) {
            Ok(atlas) => renderer.set_font(atlas),
            Err(e) if e.kind() == ErrorKind::FileNotFound => {
                warn!("Text disabled: {e}");
            }
            Err(e) => return Err(e),
        }
        Ok(Self {
            config,
            renderer,
            animator: Animator::new(),
            clips: ClipCache::new(),
            particles: ParticleSystem::new(),
        })
    }

    /// Runs one frame. Clocks advance by `dt` seconds, the queues are reset
    /// and the particles queued, then `submit` queues the scene before every
    /// pass runs.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn frame(
        &mut self,
        dt: f32,
        camera: CameraSnapshot,
        submit: impl FnOnce(&mut Renderer<B>, &mut Animator),
    ) -> Result<(), UmError> {
        self.animator.update(dt);
        self.particles.update(dt);
        self.renderer.begin_frame();
        self.renderer.update_camera(camera);
        self.particles.submit(&mut self.renderer);
        submit(&mut self.renderer, &mut self.animator);
        self.renderer.end_frame(&self.animator)
    }

    /// Width over height of the render area, for camera projections
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        let [w, h] = self.renderer.backend().dimensions();
        if h == 0 {
            1.0
        } else {
            w as f32 / h as f32
        }
    }

    /// # Errors
    /// May return `UmError`
    pub fn resize(&mut self, dimensions: [u32; 2]) -> Result<(), UmError> {
        self.renderer.set_viewport(dimensions[0], dimensions[1])
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<B> {
        &mut self.renderer
    }

    #[must_use]
    pub const fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut Animator {
        &mut self.animator
    }

    /// Split borrow for loading scenes, which needs the renderer and the
    /// animator at once
    pub fn scene_mut(&mut self) -> (&mut Renderer<B>, &mut Animator) {
        (&mut self.renderer, &mut self.animator)
    }

    #[must_use]
    pub const fn clips(&self) -> &ClipCache {
        &self.clips
    }

    #[must_use]
    pub const fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut ParticleSystem {
        &mut self.particles
    }
}

impl Engine<VkBackend> {
    /// Opens the window described by `config` and builds the Vulkan
    /// backend on it. The caller keeps the event loop and drives frames.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn with_window(
        config: Config,
        event_loop: &EventLoop<()>,
    ) -> Result<Self, UmError> {
        config.validate()?;
        let properties = WindowProperties {
            dimensions: config.graphics.dimensions()?,
            fullscreen: config.graphics.fullscreen,
            ..WindowProperties::default()
        };
        if config.graphics.msaa > 1 {
            info!(
                "MSAA x{} requested, deferred targets are single sampled",
                config.graphics.msaa
            );
        }
        let window = VkWindow::new(&properties, event_loop)?;
        let backend = VkBackend::new(window, true)?;
        Self::new(config, backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        billboard::{FlameParticle, FLAME_FRAMES},
        renderer::{Event, Pass, RecordingBackend},
        texture::{TextureData, TextureFormat},
    };
    use nalgebra_glm as glm;

    fn engine() -> Engine<RecordingBackend> {
        Engine::new(Config::default(), RecordingBackend::new([640, 480]))
            .unwrap()
    }

    #[test]
    fn missing_font_is_not_fatal() {
        let e = engine();
        assert!(e.renderer().glyphs().is_none());
        assert!((e.aspect_ratio() - 640.0 / 480.0).abs() < 0.0001);
    }

    #[test]
    fn particles_reach_the_forward_pass() {
        let mut e = engine();
        let flame = TextureData::solid([255; 4], TextureFormat::Rgba8Srgb);
        for name in FLAME_FRAMES {
            e.renderer_mut().insert_texture(name, &flame).unwrap();
        }
        e.particles_mut().spawn(FlameParticle::new(glm::vec3(1.0, 1.0, 1.0)));
        let mut submitted = false;
        e.frame(0.016, CameraSnapshot::default(), |r, _| {
            submitted = r.render_queue().len() == 1;
        })
        .unwrap();
        assert!(submitted);
        assert!(e.renderer().render_queue().is_empty());

        let events = e.renderer_mut().backend_mut().take_events();
        let forward = events
            .iter()
            .position(|ev| *ev == Event::BeginPass(Pass::Forward))
            .unwrap();
        assert!(matches!(events[forward + 1], Event::Draw { .. }));
    }
}
