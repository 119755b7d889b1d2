use crate::{
    render_queue::Renderable,
    renderer::{RenderBackend, Renderer},
    um_error::UmError,
};
use nalgebra_glm as glm;

/// Seconds each flame texture is shown
pub const FLAME_FRAME_TIME: f32 = 0.04;
pub const FLAME_SIZE: f32 = 0.5;
pub const FLAME_FRAMES: [&str; 4] = [
    "FlameParticle1_I.jpg",
    "FlameParticle2_I.jpg",
    "FlameParticle3_I.jpg",
    "FlameParticle4_I.jpg",
];

/// Camera facing textured quad centred on a world position. Drawn in the
/// forward pass; the texture is loaded through the cache on first draw.
#[derive(Clone, Debug, PartialEq)]
pub struct Billboard {
    pub position: glm::Vec3,
    pub width: f32,
    pub height: f32,
    pub texture: String,
}

impl Billboard {
    #[must_use]
    pub fn new(position: glm::Vec3, texture: impl Into<String>) -> Self {
        Self {
            position,
            width: 1.0,
            height: 1.0,
            texture: texture.into(),
        }
    }

    /// # Errors
    /// May return `UmError`
    pub fn draw<B: RenderBackend>(
        &self,
        renderer: &mut Renderer<B>,
    ) -> Result<(), UmError> {
        renderer.draw_point(
            &self.position,
            self.width,
            self.height,
            &self.texture,
        )
    }
}

/// Animated torch flame that flips through `FLAME_FRAMES`
#[derive(Clone, Debug)]
pub struct FlameParticle {
    billboard: Billboard,
    age: f32,
    frame: usize,
}

impl FlameParticle {
    #[must_use]
    pub fn new(position: glm::Vec3) -> Self {
        Self {
            billboard: Billboard {
                position,
                width: FLAME_SIZE,
                height: FLAME_SIZE,
                texture: FLAME_FRAMES[0].to_string(),
            },
            age: 0.0,
            frame: 0,
        }
    }

    /// Moves to the next frame once `FLAME_FRAME_TIME` has passed. At most
    /// one frame advances per update and the leftover time is dropped.
    pub fn update(&mut self, dt: f32) {
        self.age += dt;
        if self.age >= FLAME_FRAME_TIME {
            self.frame = (self.frame + 1) % FLAME_FRAMES.len();
            self.age = 0.0;
            self.billboard.texture = FLAME_FRAMES[self.frame].to_string();
        }
    }

    #[must_use]
    pub const fn frame(&self) -> usize {
        self.frame
    }

    #[must_use]
    pub const fn billboard(&self) -> &Billboard {
        &self.billboard
    }
}

/// Owns the particles of a scene and submits them each frame
#[derive(Clone, Debug, Default)]
pub struct ParticleSystem {
    particles: Vec<FlameParticle>,
}

impl ParticleSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, particle: FlameParticle) {
        self.particles.push(particle);
    }

    pub fn update(&mut self, dt: f32) {
        for p in &mut self.particles {
            p.update(dt);
        }
    }

    /// Queues every particle for this frame's forward pass
    pub fn submit<B: RenderBackend>(&self, renderer: &mut Renderer<B>) {
        for p in &self.particles {
            renderer.enqueue_renderable(Renderable::Billboard(
                p.billboard.clone(),
            ));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flame_cycles_frames() {
        let mut flame = FlameParticle::new(glm::Vec3::zeros());
        flame.update(0.03);
        assert_eq!(flame.frame(), 0);
        flame.update(0.02);
        assert_eq!(flame.frame(), 1);
        assert_eq!(flame.billboard().texture, FLAME_FRAMES[1]);
        // A long frame still only advances once
        flame.update(1.0);
        assert_eq!(flame.frame(), 2);
        flame.update(0.05);
        flame.update(0.05);
        assert_eq!(flame.frame(), 0);
    }
}
