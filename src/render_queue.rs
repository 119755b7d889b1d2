use crate::{
    animation::Animator,
    billboard::Billboard,
    model::{AnimatedModel, Model},
    renderer::{RenderBackend, Renderer},
    text_overlay::{GuiElement, TextOverlay},
    um_error::UmError,
    world::PhysicsBody,
};
use nalgebra_glm as glm;
use parking_lot::Mutex;
use std::{fmt, sync::Arc};

/// Where a renderable sits in the world
#[derive(Clone)]
pub enum Placement {
    Fixed {
        position: glm::Vec3,
        rotation: glm::Quat,
    },
    /// Read from the rigid body once per draw
    Body(Arc<Mutex<dyn PhysicsBody + Send>>),
}

impl Placement {
    #[must_use]
    pub fn at(position: glm::Vec3) -> Self {
        Self::Fixed {
            position,
            rotation: glm::Quat::identity(),
        }
    }

    #[must_use]
    pub fn transform(&self) -> (glm::Vec3, glm::Quat) {
        match self {
            Self::Fixed { position, rotation } => (*position, *rotation),
            Self::Body(body) => {
                let body = body.lock();
                (body.position(), body.rotation())
            }
        }
    }
}

impl fmt::Debug for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed { position, rotation } => f
                .debug_struct("Fixed")
                .field("position", position)
                .field("rotation", rotation)
                .finish(),
            Self::Body(_) => f.write_str("Body"),
        }
    }
}

/// Everything that can be drawn in the geometry, shadow or forward pass
#[derive(Clone, Debug)]
pub enum Renderable {
    Animated {
        model: AnimatedModel,
        placement: Placement,
        /// Applied after the placement, e.g. to stand a model upright
        intrinsic: glm::Mat4,
    },
    Static {
        model: Arc<Model>,
        placement: Placement,
        intrinsic: glm::Mat4,
    },
    Billboard(Billboard),
}

impl Renderable {
    #[must_use]
    pub fn animated(model: AnimatedModel, placement: Placement) -> Self {
        Self::Animated {
            model,
            placement,
            intrinsic: glm::Mat4::identity(),
        }
    }

    #[must_use]
    pub fn fixed(model: Arc<Model>, placement: Placement) -> Self {
        Self::Static {
            model,
            placement,
            intrinsic: glm::Mat4::identity(),
        }
    }

    #[must_use]
    pub fn with_intrinsic(mut self, m: glm::Mat4) -> Self {
        match &mut self {
            Self::Animated { intrinsic, .. }
            | Self::Static { intrinsic, .. } => *intrinsic = m,
            Self::Billboard(_) => {}
        }
        self
    }

    /// Opaque renderables go through the deferred passes, the rest through
    /// the forward pass
    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        !matches!(self, Self::Billboard(_))
    }

    /// # Errors
    /// May return `UmError`
    pub fn draw<B: RenderBackend>(
        &self,
        renderer: &mut Renderer<B>,
        animator: &Animator,
    ) -> Result<(), UmError> {
        match self {
            Self::Animated {
                model,
                placement,
                intrinsic,
            } => placed(renderer, placement, intrinsic, |r| {
                model.draw(r, animator)
            }),
            Self::Static {
                model,
                placement,
                intrinsic,
            } => placed(renderer, placement, intrinsic, |r| model.draw(r)),
            Self::Billboard(b) => b.draw(renderer),
        }
    }
}

fn placed<B: RenderBackend>(
    renderer: &mut Renderer<B>,
    placement: &Placement,
    intrinsic: &glm::Mat4,
    draw: impl FnOnce(&mut Renderer<B>) -> Result<(), UmError>,
) -> Result<(), UmError> {
    let (position, rotation) = placement.transform();
    renderer.push_matrix();
    renderer.translate(&position);
    renderer.rotate_quat(&rotation);
    renderer.multiply(intrinsic);
    let result = draw(renderer);
    renderer.pop_matrix();
    result
}

/// Screen space items drawn in the overlay pass
#[derive(Clone, Debug, PartialEq)]
pub enum Overlay {
    Text(TextOverlay),
    Gui(GuiElement),
}

impl Overlay {
    /// # Errors
    /// May return `UmError`
    pub fn draw<B: RenderBackend>(
        &self,
        renderer: &mut Renderer<B>,
    ) -> Result<(), UmError> {
        match self {
            Self::Text(t) => t.draw(renderer),
            Self::Gui(g) => g.draw(renderer),
        }
    }
}

/// Submission ordered list that lives for one frame
#[derive(Clone, Debug)]
pub struct Queue<T> {
    items: Vec<T>,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Queue<T> {
    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a, T> IntoIterator for &'a Queue<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub type RenderQueue = Queue<Renderable>;
pub type OverlayQueue = Queue<Overlay>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Crate {
        position: glm::Vec3,
    }

    impl PhysicsBody for Crate {
        fn position(&self) -> glm::Vec3 {
            self.position
        }

        fn rotation(&self) -> glm::Quat {
            glm::quat_angle_axis(1.0, &glm::vec3(0.0, 1.0, 0.0))
        }

        fn set_linear_velocity(&mut self, _velocity: glm::Vec3) {}

        fn set_angular_velocity(&mut self, _velocity: glm::Vec3) {}

        fn apply_impulse(&mut self, impulse: glm::Vec3, _rel: glm::Vec3) {
            self.position += impulse;
        }
    }

    #[test]
    fn body_placement_follows_the_body() {
        let body = Arc::new(Mutex::new(Crate {
            position: glm::vec3(1.0, 0.0, 0.0),
        }));
        let placement = Placement::Body(body.clone());
        body.lock()
            .apply_impulse(glm::vec3(0.0, 2.0, 0.0), glm::Vec3::zeros());
        let (position, rotation) = placement.transform();
        assert!(glm::distance(&position, &glm::vec3(1.0, 2.0, 0.0)) < 0.0001);
        assert!((glm::quat_angle(&rotation) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn only_billboards_are_translucent() {
        let b = Renderable::Billboard(Billboard::new(
            glm::Vec3::zeros(),
            "flame.png",
        ));
        assert!(!b.is_opaque());
        let mut queue = RenderQueue::default();
        queue.push(b);
        assert_eq!(queue.iter().filter(|r| r.is_opaque()).count(), 0);
        queue.clear();
        assert!(queue.is_empty());
    }
}
