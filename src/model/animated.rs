use super::resource::Model;
use crate::{
    animation::{Animator, InstanceId},
    renderer::{RenderBackend, Renderer},
    um_error::UmError,
};
use std::sync::Arc;

/// A shared model plus the handle of one object's playback state
#[derive(Clone, Debug)]
pub struct AnimatedModel {
    model: Arc<Model>,
    instance: InstanceId,
}

impl AnimatedModel {
    pub fn new(model: Arc<Model>, animator: &mut Animator) -> Self {
        Self {
            model,
            instance: animator.create_instance(),
        }
    }

    #[must_use]
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    #[must_use]
    pub const fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Plays a clip of the model from the start, replacing whatever was
    /// playing
    ///
    /// # Errors
    /// May return `UmError`
    pub fn start_animation(
        &self,
        animator: &mut Animator,
        name: &str,
    ) -> Result<(), UmError> {
        let clip = self.model.animation(name).ok_or_else(|| {
            UmError::no_such_animation(&self.model.name, name)
        })?;
        animator.stop(self.instance);
        animator.start(self.instance, clip)
    }

    pub fn stop_animation(&self, animator: &mut Animator) {
        animator.stop(self.instance);
    }

    /// Returns the playback slot to the animator. Clones made earlier share
    /// the slot and are left drawing the bind pose.
    pub fn release(self, animator: &mut Animator) {
        animator.release_instance(self.instance);
    }

    /// Draws every mesh with the bone palette of the current playback
    /// state, the identity palette when stopped
    ///
    /// # Errors
    /// May return `UmError`
    pub fn draw<B: RenderBackend>(
        &self,
        renderer: &mut Renderer<B>,
        animator: &Animator,
    ) -> Result<(), UmError> {
        for mesh in &self.model.meshes {
            let palette = animator.palette_for(self.instance, &mesh.skeleton);
            renderer.draw_mesh(mesh, &palette)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        animation::{AnimationClip, Node, NodeTree},
        mesh_import::ImportedScene,
        renderer::RecordingBackend,
        um_error::ErrorKind,
    };

    fn model() -> Arc<Model> {
        let scene = ImportedScene {
            nodes: NodeTree {
                nodes: vec![Node {
                    name: "root".to_string(),
                    transform: nalgebra_glm::Mat4::identity(),
                    children: Vec::new(),
                }],
                root: 0,
            },
            meshes: Vec::new(),
            materials: Vec::new(),
            clip_count: 0,
        };
        let mut backend = RecordingBackend::new([8, 8]);
        let mut model =
            Model::from_scene("knight", scene, &mut backend).unwrap();
        model.add_animation(
            "walk",
            Arc::new(AnimationClip {
                name: "Walk".to_string(),
                ticks_per_second: 1.0,
                duration: 1.0,
                channels: ahash::HashMap::default(),
            }),
        );
        Arc::new(model)
    }

    #[test]
    fn unknown_clip_names_model_and_clip() {
        let mut animator = Animator::new();
        let knight = AnimatedModel::new(model(), &mut animator);
        let e = knight.start_animation(&mut animator, "dance").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidParameter);
        let text = e.to_string();
        assert!(text.contains("knight") && text.contains("dance"));
        assert!(text.contains("animated.rs"));
    }

    #[test]
    fn restart_resets_clock() {
        let mut animator = Animator::new();
        let knight = AnimatedModel::new(model(), &mut animator);
        knight.start_animation(&mut animator, "walk").unwrap();
        animator.update(0.5);
        knight.start_animation(&mut animator, "walk").unwrap();
        let state = animator.state(knight.instance()).unwrap();
        assert_eq!(state.clip_name(), Some("Walk"));
        assert!(state.elapsed().abs() < f32::EPSILON);
        knight.stop_animation(&mut animator);
        let state = animator.state(knight.instance()).unwrap();
        assert!(!state.is_playing());
    }

    #[test]
    fn release_frees_the_slot() {
        let mut animator = Animator::new();
        let knight = AnimatedModel::new(model(), &mut animator);
        let copy = knight.clone();
        knight.start_animation(&mut animator, "walk").unwrap();
        assert_eq!(animator.len(), 1);

        knight.release(&mut animator);
        assert!(animator.is_empty());
        assert!(animator.state(copy.instance()).is_none());
        let e = copy.start_animation(&mut animator, "walk").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidState);

        // A new character takes the slot without the old handle reaching it
        let squire = AnimatedModel::new(model(), &mut animator);
        squire.start_animation(&mut animator, "walk").unwrap();
        copy.stop_animation(&mut animator);
        assert!(animator.state(squire.instance()).unwrap().is_playing());
    }
}
