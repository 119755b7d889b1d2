use super::{
    types::{AnimationClip, Skeleton},
    util,
};
use crate::um_error::UmError;
use log::{debug, warn};
use nalgebra_glm as glm;
use std::{fmt, sync::Arc};

/// Handle to an animation instance owned by an `Animator`. A slot freed by
/// `release_instance` is reused with a new generation, so a handle kept past
/// its release never reaches the next owner of the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId {
    index: usize,
    generation: u32,
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Playback state of one animated object. There is no finished state:
/// playback loops until stopped.
#[derive(Clone, Debug, Default)]
pub enum AnimationState {
    #[default]
    Stopped,
    Playing {
        clip: Arc<AnimationClip>,
        elapsed: f32,
    },
}

impl AnimationState {
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self, Self::Playing { .. })
    }

    #[must_use]
    pub fn clip_name(&self) -> Option<&str> {
        match self {
            Self::Stopped => None,
            Self::Playing { clip, .. } => Some(&clip.name),
        }
    }

    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        match self {
            Self::Stopped => 0.0,
            Self::Playing { elapsed, .. } => *elapsed,
        }
    }
}

/// Owns the playback state of every animated object. Objects hold an
/// `InstanceId`; clips are shared read only through `Arc`.
#[derive(Default)]
pub struct Animator {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    state: Option<AnimationState>,
}

impl Animator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_instance(&mut self) -> InstanceId {
        let index = self.free.pop().unwrap_or_else(|| {
            self.slots.push(Slot::default());
            self.slots.len() - 1
        });
        let slot = &mut self.slots[index];
        slot.state = Some(AnimationState::Stopped);
        InstanceId {
            index,
            generation: slot.generation,
        }
    }

    /// Frees the slot for reuse. Releasing an id twice, or an id from an
    /// earlier generation, does nothing.
    pub fn release_instance(&mut self, id: InstanceId) {
        let Some(slot) = self.slots.get_mut(id.index) else {
            return;
        };
        if slot.generation == id.generation && slot.state.take().is_some() {
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            debug!("Released animation instance {}", id);
        }
    }

    /// Starts a clip from the beginning. Anything already playing on the
    /// instance is stopped first.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn start(
        &mut self,
        id: InstanceId,
        clip: Arc<AnimationClip>,
    ) -> Result<(), UmError> {
        let slot = self.slot_mut(id)?;
        debug!("Instance {} starting '{}'", id, clip.name);
        *slot = AnimationState::Playing { clip, elapsed: 0.0 };
        Ok(())
    }

    /// Stops playback and zeroes the clock. Stopping a stopped instance does
    /// nothing.
    pub fn stop(&mut self, id: InstanceId) {
        match self.slot_mut(id) {
            Ok(slot) => *slot = AnimationState::Stopped,
            Err(e) => warn!("{e}"),
        }
    }

    /// Advances every playing instance
    pub fn update(&mut self, dt: f32) {
        for slot in &mut self.slots {
            if let Some(AnimationState::Playing { elapsed, .. }) =
                &mut slot.state
            {
                *elapsed += dt;
            }
        }
    }

    #[must_use]
    pub fn state(&self, id: InstanceId) -> Option<&AnimationState> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.state.as_ref())
    }

    /// Bone palette for a mesh of the instance's model. Stopped or unknown
    /// instances get the identity palette.
    #[must_use]
    pub fn palette_for(
        &self,
        id: InstanceId,
        skeleton: &Skeleton,
    ) -> Vec<glm::Mat4> {
        match self.state(id) {
            Some(AnimationState::Playing { clip, elapsed }) => {
                util::evaluate(skeleton, clip, *elapsed)
            }
            _ => util::identity_palette(),
        }
    }

    /// Number of live instances
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.state.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot_mut(
        &mut self,
        id: InstanceId,
    ) -> Result<&mut AnimationState, UmError> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.state.as_mut())
            .ok_or_else(|| {
                UmError::invalid_state(
                    format!("animation instance {id} was released"),
                    "Animator",
                )
            })
    }
}
