use crate::types::DEFAULT_TICKS_PER_SECOND;
use ahash::HashMap;
use nalgebra_glm as glm;
use std::sync::Arc;

/// A node of the scene hierarchy an asset was imported from. Nodes are
/// stored flat and refer to their children by index.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    /// Static bind transform relative to the parent
    pub transform: glm::Mat4,
    pub children: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct NodeTree {
    pub nodes: Vec<Node>,
    pub root: usize,
}

impl NodeTree {
    #[must_use]
    pub fn root_transform(&self) -> glm::Mat4 {
        self.nodes
            .get(self.root)
            .map_or_else(glm::Mat4::identity, |n| n.transform)
    }
}

/// Skinning data for one bone. `index` is the slot in the bone palette and
/// `offset` is the inverse bind pose.
#[derive(Clone, Copy, Debug)]
pub struct Bone {
    pub index: usize,
    pub offset: glm::Mat4,
}

/// Bone name to bone. Indices are dense and assigned at load time.
pub type BoneMapping = HashMap<String, Bone>;

/// Per-mesh view of the hierarchy. The node tree is shared by every mesh of
/// a model; the bone table and root inverse belong to the mesh.
#[derive(Clone, Debug)]
pub struct Skeleton {
    pub nodes: Arc<NodeTree>,
    pub bones: BoneMapping,
    pub global_inverse: glm::Mat4,
}

impl Skeleton {
    #[must_use]
    pub fn new(nodes: Arc<NodeTree>, bones: BoneMapping) -> Self {
        let global_inverse = glm::inverse(&nodes.root_transform());
        Self {
            nodes,
            bones,
            global_inverse,
        }
    }

    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct VectorKey {
    pub time: f32,
    pub value: glm::Vec3,
}

#[derive(Clone, Copy, Debug)]
pub struct QuatKey {
    pub time: f32,
    pub value: glm::Quat,
}

/// Keyframes for one node. Key times are in ticks and sorted.
#[derive(Clone, Debug, Default)]
pub struct NodeChannel {
    pub positions: Vec<VectorKey>,
    pub rotations: Vec<QuatKey>,
    pub scalings: Vec<VectorKey>,
}

/// Immutable keyframe data shared by every instance playing it
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    /// Zero means unspecified
    pub ticks_per_second: f32,
    /// Length in ticks
    pub duration: f32,
    /// Keyed by node name
    pub channels: HashMap<String, NodeChannel>,
}

impl AnimationClip {
    /// Ticks per second with the default substituted for zero
    #[must_use]
    pub fn tick_rate(&self) -> f32 {
        if self.ticks_per_second == 0.0 {
            DEFAULT_TICKS_PER_SECOND
        } else {
            self.ticks_per_second
        }
    }

    /// Converts elapsed seconds into a position in the clip, in ticks,
    /// wrapping so playback loops
    #[must_use]
    pub fn animation_time(&self, time_sec: f32) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (time_sec * self.tick_rate()).rem_euclid(self.duration)
    }

    /// Length of one loop in seconds
    #[must_use]
    pub fn period(&self) -> f32 {
        self.duration / self.tick_rate()
    }
}
