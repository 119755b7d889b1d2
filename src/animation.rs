mod cache;
mod manager;
mod types;
mod util;

// Re-exports
pub use {
    cache::ClipCache,
    manager::{AnimationState, Animator, InstanceId},
    types::{
        AnimationClip, Bone, BoneMapping, Node, NodeChannel, NodeTree,
        QuatKey, Skeleton, VectorKey,
    },
    util::{evaluate, identity_palette},
};
