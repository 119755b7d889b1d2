use super::types::{AnimationClip, NodeChannel, QuatKey, Skeleton, VectorKey};
use crate::types::MAX_BONES;
use log::debug;
use nalgebra_glm as glm;

/// Helper to calculate the parameter used for interpolation
fn weight(start: f32, end: f32, current: f32) -> f32 {
    const EPSILON: f32 = 0.0005;
    ((current - start) / (end - start).max(EPSILON)).clamp(0.0f32, 1.0f32)
}

/// Finds the pair of keys around `time` and the blend factor between them.
/// The first key whose time exceeds `time` ends the bracket. Times before
/// the first key or at or after the last key clamp to that key.
fn bracket(times: impl ExactSizeIterator<Item = f32>, time: f32) -> Bracket {
    let count = times.len();
    let mut previous: Option<(usize, f32)> = None;
    for (i, t) in times.enumerate() {
        if time < t {
            return previous.map_or(Bracket::Exact(i), |(p, pt)| {
                Bracket::Between(p, i, weight(pt, t, time))
            });
        }
        previous = Some((i, t));
    }
    // Fall through past the end of the channel
    Bracket::Exact(count.saturating_sub(1))
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Bracket {
    Exact(usize),
    Between(usize, usize, f32),
}

fn interpolate_vector(keys: &[VectorKey], time: f32) -> Option<glm::Vec3> {
    if keys.len() == 1 {
        return Some(keys[0].value);
    }
    match bracket(keys.iter().map(|k| k.time), time) {
        Bracket::Exact(i) => keys.get(i).map(|k| k.value),
        Bracket::Between(_, b, f) if f >= 1.0 => Some(keys[b].value),
        Bracket::Between(a, b, f) => {
            Some(glm::lerp(&keys[a].value, &keys[b].value, f))
        }
    }
}

fn interpolate_rotation(keys: &[QuatKey], time: f32) -> Option<glm::Quat> {
    if keys.len() == 1 {
        return Some(keys[0].value);
    }
    match bracket(keys.iter().map(|k| k.time), time) {
        Bracket::Exact(i) => keys.get(i).map(|k| k.value),
        // Exact key values at the ends of a bracket avoid slerp drift
        Bracket::Between(a, _, f) if f <= 0.0 => Some(keys[a].value),
        Bracket::Between(_, b, f) if f >= 1.0 => Some(keys[b].value),
        Bracket::Between(a, b, f) => {
            let q = glm::quat_slerp(&keys[a].value, &keys[b].value, f);
            Some(glm::quat_normalize(&q))
        }
    }
}

/// Local transform for an animated node, composed as T * R * S. Missing key
/// kinds fall back to the matching part of nothing: zero translation, no
/// rotation, unit scale.
fn channel_transform(channel: &NodeChannel, time: f32) -> glm::Mat4 {
    let translation = interpolate_vector(&channel.positions, time)
        .unwrap_or_else(glm::Vec3::zeros);
    let rotation = interpolate_rotation(&channel.rotations, time)
        .unwrap_or_else(glm::Quat::identity);
    let scaling = interpolate_vector(&channel.scalings, time)
        .unwrap_or_else(|| glm::vec3(1.0, 1.0, 1.0));
    glm::translation(&translation)
        * glm::quat_to_mat4(&rotation)
        * glm::scaling(&scaling)
}

// Call with the root node to recursively accumulate global transforms and
// write the final transform of every node that is a bone
fn traverse(
    skeleton: &Skeleton,
    clip: &AnimationClip,
    node_index: usize,
    parent: &glm::Mat4,
    output: &mut [glm::Mat4],
    time: f32,
) {
    let Some(node) = skeleton.nodes.nodes.get(node_index) else {
        debug!("node_index={} not in tree", node_index);
        return;
    };

    let local = clip
        .channels
        .get(&node.name)
        .map_or(node.transform, |channel| channel_transform(channel, time));
    let global = parent * local;

    if let Some(bone) = skeleton.bones.get(&node.name) {
        if let Some(out) = output.get_mut(bone.index) {
            *out = skeleton.global_inverse * global * bone.offset;
        }
    }

    for child in &node.children {
        traverse(skeleton, clip, *child, &global, output, time);
    }
}

/// Returns the bone palette for a clip at an elapsed time in seconds. The
/// result is indexed by bone index and has one entry per bone in the
/// skeleton. Bones that no node reaches stay at identity.
#[must_use]
pub fn evaluate(
    skeleton: &Skeleton,
    clip: &AnimationClip,
    time_sec: f32,
) -> Vec<glm::Mat4> {
    let time = clip.animation_time(time_sec);
    let mut output = vec![glm::Mat4::identity(); skeleton.bone_count()];
    traverse(
        skeleton,
        clip,
        skeleton.nodes.root,
        &glm::Mat4::identity(),
        &mut output,
        time,
    );
    output
}

/// Palette used when nothing is playing
#[must_use]
pub fn identity_palette() -> Vec<glm::Mat4> {
    vec![glm::Mat4::identity(); MAX_BONES]
}
