//! Tests for skeletal animation evaluation through the public API. The
//! skeletons are built by hand so that the expected bone transforms can be
//! worked out on paper.

use nalgebra_glm as glm;
use std::sync::{Arc, Once};
use umbra::{
    animation::{
        evaluate, AnimationClip, Animator, Bone, BoneMapping, ClipCache, Node,
        NodeChannel, NodeTree, QuatKey, Skeleton, VectorKey,
    },
    types::DEFAULT_TICKS_PER_SECOND,
};

const EPSILON: f32 = 0.0001f32; // Small value for float comparisons
static INIT: Once = Once::new();

/// Initializes logging in a "once per test run" manner. Call at the start of
/// each test that needs logging.
fn init_tests() {
    INIT.call_once(|| {
        env_logger::init();
    });
}

fn node(name: &str, transform: glm::Mat4, children: Vec<usize>) -> Node {
    Node {
        name: name.to_string(),
        transform,
        children,
    }
}

/// root -> hip -> hand, with the hand one unit along X from the hip
fn skeleton(root_transform: glm::Mat4) -> Skeleton {
    let tree = NodeTree {
        nodes: vec![
            node("root", root_transform, vec![1]),
            node("hip", glm::Mat4::identity(), vec![2]),
            node(
                "hand",
                glm::translation(&glm::vec3(1.0, 0.0, 0.0)),
                Vec::new(),
            ),
        ],
        root: 0,
    };
    let mut bones = BoneMapping::default();
    for (index, name) in ["hip", "hand"].iter().enumerate() {
        bones.insert(
            (*name).to_string(),
            Bone {
                index,
                offset: glm::Mat4::identity(),
            },
        );
    }
    Skeleton::new(Arc::new(tree), bones)
}

fn clip(
    ticks_per_second: f32,
    duration: f32,
    hip: NodeChannel,
) -> AnimationClip {
    let mut channels = ahash::HashMap::default();
    channels.insert("hip".to_string(), hip);
    AnimationClip {
        name: "Test".to_string(),
        ticks_per_second,
        duration,
        channels,
    }
}

fn translation_of(m: &glm::Mat4) -> glm::Vec3 {
    glm::vec3(m[(0, 3)], m[(1, 3)], m[(2, 3)])
}

fn compare(a: &glm::Vec3, b: &glm::Vec3) {
    assert!(glm::distance(a, b) < EPSILON, "{a:?} != {b:?}");
}

/// Tests that a parent rotation carries its children with it
#[test]
fn parent_rotation_moves_child() {
    init_tests();
    let turn = glm::quat_angle_axis(
        std::f32::consts::FRAC_PI_2,
        &glm::vec3(0.0, 1.0, 0.0),
    );
    let hip = NodeChannel {
        rotations: vec![QuatKey {
            time: 0.0,
            value: turn,
        }],
        ..NodeChannel::default()
    };
    let palette =
        evaluate(&skeleton(glm::Mat4::identity()), &clip(1.0, 1.0, hip), 0.3);
    assert_eq!(palette.len(), 2);
    compare(&translation_of(&palette[0]), &glm::Vec3::zeros());
    // +X turned a quarter about +Y is -Z
    compare(&translation_of(&palette[1]), &glm::vec3(0.0, 0.0, -1.0));
}

/// Tests that the root transform is cancelled by the global inverse
#[test]
fn root_transform_is_cancelled() {
    init_tests();
    let skeleton = skeleton(glm::translation(&glm::vec3(0.0, 5.0, 0.0)));
    let palette = evaluate(
        &skeleton,
        &clip(1.0, 1.0, NodeChannel::default()),
        0.0,
    );
    compare(&translation_of(&palette[1]), &glm::vec3(1.0, 0.0, 0.0));
}

/// Tests that playback loops over the clip duration
#[test]
fn playback_loops() {
    init_tests();
    let hip = NodeChannel {
        positions: vec![
            VectorKey {
                time: 0.0,
                value: glm::Vec3::zeros(),
            },
            VectorKey {
                time: 4.0,
                value: glm::vec3(4.0, 0.0, 0.0),
            },
        ],
        ..NodeChannel::default()
    };
    // Four ticks at two per second loop every two seconds
    let clip = clip(2.0, 4.0, hip);
    assert!((clip.period() - 2.0).abs() < EPSILON);
    let skeleton = skeleton(glm::Mat4::identity());
    let early = evaluate(&skeleton, &clip, 0.5);
    let late = evaluate(&skeleton, &clip, 2.5);
    compare(&translation_of(&early[0]), &glm::vec3(1.0, 0.0, 0.0));
    compare(&translation_of(&early[0]), &translation_of(&late[0]));
}

/// Tests that a clip without a tick rate plays at the default rate
#[test]
fn zero_tick_rate_uses_default() {
    let clip = clip(0.0, 100.0, NodeChannel::default());
    assert!((clip.tick_rate() - DEFAULT_TICKS_PER_SECOND).abs() < EPSILON);
    let t = clip.animation_time(1.0);
    assert!((t - DEFAULT_TICKS_PER_SECOND).abs() < EPSILON);
}

/// Tests that two instances sharing one clip keep separate clocks
#[test]
fn instances_share_clips_not_clocks() {
    init_tests();
    let cache = ClipCache::new();
    cache.insert("walk.glb", vec![clip(1.0, 10.0, NodeChannel::default())]);
    let walk = cache.load(std::path::Path::new("walk.glb"), 0).unwrap();

    let mut animator = Animator::new();
    let a = animator.create_instance();
    let b = animator.create_instance();
    animator.start(a, walk.clone()).unwrap();
    animator.update(1.0);
    animator.start(b, walk).unwrap();
    animator.update(0.5);

    let elapsed = |id| animator.state(id).unwrap().elapsed();
    assert!((elapsed(a) - 1.5).abs() < EPSILON);
    assert!((elapsed(b) - 0.5).abs() < EPSILON);
    assert_eq!(animator.len(), 2);
}

/// Tests that rotation halfway between two keys is the spherical midpoint
#[test]
fn rotation_between_keys_is_slerped() {
    init_tests();
    let up = glm::vec3(0.0, 1.0, 0.0);
    let hip = NodeChannel {
        rotations: vec![
            QuatKey {
                time: 0.0,
                value: glm::quat_identity(),
            },
            QuatKey {
                time: 1.0,
                value: glm::quat_angle_axis(std::f32::consts::FRAC_PI_2, &up),
            },
        ],
        ..NodeChannel::default()
    };
    let clip = clip(1.0, 1.0, hip);
    let skeleton = skeleton(glm::Mat4::identity());
    let palette = evaluate(&skeleton, &clip, 0.5);

    let expected = glm::quat_to_mat4(&glm::quat_angle_axis(
        std::f32::consts::FRAC_PI_4,
        &up,
    ));
    for (a, b) in palette[0].iter().zip(expected.iter()) {
        assert!((a - b).abs() < EPSILON, "{:?}", palette[0]);
    }
    let half = std::f32::consts::FRAC_1_SQRT_2;
    compare(&translation_of(&palette[1]), &glm::vec3(half, 0.0, -half));

    // One period later lands on the same pose
    let later = evaluate(&skeleton, &clip, 0.5 + clip.period());
    for (a, b) in palette.iter().zip(later.iter()) {
        assert!(a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < EPSILON));
    }
}
