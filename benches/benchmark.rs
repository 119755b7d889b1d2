//! Recommend using with
//! `RUSTFLAGS="-C target-cpu=x86-64-v2" cargo bench`
//!
//! Covers the per frame CPU work: evaluating bone palettes for animated
//! characters and running the frame graph over a recording backend.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra_glm as glm;
use std::sync::Arc;
use umbra::{
    animation::{
        evaluate, AnimationClip, Animator, Bone, BoneMapping, Node,
        NodeChannel, NodeTree, QuatKey, Skeleton, VectorKey,
    },
    camera::CameraSnapshot,
    lights::Light,
    renderer::{RecordingBackend, Renderer},
    texture::TextureManager,
    types::MAX_BONES,
};

const KEYS: usize = 30;

/// A chain of `MAX_BONES` nodes, each one unit along Y from its parent
fn chain() -> Skeleton {
    let nodes = (0..MAX_BONES)
        .map(|i| Node {
            name: format!("bone{i}"),
            transform: glm::translation(&glm::vec3(0.0, 1.0, 0.0)),
            children: if i + 1 < MAX_BONES {
                vec![i + 1]
            } else {
                Vec::new()
            },
        })
        .collect();
    let mut bones = BoneMapping::default();
    for index in 0..MAX_BONES {
        bones.insert(
            format!("bone{index}"),
            Bone {
                index,
                offset: glm::Mat4::identity(),
            },
        );
    }
    Skeleton::new(Arc::new(NodeTree { nodes, root: 0 }), bones)
}

/// Every bone swings about Z with keys once per tick
#[allow(clippy::cast_precision_loss)]
fn swing() -> AnimationClip {
    let axis = glm::vec3(0.0, 0.0, 1.0);
    let channel = NodeChannel {
        positions: vec![VectorKey {
            time: 0.0,
            value: glm::vec3(0.0, 1.0, 0.0),
        }],
        rotations: (0..KEYS)
            .map(|k| QuatKey {
                time: k as f32,
                value: glm::quat_angle_axis((k as f32 * 0.3).sin(), &axis),
            })
            .collect(),
        scalings: Vec::new(),
    };
    let channels = (0..MAX_BONES)
        .map(|i| (format!("bone{i}"), channel.clone()))
        .collect();
    AnimationClip {
        name: "Swing".to_string(),
        ticks_per_second: 30.0,
        duration: (KEYS - 1) as f32,
        channels,
    }
}

fn evaluate_palette(c: &mut Criterion) {
    let skeleton = chain();
    let clip = swing();
    c.bench_function("evaluate_palette", |b| {
        b.iter(|| evaluate(&skeleton, &clip, black_box(0.517)));
    });
}

fn animator_update(c: &mut Criterion) {
    let clip = Arc::new(swing());
    let mut animator = Animator::new();
    for _ in 0..100 {
        let id = animator.create_instance();
        if animator.start(id, clip.clone()).is_err() {
            return;
        }
    }
    c.bench_function("animator_update_100", |b| {
        b.iter(|| animator.update(black_box(0.016)));
    });
}

fn empty_frame(c: &mut Criterion) {
    let Ok(mut renderer) = Renderer::new(
        RecordingBackend::new([1280, 720]),
        TextureManager::new("no/such/dir"),
    ) else {
        return;
    };
    let white = glm::vec3(1.0, 1.0, 1.0);
    if renderer
        .add_light(Light::new(glm::vec3(0.0, 2.0, 0.0), white))
        .is_err()
    {
        return;
    }
    let animator = Animator::new();
    c.bench_function("empty_frame", |b| {
        b.iter(|| {
            renderer.begin_frame();
            renderer.update_camera(CameraSnapshot::default());
            let result = renderer.end_frame(&animator);
            renderer.backend_mut().take_events();
            result
        });
    });
}

criterion_group!(benches, evaluate_palette, animator_update, empty_frame);
criterion_main!(benches);
