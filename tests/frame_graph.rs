//! Tests for the frame graph, run against the recording backend so no GPU
//! is needed. Each test builds a renderer, queues a scene and checks the
//! stream of backend calls one frame produced.

use log::info;
use nalgebra_glm as glm;
use std::sync::{Arc, Once};
use umbra::{
    animation::{
        AnimationClip, Animator, Bone, BoneMapping, Node, NodeChannel,
        NodeTree, VectorKey,
    },
    billboard::Billboard,
    camera::CameraSnapshot,
    lights::Light,
    mesh_import::{ImportedMesh, ImportedScene},
    model::{AnimatedModel, Model},
    render_queue::{Overlay, Placement, Renderable},
    renderer::{Event, Geometry, Pass, RecordingBackend, Renderer},
    shader::{
        uniforms::{U_BONES, U_LIGHT_COUNT, U_SHADOW_ENABLED},
        ProgramId,
    },
    text_overlay::{GlyphAtlas, GuiElement, TextOverlay},
    texture::{TextureData, TextureFormat, TextureManager},
    types::{TextureId, BLOOM_ITERATIONS},
    um_error::ErrorKind,
    vertex::Vertex,
    world::TileGrid,
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

fn renderer() -> Renderer<RecordingBackend> {
    Renderer::new(
        RecordingBackend::new([800, 600]),
        TextureManager::new("no/such/dir"),
    )
    .unwrap()
}

/// One triangle skinned to a single bone called "arm" under "root"
fn scene() -> ImportedScene {
    let mut bones = BoneMapping::default();
    bones.insert(
        "arm".to_string(),
        Bone {
            index: 0,
            offset: glm::Mat4::identity(),
        },
    );
    ImportedScene {
        nodes: NodeTree {
            nodes: vec![
                Node {
                    name: "root".to_string(),
                    transform: glm::Mat4::identity(),
                    children: vec![1],
                },
                Node {
                    name: "arm".to_string(),
                    transform: glm::Mat4::identity(),
                    children: Vec::new(),
                },
            ],
            root: 0,
        },
        meshes: vec![ImportedMesh {
            name: "body".to_string(),
            vertices: vec![Vertex::default(); 3],
            indices: vec![0, 1, 2],
            material: None,
            bones,
        }],
        materials: Vec::new(),
        clip_count: 0,
    }
}

fn model(renderer: &mut Renderer<RecordingBackend>) -> Arc<Model> {
    Arc::new(
        Model::from_scene("dummy", scene(), renderer.backend_mut()).unwrap(),
    )
}

/// Moves "arm" from the origin to x = 2 over two seconds
fn slide_clip() -> Arc<AnimationClip> {
    let mut channels = ahash::HashMap::default();
    channels.insert(
        "arm".to_string(),
        NodeChannel {
            positions: vec![
                VectorKey {
                    time: 0.0,
                    value: glm::vec3(0.0, 0.0, 0.0),
                },
                VectorKey {
                    time: 2.0,
                    value: glm::vec3(2.0, 0.0, 0.0),
                },
            ],
            ..NodeChannel::default()
        },
    );
    Arc::new(AnimationClip {
        name: "Slide".to_string(),
        ticks_per_second: 1.0,
        duration: 4.0,
        channels,
    })
}

fn read_f32(block: &[u8], offset: usize) -> f32 {
    let bytes: [u8; 4] = block[offset..offset + 4].try_into().unwrap();
    f32::from_le_bytes(bytes)
}

fn frame(
    renderer: &mut Renderer<RecordingBackend>,
    animator: &Animator,
    submit: impl FnOnce(&mut Renderer<RecordingBackend>),
) -> Vec<Event> {
    renderer.begin_frame();
    renderer.update_camera(CameraSnapshot::default());
    submit(renderer);
    renderer.end_frame(animator).unwrap();
    renderer.backend_mut().take_events()
}

fn passes(events: &[Event]) -> Vec<Pass> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::BeginPass(p) => Some(*p),
            _ => None,
        })
        .collect()
}

fn read_i32(block: &[u8], offset: usize) -> i32 {
    let bytes: [u8; 4] = block[offset..offset + 4].try_into().unwrap();
    i32::from_le_bytes(bytes)
}

fn draws_in(events: &[Event], pass: Pass) -> Vec<&Event> {
    let mut current = None;
    let mut out = Vec::new();
    for e in events {
        match e {
            Event::BeginPass(p) => current = Some(*p),
            Event::EndPass => current = None,
            Event::Draw { .. } if current == Some(pass) => out.push(e),
            _ => {}
        }
    }
    out
}

/// Tests the pass order of an empty scene without lights
#[test]
fn empty_scene_without_lights() {
    init_tests();
    let mut r = renderer();
    let events = frame(&mut r, &Animator::new(), |_| {});

    let mut expected = vec![
        Pass::Geometry,
        Pass::Ssao,
        Pass::SsaoBlur,
        Pass::Lighting,
        Pass::Forward,
    ];
    expected.extend((0..BLOOM_ITERATIONS).map(|i| Pass::Blur(1 - i % 2)));
    expected.extend([Pass::Composite, Pass::Overlay]);
    assert_eq!(passes(&events), expected);

    assert_eq!(events.first(), Some(&Event::BeginFrame));
    assert_eq!(events.last(), Some(&Event::EndFrame));
    assert!(draws_in(&events, Pass::Geometry).is_empty());
    assert!(draws_in(&events, Pass::Forward).is_empty());

    // Depth is copied after lighting and before the forward pass
    let copy = events.iter().position(|e| *e == Event::CopyDepth).unwrap();
    assert_eq!(events[copy - 1], Event::EndPass);
    assert_eq!(events[copy + 1], Event::BeginPass(Pass::Forward));
}

/// Tests that one opaque model and one billboard split between the passes
#[test]
fn opaque_and_billboard() {
    init_tests();
    let mut r = renderer();
    let dummy = model(&mut r);
    let flame =
        TextureData::solid([255, 128, 0, 255], TextureFormat::Rgba8Srgb);
    r.insert_texture("flame.png", &flame).unwrap();
    let white = glm::vec3(1.0, 1.0, 1.0);
    r.add_light(Light::new(glm::vec3(0.0, 2.0, 0.0), white)).unwrap();

    let events = frame(&mut r, &Animator::new(), |r| {
        r.enqueue_renderable(Renderable::fixed(
            dummy,
            Placement::at(glm::vec3(0.0, 0.0, -3.0)),
        ));
        r.enqueue_renderable(Renderable::Billboard(Billboard::new(
            glm::vec3(1.0, 1.0, -3.0),
            "flame.png",
        )));
        assert_eq!(r.render_queue().len(), 2);
    });
    info!("{} events recorded", events.len());

    assert_eq!(passes(&events)[0], Pass::Shadow);
    let shadow = draws_in(&events, Pass::Shadow);
    assert_eq!(shadow.len(), 1);
    assert!(matches!(
        shadow[0],
        Event::Draw {
            program: ProgramId::DepthMap,
            ..
        }
    ));

    let geometry = draws_in(&events, Pass::Geometry);
    assert_eq!(geometry.len(), 1);
    assert!(matches!(
        geometry[0],
        Event::Draw {
            program: ProgramId::GeometryPass,
            geometry: Geometry::Mesh(_),
            ..
        }
    ));

    let forward = draws_in(&events, Pass::Forward);
    assert_eq!(forward.len(), 1);
    let Event::Draw {
        program, geometry, ..
    } = forward[0]
    else {
        panic!("not a draw");
    };
    assert_eq!(*program, ProgramId::Billboard);
    assert_eq!(*geometry, Geometry::Point([1.0, 1.0, -3.0]));

    // Queues only live for one frame
    assert!(r.render_queue().is_empty());
    assert!(r.overlay_queue().is_empty());
}

/// Tests that an out of date swapchain skips the frame without an error
#[test]
fn out_of_date_frame_is_skipped() {
    init_tests();
    let mut r = renderer();
    let dummy = model(&mut r);
    r.backend_mut().set_out_of_date(true);
    let events = frame(&mut r, &Animator::new(), |r| {
        r.enqueue_renderable(Renderable::fixed(
            dummy,
            Placement::at(glm::Vec3::zeros()),
        ));
    });
    assert!(events.is_empty());
    assert!(r.render_queue().is_empty());
    assert_eq!(r.current_pass(), None);

    // The next frame draws normally
    r.backend_mut().set_out_of_date(false);
    let events = frame(&mut r, &Animator::new(), |_| {});
    assert_eq!(events.last(), Some(&Event::EndFrame));
}

/// Tests that the bone palette of a playing clip reaches the geometry pass
#[test]
fn animated_palette_is_uploaded() {
    init_tests();
    let mut r = renderer();
    let mut animator = Animator::new();
    let mut dummy =
        Model::from_scene("dummy", scene(), r.backend_mut()).unwrap();
    dummy.add_animation("slide", slide_clip());
    let dummy = AnimatedModel::new(Arc::new(dummy), &mut animator);
    dummy.start_animation(&mut animator, "slide").unwrap();
    animator.update(1.0);

    let events = frame(&mut r, &animator, |r| {
        r.enqueue_renderable(Renderable::animated(
            dummy.clone(),
            Placement::at(glm::Vec3::zeros()),
        ));
    });

    let offset = r
        .program(ProgramId::GeometryPass)
        .table()
        .uniform(U_BONES)
        .unwrap()
        .offset;
    let geometry = draws_in(&events, Pass::Geometry);
    let Event::Draw { uniforms, .. } = geometry[0] else {
        panic!("not a draw");
    };
    // Column major, so the translation of bone 0 starts at element 12
    let x = read_f32(uniforms, offset + 12 * 4);
    assert!((x - 1.0).abs() < EPSILON);

    // Stopping returns the mesh to the bind pose
    dummy.stop_animation(&mut animator);
    let events = frame(&mut r, &animator, |r| {
        r.enqueue_renderable(Renderable::animated(
            dummy,
            Placement::at(glm::Vec3::zeros()),
        ));
    });
    let geometry = draws_in(&events, Pass::Geometry);
    let Event::Draw { uniforms, .. } = geometry[0] else {
        panic!("not a draw");
    };
    assert!(read_f32(uniforms, offset + 12 * 4).abs() < EPSILON);
}

/// Tests that overlays and the minimap draw in the overlay pass only
#[test]
fn overlays_and_minimap() {
    init_tests();
    let mut r = renderer();
    let metrics = r"
glyphs:
  - char: 'A'
    size: [10, 12]
    bearing: [1, 12]
    advance: 768
    uv: [0.0, 0.0, 0.5, 0.5]
";
    r.set_font(GlyphAtlas::from_metrics(metrics, TextureId(0)).unwrap());
    r.set_minimap(Arc::new(TileGrid::parse("###\n#P#\n###\n").unwrap()));
    r.toggle_minimap(true);

    let events = frame(&mut r, &Animator::new(), |r| {
        r.enqueue_overlay(Overlay::Text(TextOverlay::new("AA", 10.0, 20.0)));
        r.enqueue_overlay(Overlay::Gui(GuiElement::panel(
            0.0,
            100.0,
            50.0,
            20.0,
            [0.0, 0.0, 0.0, 0.5],
        )));
    });

    let programs: Vec<ProgramId> = draws_in(&events, Pass::Overlay)
        .into_iter()
        .filter_map(|e| match e {
            Event::Draw { program, .. } => Some(*program),
            _ => None,
        })
        .collect();
    assert_eq!(
        programs,
        [ProgramId::TextOverlay, ProgramId::Gui, ProgramId::Minimap]
    );
    let Event::Draw { geometry, .. } = draws_in(&events, Pass::Overlay)[0]
    else {
        panic!("not a draw");
    };
    // Two glyphs, two triangles each
    assert!(matches!(geometry, Geometry::Quads(v) if v.len() == 12));

    r.toggle_minimap(false);
    let events = frame(&mut r, &Animator::new(), |_| {});
    assert!(draws_in(&events, Pass::Overlay).is_empty());
}

/// Tests that text without a font fails the frame but leaves the renderer
/// usable
#[test]
fn text_without_font_is_invalid_state() {
    init_tests();
    let mut r = renderer();
    r.begin_frame();
    r.enqueue_overlay(Overlay::Text(TextOverlay::new("hi", 0.0, 0.0)));
    let e = r.end_frame(&Animator::new()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidState);
    assert!(r.overlay_queue().is_empty());
    assert_eq!(r.current_pass(), None);
}

/// Tests that a mesh queued outside the deferred passes is not drawn there
#[test]
fn mesh_outside_a_pass_is_skipped() {
    init_tests();
    let mut r = renderer();
    let dummy = model(&mut r);
    let palette = umbra::animation::identity_palette();
    r.draw_mesh(&dummy.meshes[0], &palette).unwrap();
    assert!(r.backend().events().is_empty());
}

/// Tests that starting a frame drops whatever an abandoned frame queued
#[test]
fn begin_frame_discards_queued_items() {
    init_tests();
    let mut r = renderer();
    let dummy = model(&mut r);
    r.begin_frame();
    r.enqueue_renderable(Renderable::fixed(
        dummy,
        Placement::at(glm::Vec3::zeros()),
    ));
    r.enqueue_overlay(Overlay::Gui(GuiElement::panel(
        0.0,
        0.0,
        10.0,
        10.0,
        [1.0, 1.0, 1.0, 1.0],
    )));
    assert_eq!(r.render_queue().len(), 1);
    assert_eq!(r.overlay_queue().len(), 1);

    // No end_frame in between
    r.begin_frame();
    assert!(r.render_queue().is_empty());
    assert!(r.overlay_queue().is_empty());
    assert!(r.backend().events().is_empty());
}

/// Tests that removing every light uploads a light count of zero and turns
/// the shadow term off
#[test]
fn lighting_without_lights_uploads_zero_count() {
    init_tests();
    let mut r = renderer();
    let table = r.program(ProgramId::LightingPass).table();
    let count = table.uniform(U_LIGHT_COUNT).unwrap().offset;
    let shadow = table.uniform(U_SHADOW_ENABLED).unwrap().offset;
    let lighting_block = |events: &[Event]| {
        let draws = draws_in(events, Pass::Lighting);
        assert_eq!(draws.len(), 1);
        let Event::Draw { uniforms, .. } = draws[0] else {
            panic!("not a draw");
        };
        uniforms.clone()
    };

    let white = glm::vec3(1.0, 1.0, 1.0);
    r.add_light(Light::new(glm::vec3(0.0, 2.0, 0.0), white)).unwrap();
    r.add_light(Light::new(glm::vec3(4.0, 2.0, 0.0), white)).unwrap();
    let block = lighting_block(&frame(&mut r, &Animator::new(), |_| {}));
    assert_eq!(read_i32(&block, count), 2);
    assert_eq!(read_i32(&block, shadow), 1);

    r.clear_lights();
    let block = lighting_block(&frame(&mut r, &Animator::new(), |_| {}));
    assert_eq!(read_i32(&block, count), 0);
    assert_eq!(read_i32(&block, shadow), 0);
}
