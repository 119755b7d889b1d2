//! Walk around a small torch lit dungeon using umbra
//!
//! Run with an optional glTF file to place an animated character in the
//! first room: `cargo run --example dungeon -- knight.glb`
use log::{error, info, warn};
use nalgebra_glm as glm;
use std::{path::Path, sync::Arc, time::Instant};
use umbra::{
    billboard::FlameParticle,
    camera::{Camera, DEFAULT_PITCH, DEFAULT_YAW, EYE_HEIGHT},
    config::Config,
    engine::Engine,
    keyboard::Keyboard,
    lights::Light,
    model::{AnimatedModel, Model},
    render_queue::{Overlay, Placement, Renderable},
    text_overlay::TextOverlay,
    types::{KeyboardHandler, TILE_SIZE},
    world::{TileCode, TileGrid, TileSource},
};
use winit::{
    event::{
        DeviceEvent, Event, KeyboardInput, VirtualKeyCode, WindowEvent,
    },
    event_loop::EventLoop,
};

const CONFIG_FILE: &str = "config.yaml";
const TORCH_COLOUR: [f32; 3] = [1.0, 0.55, 0.2];
const TORCH_HEIGHT: f32 = 2.0;
const MAP: &str = "\
###########
#*   #   *#
#    +    #
# P  #    #
###-####-##
  #,,,,,,#
  #*,,,,*#
  ########";

#[allow(clippy::cast_precision_loss)]
fn tile_centre(x: u32, y: u32, height: f32) -> glm::Vec3 {
    glm::vec3(
        (x as f32 + 0.5) * TILE_SIZE,
        height,
        (y as f32 + 0.5) * TILE_SIZE,
    )
}

/// Positions of every tile of one kind
fn find(grid: &TileGrid, code: TileCode) -> Vec<glm::Vec3> {
    let mut out = Vec::new();
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            if grid.tile_at(x, y) == code {
                out.push(tile_centre(x, y, 0.0));
            }
        }
    }
    out
}

fn main() {
    env_logger::init();

    let config = Config::load(Path::new(CONFIG_FILE)).unwrap_or_else(|e| {
        warn!("Using default config: {}", e);
        Config::default()
    });
    let event_loop = EventLoop::new();
    let mut engine = Engine::with_window(config, &event_loop).unwrap();

    let grid = Arc::new(TileGrid::parse(MAP).unwrap());
    engine.renderer_mut().set_minimap(grid.clone());
    for torch in find(&grid, TileCode::Torch) {
        let at = glm::vec3(torch.x, TORCH_HEIGHT, torch.z);
        engine
            .renderer_mut()
            .add_light(Light::new(at, glm::make_vec3(&TORCH_COLOUR)))
            .unwrap();
        engine.particles_mut().spawn(FlameParticle::new(at));
    }

    let start = find(&grid, TileCode::Player)
        .first()
        .map_or_else(glm::Vec3::zeros, |p| glm::vec3(p.x, EYE_HEIGHT, p.z));
    let mut camera = Camera::new(
        start,
        glm::vec3(0.0, 1.0, 0.0),
        DEFAULT_PITCH,
        DEFAULT_YAW,
    );

    // Optional animated character a few tiles in front of the player
    let mut character = std::env::args().nth(1).map(|file| {
        let path = Path::new(&file);
        let mut model =
            Model::load(path, engine.renderer_mut().backend_mut()).unwrap();
        if let Err(e) = model.load_animation(engine.clips(), "idle", path, 0) {
            warn!("No animation for {}: {}", file, e);
        }
        let character =
            AnimatedModel::new(Arc::new(model), engine.animator_mut());
        if let Err(e) = character.start_animation(engine.animator_mut(), "idle")
        {
            info!("Standing still: {}", e);
        }
        character
    });
    let character_at = start + glm::vec3(3.0 * TILE_SIZE, -EYE_HEIGHT, 0.0);

    let mut keyboard = Keyboard::new();
    let mut minimap = false;
    let mut last = Instant::now();
    event_loop.run(move |event, _, control_flow| {
        control_flow.set_poll();
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => control_flow.set_exit(),
                WindowEvent::Resized(size) => {
                    if let Err(e) = engine.resize([size.width, size.height]) {
                        error!("{}", e);
                    }
                }
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            virtual_keycode: Some(keycode),
                            state,
                            ..
                        },
                    ..
                } => keyboard.input(keycode, state),
                _ => (),
            },
            Event::LoopDestroyed => {
                if let Some(c) = character.take() {
                    c.release(engine.animator_mut());
                }
            }
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => {
                #[allow(clippy::cast_possible_truncation)]
                camera.process_mouse(delta.0 as f32, -delta.1 as f32, true);
            }
            Event::MainEventsCleared => {
                let now = Instant::now();
                let dt = (now - last).as_secs_f32();
                last = now;

                if keyboard.is_pressed(VirtualKeyCode::Escape) {
                    control_flow.set_exit();
                    return;
                }
                if keyboard.is_just_pressed(VirtualKeyCode::M) {
                    minimap = !minimap;
                    engine.renderer_mut().toggle_minimap(minimap);
                }
                if let Some(direction) = keyboard.direction() {
                    camera.process_keyboard(direction, dt);
                }
                keyboard.tick();

                let snapshot = camera.snapshot(engine.aspect_ratio());
                let fps = format!("{:.0} fps", 1.0 / dt.max(0.001));
                let result = engine.frame(dt, snapshot, |renderer, _| {
                    if let Some(c) = &character {
                        renderer.enqueue_renderable(Renderable::animated(
                            c.clone(),
                            Placement::at(character_at),
                        ));
                    }
                    if renderer.glyphs().is_some() {
                        renderer.enqueue_overlay(Overlay::Text(
                            TextOverlay::new(fps, 10.0, 10.0),
                        ));
                    }
                });
                if let Err(e) = result {
                    error!("{}", e);
                    control_flow.set_exit();
                }
            }
            _ => (),
        }
    });
}

