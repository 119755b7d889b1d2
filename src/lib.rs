//! Deferred Vulkan renderer for a dungeon crawler with skeletal animation.
//!
//! The frame graph in `renderer` is written against the `RenderBackend`
//! trait. `vk::VkBackend` drives a real GPU through vulkano and
//! `renderer::RecordingBackend` records the call stream for tests.
pub mod animation;
pub mod billboard;
pub mod camera;
pub mod config;
pub mod engine;
pub mod keyboard;
pub mod lights;
pub mod mesh_import;
pub mod model;
pub mod render_queue;
pub mod renderer;
pub mod shader;
pub mod text_overlay;
pub mod texture;
pub mod types;
pub mod um_error;
pub mod vertex;
pub mod vk;
pub mod world;
