mod backend;
mod frame_control;
mod memory;
mod pipelines;
mod targets;
mod util;
mod validation;
mod window;

// Re-exports
pub use {
    backend::VkBackend,
    targets::TargetFormats,
    window::{VkWindow, WindowProperties},
};
