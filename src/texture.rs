mod import;
mod manager;

// Re-exports
pub use import::{from_bytes, load, TextureData, TextureFormat};
#[allow(clippy::module_name_repetitions)]
pub use manager::{Manager as TextureManager, FLAT_NORMAL, TEXTURE_DIR, WHITE};
