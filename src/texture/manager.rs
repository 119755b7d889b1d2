use super::import::{self, TextureData, TextureFormat};
use crate::{renderer::RenderBackend, types::TextureId, um_error::UmError};
use ahash::AHashMap;
use log::info;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Directory that texture names are resolved against
pub const TEXTURE_DIR: &str = "resources/textures/";

/// Name under which the 1x1 white texture is cached
pub const WHITE: &str = "<white>";

/// Value of a normal map texel that leaves the surface normal unchanged
pub const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];

/// Texture cache keyed by file name. Textures are decoded and uploaded the
/// first time they are bound and shared after that.
///
/// The cache is wrapped in a `parking_lot::Mutex` so the manager can be
/// shared, though the renderer only uses it from one thread.
pub struct Manager {
    base: PathBuf,
    cache: Mutex<AHashMap<String, TextureId>>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new(TEXTURE_DIR)
    }
}

impl Manager {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            // Reserve space to perhaps avoid some realloc/rehash.
            cache: Mutex::new(AHashMap::with_capacity(16)),
        }
    }

    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns the texture for a file name, loading it on a miss. The
    /// format only matters for the first load of a name.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn load<B: RenderBackend + ?Sized>(
        &self,
        name: &str,
        format: TextureFormat,
        backend: &mut B,
    ) -> Result<TextureId, UmError> {
        let mut cache = self.cache.lock();
        if let Some(id) = cache.get(name) {
            info!("Texture cache hit: {}", name);
            Ok(*id)
        } else {
            info!("Texture cache miss: {}", name);
            let data = import::load(&self.base.join(name), format)?;
            let id = backend.create_texture(&data)?;
            cache.insert(name.to_string(), id);
            drop(cache);
            Ok(id)
        }
    }

    /// Uploads and caches texture data that did not come from a file
    ///
    /// # Errors
    /// May return `UmError`
    pub fn insert<B: RenderBackend + ?Sized>(
        &self,
        name: &str,
        data: &TextureData,
        backend: &mut B,
    ) -> Result<TextureId, UmError> {
        let id = backend.create_texture(data)?;
        self.cache.lock().insert(name.to_string(), id);
        Ok(id)
    }

    /// Cached texture without loading
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TextureId> {
        self.cache.lock().get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Caches the textures every material can fall back on: plain white
    /// and the flat normal map
    ///
    /// # Errors
    /// May return `UmError`
    pub fn load_builtins<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
    ) -> Result<(TextureId, TextureId), UmError> {
        let white = self.insert(
            WHITE,
            &TextureData::solid([255; 4], TextureFormat::Rgba8Srgb),
            backend,
        )?;
        let flat = self.insert(
            crate::model::FLAT_NORMAL_MAP,
            &TextureData::solid(FLAT_NORMAL, TextureFormat::Rgba8Unorm),
            backend,
        )?;
        Ok((white, flat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{renderer::RecordingBackend, um_error::ErrorKind};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("umbra_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn second_load_is_a_cache_hit() {
        let dir = scratch_dir("texture_cache");
        image::RgbaImage::from_pixel(2, 2, image::Rgba([9, 8, 7, 255]))
            .save(dir.join("stone.png"))
            .unwrap();
        let manager = Manager::new(&dir);
        let mut backend = RecordingBackend::new([64, 64]);
        let a = manager
            .load("stone.png", TextureFormat::Rgba8Srgb, &mut backend)
            .unwrap();
        let b = manager
            .load("stone.png", TextureFormat::Rgba8Srgb, &mut backend)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(backend.textures().len(), 1);
        assert_eq!(backend.textures()[0].pixels[..4], [9, 8, 7, 255]);
    }

    #[test]
    fn missing_texture_is_not_cached() {
        let manager = Manager::new(scratch_dir("texture_missing"));
        let mut backend = RecordingBackend::new([64, 64]);
        let e = manager
            .load("absent.png", TextureFormat::Rgba8Srgb, &mut backend)
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::FileNotFound);
        assert!(manager.is_empty());
    }

    #[test]
    fn builtins_are_cached_by_name() {
        let manager = Manager::default();
        let mut backend = RecordingBackend::new([64, 64]);
        let (white, flat) = manager.load_builtins(&mut backend).unwrap();
        assert_eq!(manager.get(WHITE), Some(white));
        assert_eq!(manager.get(crate::model::FLAT_NORMAL_MAP), Some(flat));
        assert_eq!(backend.textures()[1].pixels, FLAT_NORMAL.to_vec());
    }
}
