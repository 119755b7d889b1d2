use super::types::AnimationClip;
use crate::{mesh_import, um_error::UmError};
use ahash::AHashMap;
use log::info;
use parking_lot::Mutex;
use std::{path::Path, sync::Arc};

/// Clips decoded from one asset file, in file order
type ClipList = Arc<Vec<Arc<AnimationClip>>>;

/// Animation clips loaded once per asset path and shared by every model and
/// instance that uses them. The cache is owned by the engine context and is
/// dropped with it.
pub struct ClipCache {
    cache: Mutex<AHashMap<String, ClipList>>,
}

impl Default for ClipCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(AHashMap::with_capacity(8)),
        }
    }

    /// Returns clip number `index` from an asset file, importing the file
    /// on first use
    ///
    /// # Errors
    /// May return `UmError`
    pub fn load(
        &self,
        path: &Path,
        index: usize,
    ) -> Result<Arc<AnimationClip>, UmError> {
        let key = path.to_string_lossy().into_owned();
        let clips = {
            let mut cache = self.cache.lock();
            if let Some(clips) = cache.get(&key) {
                info!("Animation cache hit: {}", key);
                clips.clone()
            } else {
                info!("Animation cache miss: {}", key);
                let clips: ClipList = Arc::new(
                    mesh_import::load_clips(path)?
                        .into_iter()
                        .map(Arc::new)
                        .collect(),
                );
                cache.insert(key.clone(), clips.clone());
                drop(cache);
                clips
            }
        };
        clips.get(index).cloned().ok_or_else(|| {
            UmError::resource(
                format!(
                    "animation '{key}' contains wrong number of animation \
                     nodes"
                ),
                "ClipCache::load",
            )
        })
    }

    /// Adds clips that did not come from a file, such as generated ones
    pub fn insert(&self, key: &str, clips: Vec<AnimationClip>) {
        let list = Arc::new(clips.into_iter().map(Arc::new).collect());
        self.cache.lock().insert(key.to_string(), list);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::um_error::ErrorKind;

    fn clip(name: &str) -> AnimationClip {
        AnimationClip {
            name: name.to_string(),
            ticks_per_second: 0.0,
            duration: 1.0,
            channels: ahash::HashMap::default(),
        }
    }

    #[test]
    fn inserted_clips_are_shared() {
        let cache = ClipCache::new();
        cache.insert("walk.gltf", vec![clip("walk"), clip("run")]);
        let a = cache.load(Path::new("walk.gltf"), 1).unwrap();
        let b = cache.load(Path::new("walk.gltf"), 1).unwrap();
        assert_eq!(a.name, "run");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn index_past_end_is_resource_error() {
        let cache = ClipCache::new();
        cache.insert("walk.gltf", vec![clip("walk")]);
        let e = cache.load(Path::new("walk.gltf"), 1).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::ResourceError);
    }
}
