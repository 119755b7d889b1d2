use super::{material::Material, mesh::Mesh};
use crate::{
    animation::{
        identity_palette, AnimationClip, ClipCache, NodeTree, Skeleton,
    },
    mesh_import::{self, ImportedScene},
    renderer::{RenderBackend, Renderer},
    types::MAX_BONES,
    um_error::UmError,
};
use ahash::AHashMap;
use log::info;
use std::{path::Path, sync::Arc};

/// Meshes and animations loaded from one asset. Models are shared between
/// every object that uses them; per object playback state lives in the
/// `Animator`.
#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub nodes: Arc<NodeTree>,
    animations: AHashMap<String, Arc<AnimationClip>>,
}

impl Model {
    /// Imports an asset file and uploads its meshes
    ///
    /// # Errors
    /// May return `UmError`
    pub fn load<B: RenderBackend + ?Sized>(
        path: &Path,
        backend: &mut B,
    ) -> Result<Self, UmError> {
        let scene = mesh_import::load_scene(path)?;
        let name = path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
        Self::from_scene(name, scene, backend)
    }

    /// Uploads an imported scene. Materials are resolved first, then each
    /// mesh gets its material and a skeleton over the shared node tree.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn from_scene<B: RenderBackend + ?Sized>(
        name: impl Into<String>,
        scene: ImportedScene,
        backend: &mut B,
    ) -> Result<Self, UmError> {
        let name = name.into();
        let materials: Vec<Option<Material>> =
            scene.materials.iter().map(Material::from_import).collect();
        let nodes = Arc::new(scene.nodes);
        let mut meshes = Vec::with_capacity(scene.meshes.len());
        for m in scene.meshes {
            if m.bones.len() > MAX_BONES {
                return Err(UmError::resource(
                    format!(
                        "mesh '{}' of '{}' has {} bones, limit is {}",
                        m.name,
                        name,
                        m.bones.len(),
                        MAX_BONES
                    ),
                    "Model::from_scene",
                ));
            }
            let handle = backend.create_mesh(&m.vertices, &m.indices)?;
            let material = m
                .material
                .and_then(|i| materials.get(i).cloned().flatten());
            meshes.push(Mesh {
                name: m.name,
                handle,
                material,
                skeleton: Skeleton::new(nodes.clone(), m.bones),
            });
        }
        info!("Model '{}' loaded with {} meshes", name, meshes.len());
        Ok(Self {
            name,
            meshes,
            nodes,
            animations: AHashMap::new(),
        })
    }

    /// Registers clip number `index` of an asset file under `name`. The
    /// file is imported once and shared through the cache.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn load_animation(
        &mut self,
        cache: &ClipCache,
        name: &str,
        path: &Path,
        index: usize,
    ) -> Result<(), UmError> {
        let clip = cache.load(path, index)?;
        self.add_animation(name, clip);
        Ok(())
    }

    pub fn add_animation(&mut self, name: &str, clip: Arc<AnimationClip>) {
        self.animations.insert(name.to_string(), clip);
    }

    #[must_use]
    pub fn animation(&self, name: &str) -> Option<Arc<AnimationClip>> {
        self.animations.get(name).cloned()
    }

    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.animations.keys().map(String::as_str)
    }

    /// Draws in bind pose
    ///
    /// # Errors
    /// May return `UmError`
    pub fn draw<B: RenderBackend>(
        &self,
        renderer: &mut Renderer<B>,
    ) -> Result<(), UmError> {
        let palette = identity_palette();
        for mesh in &self.meshes {
            renderer.draw_mesh(mesh, &palette)?;
        }
        Ok(())
    }
}
