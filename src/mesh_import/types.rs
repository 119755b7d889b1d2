use crate::{animation::BoneMapping, animation::NodeTree, vertex::Vertex};

/// Material as named by the asset. Overrides and defaults are applied when
/// it becomes a `model::Material`.
#[derive(Clone, Debug, Default)]
pub struct ImportedMaterial {
    pub name: String,
    /// File name of the diffuse texture with any directory stripped
    pub diffuse: Option<String>,
}

/// One drawable piece of an asset. Each glTF primitive becomes one of
/// these, the same way each material group of a mesh becomes one.
#[derive(Clone, Debug, Default)]
pub struct ImportedMesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Index into `ImportedScene::materials`
    pub material: Option<usize>,
    pub bones: BoneMapping,
}

#[derive(Clone, Debug)]
pub struct ImportedScene {
    pub nodes: NodeTree,
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
    pub clip_count: usize,
}

/// Errors specific to importing data. `UmError` has a `From` trait to
/// handle these.
#[derive(Debug)]
pub enum ImportError {
    NoTriangles,
    NoPositions,
    CountMismatch,
    TooManyBones(usize),
    NoSampler,
    Morphing,
    NoScene,
    IndexOutOfRange(u32),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::NoTriangles => {
                write!(f, "only triangulated meshes are supported")
            }
            Self::NoPositions => {
                write!(f, "vertex positions are required")
            }
            Self::CountMismatch => {
                write!(f, "there is a mismatch in the count of vertices")
            }
            Self::TooManyBones(a) => {
                write!(
                    f,
                    "skin has {a} bones but at most {} are supported",
                    crate::types::MAX_BONES
                )
            }
            Self::NoSampler => {
                write!(f, "a sampler is required for animation")
            }
            Self::Morphing => {
                write!(f, "morphing animation is not supported")
            }
            Self::NoScene => write!(f, "file contains no nodes"),
            Self::IndexOutOfRange(a) => {
                write!(f, "vertex index {a} is out of range")
            }
        }
    }
}
