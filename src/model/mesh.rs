use super::material::Material;
use crate::{animation::Skeleton, types::MeshHandle};

/// Uploaded geometry with what the geometry pass needs to draw it. The
/// skeleton holds this mesh's bone table over the node tree shared by the
/// whole model.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub handle: MeshHandle,
    pub material: Option<Material>,
    pub skeleton: Skeleton,
}

impl Mesh {
    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.skeleton.bone_count()
    }
}
