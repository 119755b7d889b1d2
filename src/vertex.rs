//! Vertex formats shared by the importer, the frame graph and the vulkano
//! backend. Field names match the GLSL input names.
use bytemuck::{Pod, Zeroable};
use log::trace;

/// Skinned mesh vertex. Every mesh uses this one format; unskinned meshes
/// carry a single full weight on bone slot 1.
#[repr(C)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Zeroable,
    Pod,
    vulkano::pipeline::graphics::vertex_input::Vertex,
)]
pub struct Vertex {
    #[format(R32G32B32_SFLOAT)]
    pub position: [f32; 3],
    #[format(R32G32B32_SFLOAT)]
    pub normal: [f32; 3],
    #[format(R32G32B32_SFLOAT)]
    pub tangent: [f32; 3],
    #[format(R32G32_SFLOAT)]
    pub tex_coord: [f32; 2],
    #[format(R32G32B32A32_UINT)]
    pub bone_ids: [u32; 4],
    #[format(R32G32B32A32_SFLOAT)]
    pub bone_weights: [f32; 4],
}

impl Vertex {
    /// Bone slot given to vertices of meshes without a skin
    pub const DEFAULT_BONE: u32 = 1;

    /// Stores a bone influence in the first empty slot. Slots that already
    /// hold a weight are never replaced and weights are not renormalized.
    /// Returns false if all four slots were taken.
    pub fn add_bone_data(&mut self, bone_id: u32, weight: f32) -> bool {
        let slot = self.bone_weights.iter().position(|w| *w == 0.0);
        if let Some(i) = slot {
            self.bone_ids[i] = bone_id;
            self.bone_weights[i] = weight;
            true
        } else {
            trace!("dropped weight {} for bone {}", weight, bone_id);
            false
        }
    }
}

/// Screen space vertex for text and GUI quads, in window pixels
#[repr(C)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Zeroable,
    Pod,
    vulkano::pipeline::graphics::vertex_input::Vertex,
)]
pub struct OverlayVertex {
    #[format(R32G32_SFLOAT)]
    pub position: [f32; 2],
    #[format(R32G32_SFLOAT)]
    pub tex_coord: [f32; 2],
    #[format(R32G32B32A32_SFLOAT)]
    pub colour: [f32; 4],
}

/// A single world space point expanded to a quad by the billboard
/// geometry shader
#[repr(C)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Zeroable,
    Pod,
    vulkano::pipeline::graphics::vertex_input::Vertex,
)]
pub struct PointVertex {
    #[format(R32G32B32_SFLOAT)]
    pub position: [f32; 3],
}

/// Fullscreen quad corner in normalized device coordinates
#[repr(C)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Zeroable,
    Pod,
    vulkano::pipeline::graphics::vertex_input::Vertex,
)]
pub struct QuadVertex {
    #[format(R32G32_SFLOAT)]
    pub position: [f32; 2],
}

// Drawn as a triangle strip, the shader derives UVs from the position
pub const FULLSCREEN_QUAD: [QuadVertex; 4] = [
    QuadVertex {
        position: [-1.0, -1.0],
    },
    QuadVertex {
        position: [-1.0, 1.0],
    },
    QuadVertex {
        position: [1.0, -1.0],
    },
    QuadVertex {
        position: [1.0, 1.0],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_writer_wins() {
        let mut v = Vertex::default();
        for (id, w) in [(3, 0.5), (4, 0.25), (5, 0.125), (6, 0.125)] {
            assert!(v.add_bone_data(id, w));
        }
        assert!(!v.add_bone_data(7, 0.9));
        assert_eq!(v.bone_ids, [3, 4, 5, 6]);
        assert_eq!(v.bone_weights, [0.5, 0.25, 0.125, 0.125]);
    }

    #[test]
    fn weights_are_not_renormalized() {
        let mut v = Vertex::default();
        v.add_bone_data(2, 0.3);
        let sum: f32 = v.bone_weights.iter().sum();
        assert!((sum - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn layout_has_no_padding() {
        assert_eq!(std::mem::size_of::<Vertex>(), 76);
        assert_eq!(std::mem::size_of::<OverlayVertex>(), 32);
    }
}
