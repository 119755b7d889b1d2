// Some code inspired by
// https://github.com/KhronosGroup/glTF-Tutorials/

use super::{
    types::{ImportError, ImportedMaterial, ImportedMesh, ImportedScene},
    util,
};
use crate::{
    animation::{
        AnimationClip, Bone, BoneMapping, Node, NodeChannel, NodeTree, QuatKey,
        VectorKey,
    },
    types::MAX_BONES,
    um_error::UmError,
    vertex::Vertex,
};
use ahash::{HashMap, HashMapExt};
use gltf::{
    animation::{util::ReadOutputs, Interpolation, Property},
    buffer::Data,
    image::Source,
    mesh::Mode,
    Document, Gltf, Primitive,
};
use log::{debug, info, trace, warn};
use nalgebra_glm as glm;
use std::{fs, io, path::Path};

/// Name of the node added above the scene roots so that the hierarchy has
/// a single root
pub const SCENE_ROOT: &str = "<scene root>";

fn load_impl(path: &Path) -> Result<(Document, Vec<Data>), UmError> {
    if !path.exists() {
        return Err(UmError::file_not_found(
            format!("model '{}' not found", path.display()),
            "mesh_import::load",
        ));
    }
    let base = path.parent().unwrap_or_else(|| Path::new("./"));
    let file = fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    let gltf = Gltf::from_reader(reader)?;
    let buffers = gltf::import_buffers(&gltf.document, Some(base), gltf.blob)?;

    info!(
        "{:?}, base path={:?}, buffer count={}",
        path,
        base,
        buffers.len(),
    );
    Ok((gltf.document, buffers))
}

/// Name used for a node everywhere: in the node tree, as a bone name and as
/// an animation channel key
fn node_name(node: &gltf::Node) -> String {
    node.name()
        .map_or_else(|| format!("node.{}", node.index()), ToString::to_string)
}

/// Builds the flat node tree. Every glTF node keeps its index and one extra
/// node is appended as the parent of the scene roots.
fn load_nodes(document: &Document) -> Result<NodeTree, UmError> {
    let count = document.nodes().count();
    if count == 0 {
        return Err(ImportError::NoScene.into());
    }
    let mut nodes = Vec::with_capacity(count + 1);
    for node in document.nodes() {
        nodes.push(Node {
            name: node_name(&node),
            transform: glm::Mat4::from(node.transform().matrix()),
            children: node.children().map(|c| c.index()).collect(),
        });
    }

    let roots: Vec<usize> = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .map_or_else(
            || {
                // No scene, so any node that is not somebody's child
                let mut is_child = vec![false; count];
                for n in &nodes {
                    for c in &n.children {
                        is_child[*c] = true;
                    }
                }
                (0..count).filter(|i| !is_child[*i]).collect()
            },
            |scene| scene.nodes().map(|n| n.index()).collect(),
        );
    nodes.push(Node {
        name: SCENE_ROOT.to_string(),
        transform: glm::Mat4::identity(),
        children: roots,
    });
    Ok(NodeTree { nodes, root: count })
}

fn load_materials(document: &Document) -> Vec<ImportedMaterial> {
    info!("Materials={}", document.materials().count());
    let mut materials = Vec::new();
    for m in document.materials() {
        let pbr = m.pbr_metallic_roughness();
        let diffuse = pbr.base_color_texture().and_then(|tex| {
            if let Source::Uri { uri, mime_type: _ } =
                tex.texture().source().source()
            {
                // Textures are shared between models and looked up by file
                // name in the texture directory
                Path::new(uri)
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
            } else {
                warn!("embedded texture in material {:?} ignored", m.name());
                None
            }
        });
        let name = m.name().unwrap_or_default().to_string();
        debug!("Material {:?} name={} diffuse={:?}", m.index(), name, diffuse);
        materials.push(ImportedMaterial { name, diffuse });
    }
    materials
}

/// Bone table for a skin: bone index is the joint index, offset is the
/// inverse bind matrix
fn load_bones(
    skin: &gltf::Skin,
    buffers: &[Data],
) -> Result<BoneMapping, UmError> {
    let joints: Vec<gltf::Node> = skin.joints().collect();
    if joints.len() > MAX_BONES {
        return Err(ImportError::TooManyBones(joints.len()).into());
    }
    let reader = skin.reader(|x| Some(&buffers[x.index()]));
    let offsets: Vec<glm::Mat4> = reader
        .read_inverse_bind_matrices()
        .map_or_else(Vec::new, |it| it.map(glm::Mat4::from).collect());
    if offsets.is_empty() {
        debug!("skin {} has no inverse bind matrices", skin.index());
    }

    let mut bones = BoneMapping::default();
    for (index, joint) in joints.iter().enumerate() {
        bones.insert(
            node_name(joint),
            Bone {
                index,
                offset: offsets
                    .get(index)
                    .copied()
                    .unwrap_or_else(glm::Mat4::identity),
            },
        );
    }
    Ok(bones)
}

fn load_primitive(
    p: &Primitive,
    buffers: &[Data],
    skinned: bool,
) -> Result<(Vec<Vertex>, Vec<u32>), UmError> {
    if p.mode() != Mode::Triangles {
        return Err(ImportError::NoTriangles.into());
    }
    let reader = p.reader(|x| Some(&buffers[x.index()]));

    let mut vertices: Vec<Vertex> = reader
        .read_positions()
        .ok_or(ImportError::NoPositions)?
        .map(|position| Vertex {
            position,
            ..Vertex::default()
        })
        .collect();
    let count = vertices.len();

    // Unindexed triangles are drawn in order
    let indices: Vec<u32> = reader.read_indices().map_or_else(
        || (0..u32::try_from(count).unwrap_or(u32::MAX)).collect(),
        |it| it.into_u32().collect(),
    );
    if let Some(bad) = indices.iter().find(|i| **i as usize >= count) {
        return Err(ImportError::IndexOutOfRange(*bad).into());
    }

    let has_normals = if let Some(it) = reader.read_normals() {
        let mut n = 0;
        for (v, normal) in vertices.iter_mut().zip(it) {
            v.normal = normal;
            n += 1;
        }
        if n != count {
            return Err(ImportError::CountMismatch.into());
        }
        true
    } else {
        false
    };
    if !has_normals {
        debug!("primitive {} generating normals", p.index());
        util::calculate_normals(&indices, &mut vertices);
    }

    if let Some(it) = reader.read_tex_coords(0) {
        for (v, uv) in vertices.iter_mut().zip(it.into_f32()) {
            v.tex_coord = uv;
        }
    }

    if let Some(it) = reader.read_tangents() {
        for (v, t) in vertices.iter_mut().zip(it) {
            v.tangent = [t[0], t[1], t[2]];
        }
    } else {
        debug!("primitive {} generating tangents", p.index());
        util::calculate_tangents(&indices, &mut vertices);
    }

    if skinned {
        // Later sets only fill slots the earlier ones left empty
        let mut set = 0;
        while let (Some(joints), Some(weights)) =
            (reader.read_joints(set), reader.read_weights(set))
        {
            for (v, (ids, ws)) in vertices
                .iter_mut()
                .zip(joints.into_u16().zip(weights.into_f32()))
            {
                for (id, w) in ids.iter().zip(ws) {
                    if w > 0.0 {
                        v.add_bone_data(u32::from(*id), w);
                    }
                }
            }
            set += 1;
        }
    } else {
        for v in &mut vertices {
            v.add_bone_data(Vertex::DEFAULT_BONE, 1.0);
        }
    }

    Ok((vertices, indices))
}

/// Loads the meshes, materials and node hierarchy of a glTF file. Textures
/// are not loaded here; materials only record the file names.
///
/// Meshes are collected by walking the node tree depth first from the scene
/// root, so a mesh referenced by two nodes appears twice. Every primitive
/// of a skinned node shares the bone table of that node's skin.
///
/// # Errors
/// May return `UmError`
pub fn load_scene(path: &Path) -> Result<ImportedScene, UmError> {
    let (document, buffers) = load_impl(path)?;
    let materials = load_materials(&document);
    let nodes = load_nodes(&document)?;

    let gltf_nodes: Vec<gltf::Node> = document.nodes().collect();
    let mut meshes = Vec::new();
    let mut stack = vec![nodes.root];
    while let Some(index) = stack.pop() {
        // Reverse so children come off the stack in order
        stack.extend(nodes.nodes[index].children.iter().rev());
        let Some(node) = gltf_nodes.get(index) else {
            continue; // the added scene root
        };
        let Some(mesh) = node.mesh() else {
            continue;
        };
        let bones = match node.skin() {
            Some(skin) => load_bones(&skin, &buffers)?,
            None => BoneMapping::default(),
        };
        for p in mesh.primitives() {
            let (vertices, indices) =
                load_primitive(&p, &buffers, node.skin().is_some())?;
            info!(
                "mesh={:?} primitive={} vertices={} indices={} bones={}",
                mesh.name(),
                p.index(),
                vertices.len(),
                indices.len(),
                bones.len(),
            );
            meshes.push(ImportedMesh {
                name: mesh.name().unwrap_or_default().to_string(),
                vertices,
                indices,
                material: p.material().index(),
                bones: bones.clone(),
            });
        }
    }

    Ok(ImportedScene {
        nodes,
        meshes,
        materials,
        clip_count: document.animations().count(),
    })
}

/// glTF cubic spline outputs hold an in tangent, value and out tangent per
/// key. Only the values are kept and the curve is treated as linear.
fn values<T: Copy>(outputs: Vec<T>, interpolation: Interpolation) -> Vec<T> {
    if interpolation == Interpolation::CubicSpline {
        outputs.chunks_exact(3).map(|c| c[1]).collect()
    } else {
        outputs
    }
}

/// Loads every animation in a glTF file as clips. glTF key times are in
/// seconds, so the clips run at one tick per second.
///
/// # Errors
/// May return `UmError`
pub fn load_clips(path: &Path) -> Result<Vec<AnimationClip>, UmError> {
    let (document, buffers) = load_impl(path)?;
    let mut clips = Vec::new();
    for animation in document.animations() {
        let mut channels = HashMap::<String, NodeChannel>::new();
        let mut duration = 0.0_f32;

        for channel in animation.channels() {
            let target = channel.target();
            if target.property() == Property::MorphTargetWeights {
                return Err(ImportError::Morphing.into());
            }
            let interpolation = channel.sampler().interpolation();
            if interpolation == Interpolation::Step {
                trace!("step interpolation treated as linear");
            }
            let reader = channel.reader(|x| Some(&buffers[x.index()]));
            let times: Vec<f32> = reader
                .read_inputs()
                .ok_or(ImportError::NoSampler)?
                .collect();
            if let Some(t) = times.last() {
                duration = duration.max(*t);
            }

            let entry = channels.entry(node_name(&target.node())).or_default();
            match reader.read_outputs().ok_or(ImportError::NoSampler)? {
                ReadOutputs::Translations(it) => {
                    let v = values(it.collect(), interpolation);
                    entry.positions = vector_keys(&times, &v);
                }
                ReadOutputs::Scales(it) => {
                    let v = values(it.collect(), interpolation);
                    entry.scalings = vector_keys(&times, &v);
                }
                ReadOutputs::Rotations(it) => {
                    let v = values(it.into_f32().collect(), interpolation);
                    entry.rotations = times
                        .iter()
                        .zip(v)
                        .map(|(time, q)| QuatKey {
                            time: *time,
                            value: glm::quat(q[0], q[1], q[2], q[3]),
                        })
                        .collect();
                }
                ReadOutputs::MorphTargetWeights(_) => {
                    return Err(ImportError::Morphing.into());
                }
            }
        }

        let name = animation.name().map_or_else(
            || format!("animation.{}", animation.index()),
            ToString::to_string,
        );
        debug!(
            "animation {} channels={} duration={}",
            name,
            channels.len(),
            duration
        );
        clips.push(AnimationClip {
            name,
            ticks_per_second: 1.0,
            duration,
            channels,
        });
    }
    Ok(clips)
}

fn vector_keys(times: &[f32], values: &[[f32; 3]]) -> Vec<VectorKey> {
    times
        .iter()
        .zip(values)
        .map(|(time, v)| VectorKey {
            time: *time,
            value: glm::Vec3::from(*v),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::um_error::ErrorKind;

    #[test]
    fn missing_file_is_file_not_found() {
        let e = load_scene(Path::new("no/such/model.gltf")).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::FileNotFound);
        let e = load_clips(Path::new("no/such/clip.gltf")).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::FileNotFound);
    }

    /// (0, 0, 0), (1, 0, 0), (0, 1, 0) as little endian f32
    const TRIANGLE: &str = concat!(
        "data:application/octet-stream;base64,",
        "AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
    );

    /// One unindexed triangle on a node without a skin
    const UNSKINNED: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "crate", "mesh": 0 }],
        "meshes": [{
            "name": "crate",
            "primitives": [{ "attributes": { "POSITION": 0 } }]
        }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "buffers": [{
            "byteLength": 36,
            "uri": "TRIANGLE"
        }]
    }"#;

    #[test]
    fn unskinned_mesh_follows_default_bone() {
        let path = std::env::temp_dir()
            .join(format!("umbra_unskinned_{}.gltf", std::process::id()));
        fs::write(&path, UNSKINNED.replace("TRIANGLE", TRIANGLE)).unwrap();
        let scene = load_scene(&path);
        fs::remove_file(&path).unwrap();
        let scene = scene.unwrap();

        assert_eq!(scene.meshes.len(), 1);
        let mesh = &scene.meshes[0];
        assert!(mesh.bones.is_empty());
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3);
        for v in &mesh.vertices {
            assert_eq!(v.bone_ids, [Vertex::DEFAULT_BONE, 0, 0, 0]);
            assert_eq!(v.bone_weights, [1.0, 0.0, 0.0, 0.0]);
        }
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        // The added root sits above the one scene node
        assert_eq!(scene.nodes.nodes[scene.nodes.root].children, vec![0]);
    }

    #[test]
    fn cubic_spline_keeps_values() {
        let v = values(vec![0, 1, 2, 3, 4, 5], Interpolation::CubicSpline);
        assert_eq!(v, vec![1, 4]);
        let v = values(vec![0, 1], Interpolation::Linear);
        assert_eq!(v, vec![0, 1]);
    }
}
