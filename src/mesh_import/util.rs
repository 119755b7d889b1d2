use crate::vertex::Vertex;
use itertools::Itertools;
use nalgebra_glm as glm;

/// Calculates the face normals from vertex data. These are not very useful
/// by themselves but are needed to calculate the vertex normals.
///
/// The face normals are not normalized so there is some area weighting
/// when they are summed into vertex normals.
#[must_use]
fn calculate_face_normals(
    indices: &[u32],
    vertices: &[Vertex],
) -> Vec<glm::Vec3> {
    let mut face_normals = Vec::with_capacity(indices.len() / 3);
    for (i0, i1, i2) in indices.iter().tuples() {
        let v0: glm::Vec3 = vertices[*i0 as usize].position.into();
        let v1: glm::Vec3 = vertices[*i1 as usize].position.into();
        let v2: glm::Vec3 = vertices[*i2 as usize].position.into();
        face_normals.push(glm::cross(&(v1 - v0), &(v2 - v0)));
    }
    face_normals
}

/// Calculates normals for meshes that were exported without them. Indices
/// must already have been checked against the vertex count.
pub fn calculate_normals(indices: &[u32], vertices: &mut [Vertex]) {
    let face_normals = calculate_face_normals(indices, vertices);
    let mut sums = vec![glm::Vec3::zeros(); vertices.len()];
    for ((i0, i1, i2), n) in indices.iter().tuples().zip(&face_normals) {
        for i in [i0, i1, i2] {
            sums[*i as usize] += n;
        }
    }
    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        if sum.norm_squared() > 0.0 {
            vertex.normal = glm::normalize(&sum).into();
        }
    }
}

/// Calculates per vertex tangents from texture coordinates. Faces with
/// degenerate UVs contribute nothing, and a vertex left without any
/// tangent gets one perpendicular to its normal so the TBN basis stays
/// valid.
pub fn calculate_tangents(indices: &[u32], vertices: &mut [Vertex]) {
    let mut sums = vec![glm::Vec3::zeros(); vertices.len()];
    for (i0, i1, i2) in indices.iter().tuples() {
        let (a, b, c) = (
            &vertices[*i0 as usize],
            &vertices[*i1 as usize],
            &vertices[*i2 as usize],
        );
        let e1 = glm::Vec3::from(b.position) - glm::Vec3::from(a.position);
        let e2 = glm::Vec3::from(c.position) - glm::Vec3::from(a.position);
        let du1 = b.tex_coord[0] - a.tex_coord[0];
        let dv1 = b.tex_coord[1] - a.tex_coord[1];
        let du2 = c.tex_coord[0] - a.tex_coord[0];
        let dv2 = c.tex_coord[1] - a.tex_coord[1];
        let det = du1.mul_add(dv2, -(du2 * dv1));
        if det.abs() < f32::EPSILON {
            continue;
        }
        let tangent = (e1 * dv2 - e2 * dv1) / det;
        for i in [i0, i1, i2] {
            sums[*i as usize] += tangent;
        }
    }
    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        let normal = glm::Vec3::from(vertex.normal);
        // Gram-Schmidt against the normal
        let t = sum - normal * glm::dot(&normal, &sum);
        vertex.tangent = if t.norm_squared() > f32::EPSILON {
            glm::normalize(&t).into()
        } else {
            any_perpendicular(&normal).into()
        };
    }
}

fn any_perpendicular(n: &glm::Vec3) -> glm::Vec3 {
    let axis = if n.x.abs() < 0.9 {
        glm::vec3(1.0, 0.0, 0.0)
    } else {
        glm::vec3(0.0, 1.0, 0.0)
    };
    let p = glm::cross(n, &axis);
    if p.norm_squared() > 0.0 {
        glm::normalize(&p)
    } else {
        axis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn quad() -> (Vec<u32>, Vec<Vertex>) {
        let corners = [
            ([0.0, 0.0, 0.0], [0.0, 0.0]),
            ([1.0, 0.0, 0.0], [1.0, 0.0]),
            ([1.0, 1.0, 0.0], [1.0, 1.0]),
            ([0.0, 1.0, 0.0], [0.0, 1.0]),
        ];
        let vertices = corners
            .iter()
            .map(|(p, uv)| Vertex {
                position: *p,
                tex_coord: *uv,
                ..Vertex::default()
            })
            .collect();
        (vec![0, 1, 2, 0, 2, 3], vertices)
    }

    #[test]
    fn normals_face_the_winding() {
        let (indices, mut vertices) = quad();
        calculate_normals(&indices, &mut vertices);
        for v in &vertices {
            assert!((v.normal[2] - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn tangents_follow_u() {
        let (indices, mut vertices) = quad();
        calculate_normals(&indices, &mut vertices);
        calculate_tangents(&indices, &mut vertices);
        for v in &vertices {
            assert!((v.tangent[0] - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn degenerate_uvs_still_give_unit_tangent() {
        let (indices, mut vertices) = quad();
        for v in &mut vertices {
            v.tex_coord = [0.5, 0.5];
            v.normal = [0.0, 0.0, 1.0];
        }
        calculate_tangents(&indices, &mut vertices);
        let t = glm::Vec3::from(vertices[0].tangent);
        assert!((t.norm() - 1.0).abs() < EPSILON);
        assert!(t.z.abs() < EPSILON);
    }
}
