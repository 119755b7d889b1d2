use crate::types::{SHADOW_FAR, SHADOW_NEAR};
use nalgebra_glm as glm;

/// Look direction and up vector for each cube face in layer order
/// +X, -X, +Y, -Y, +Z, -Z
const FACES: [([f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, -1.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
    ([0.0, 0.0, -1.0], [0.0, -1.0, 0.0]),
];

/// View projection for every face of the shadow cube around a light. The
/// projection is a square 90 degree frustum.
///
/// Cube faces are addressed with the first row at the top of the face, so
/// the up vectors point down and, unlike the camera projection, Y is not
/// flipped: Vulkan already puts NDC -1 at row 0.
#[must_use]
pub fn face_matrices(light_pos: &glm::Vec3) -> [glm::Mat4; 6] {
    let proj = glm::perspective_rh_zo(
        1.0,
        std::f32::consts::FRAC_PI_2,
        SHADOW_NEAR,
        SHADOW_FAR,
    );
    FACES.map(|(dir, up)| {
        let target = light_pos + glm::Vec3::from(dir);
        proj * glm::look_at_rh(light_pos, &target, &glm::Vec3::from(up))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_face_sees_its_direction() {
        let light = glm::vec3(1.0, 2.0, 3.0);
        let faces = face_matrices(&light);
        for (m, (dir, _)) in faces.iter().zip(FACES) {
            let p = light + glm::Vec3::from(dir) * 5.0;
            let clip = m * glm::vec4(p.x, p.y, p.z, 1.0);
            let ndc = clip.xyz() / clip.w;
            assert!(ndc.x.abs() < 0.001 && ndc.y.abs() < 0.001);
            assert!((0.0..=1.0).contains(&ndc.z));
        }
    }
}
