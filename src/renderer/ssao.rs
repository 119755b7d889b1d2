use crate::{
    texture::TextureData,
    types::{SSAO_KERNEL_SIZE, SSAO_NOISE_DIM},
    um_error::UmError,
};
use nalgebra_glm as glm;
use rand::Rng;

/// Hemisphere sample kernel in tangent space, `z >= 0`. Samples cluster
/// towards the origin: sample `i` is scaled by `lerp(0.1, 1, (i/n)^2)`.
#[allow(clippy::cast_precision_loss)]
pub fn kernel(rng: &mut impl Rng) -> Vec<glm::Vec3> {
    (0..SSAO_KERNEL_SIZE)
        .map(|i| {
            let sample = glm::normalize(&glm::vec3(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(0.0..1.0),
            ));
            let t = i as f32 / SSAO_KERNEL_SIZE as f32;
            let scale = glm::lerp_scalar(0.1, 1.0, t * t);
            sample * rng.gen_range(0.0..1.0_f32) * scale
        })
        .collect()
}

/// Random rotations about the normal, tiled over the screen. `z` is zero.
///
/// # Errors
/// May return `UmError`
pub fn noise_texture(rng: &mut impl Rng) -> Result<TextureData, UmError> {
    let count = (SSAO_NOISE_DIM * SSAO_NOISE_DIM) as usize;
    let texels: Vec<[f32; 4]> = (0..count)
        .map(|_| {
            [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 0.0, 0.0]
        })
        .collect();
    TextureData::from_f32(SSAO_NOISE_DIM, SSAO_NOISE_DIM, &texels)
}

/// UV scale that tiles the noise texture across the viewport
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn noise_scale(dimensions: [u32; 2]) -> glm::Vec2 {
    glm::vec2(
        dimensions[0] as f32 / SSAO_NOISE_DIM as f32,
        dimensions[1] as f32 / SSAO_NOISE_DIM as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureFormat;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn kernel_is_a_hemisphere() {
        let mut rng = StdRng::seed_from_u64(1);
        let samples = kernel(&mut rng);
        assert_eq!(samples.len(), SSAO_KERNEL_SIZE);
        for s in &samples {
            assert!(s.z >= 0.0);
            assert!(glm::length(s) <= 1.0);
        }
        // The first sample is scaled to at most a tenth
        assert!(glm::length(&samples[0]) <= 0.1 + f32::EPSILON);
    }

    #[test]
    fn noise_is_flat() {
        let mut rng = StdRng::seed_from_u64(2);
        let noise = noise_texture(&mut rng).unwrap();
        assert_eq!(noise.format, TextureFormat::Rgba32Float);
        let texels: &[[f32; 4]] = bytemuck::cast_slice(&noise.pixels);
        assert_eq!(texels.len(), 16);
        assert!(texels.iter().all(|t| t[2] == 0.0));
    }

    #[test]
    fn noise_tiles_viewport() {
        let scale = noise_scale([800, 600]);
        assert!((scale.x - 200.0).abs() < f32::EPSILON);
        assert!((scale.y - 150.0).abs() < f32::EPSILON);
    }
}
