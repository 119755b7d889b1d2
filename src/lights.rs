use crate::{
    types::{LIGHT_JITTER, MAX_LIGHTS},
    um_error::UmError,
};
use nalgebra_glm as glm;
use rand::Rng;

pub const DEFAULT_LINEAR: f32 = 0.5;
pub const DEFAULT_QUADRATIC: f32 = 1.0;

/// Point light in world space with distance attenuation
/// `1 / (1 + linear * d + quadratic * d * d)`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub position: glm::Vec3,
    pub colour: glm::Vec3,
    pub linear: f32,
    pub quadratic: f32,
}

impl Light {
    #[must_use]
    pub const fn new(position: glm::Vec3, colour: glm::Vec3) -> Self {
        Self {
            position,
            colour,
            linear: DEFAULT_LINEAR,
            quadratic: DEFAULT_QUADRATIC,
        }
    }

    #[must_use]
    pub const fn with_attenuation(
        mut self,
        linear: f32,
        quadratic: f32,
    ) -> Self {
        self.linear = linear;
        self.quadratic = quadratic;
        self
    }
}

/// The lights of a scene, capped at `MAX_LIGHTS` to fit the lighting pass
/// uniform arrays
#[derive(Clone, Debug, Default)]
pub struct LightSet {
    lights: Vec<Light>,
}

impl LightSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// May return `UmError`
    pub fn add(&mut self, light: Light) -> Result<usize, UmError> {
        if self.lights.len() >= MAX_LIGHTS {
            return Err(UmError::invalid_state(
                format!("light limit of {MAX_LIGHTS} reached"),
                "LightSet::add",
            ));
        }
        self.lights.push(light);
        Ok(self.lights.len() - 1)
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Light] {
        &self.lights
    }

    /// The light closest to `position`, which casts this frame's shadows.
    /// Ties go to the light added first.
    #[must_use]
    pub fn nearest(&self, position: &glm::Vec3) -> Option<&Light> {
        self.lights.iter().min_by(|a, b| {
            glm::distance2(&a.position, position)
                .total_cmp(&glm::distance2(&b.position, position))
        })
    }

    /// One intensity factor per light, uniform in `1 ± jitter`
    pub fn jittered_intensities(
        &self,
        rng: &mut impl Rng,
        jitter: f32,
    ) -> Vec<f32> {
        let jitter = jitter.abs();
        self.lights
            .iter()
            .map(|_| {
                if jitter > 0.0 {
                    rng.gen_range(1.0 - jitter..=1.0 + jitter)
                } else {
                    1.0
                }
            })
            .collect()
    }

    /// Factors at the default flicker strength
    pub fn default_intensities(&self, rng: &mut impl Rng) -> Vec<f32> {
        self.jittered_intensities(rng, LIGHT_JITTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::um_error::ErrorKind;
    use rand::{rngs::StdRng, SeedableRng};

    fn light_at(x: f32) -> Light {
        Light::new(glm::vec3(x, 0.0, 0.0), glm::vec3(1.0, 1.0, 1.0))
    }

    #[test]
    fn cap_is_invalid_state() {
        let mut set = LightSet::new();
        for i in 0..MAX_LIGHTS {
            #[allow(clippy::cast_precision_loss)]
            set.add(light_at(i as f32)).unwrap();
        }
        let e = set.add(light_at(0.0)).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidState);
        assert_eq!(set.len(), MAX_LIGHTS);
    }

    #[test]
    fn nearest_picks_shadow_caster() {
        let mut set = LightSet::new();
        assert!(set.nearest(&glm::Vec3::zeros()).is_none());
        set.add(light_at(10.0)).unwrap();
        set.add(light_at(-3.0)).unwrap();
        set.add(light_at(4.0)).unwrap();
        let nearest = set.nearest(&glm::vec3(1.0, 0.0, 0.0)).unwrap();
        assert!((nearest.position.x - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn jitter_stays_in_range() {
        let mut set = LightSet::new();
        for _ in 0..8 {
            set.add(light_at(0.0)).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(7);
        for f in set.default_intensities(&mut rng) {
            assert!((0.9..=1.1).contains(&f), "{f}");
        }
        let flat = set.jittered_intensities(&mut rng, 0.0);
        assert!(flat.iter().all(|f| (*f - 1.0).abs() < f32::EPSILON));
    }
}
