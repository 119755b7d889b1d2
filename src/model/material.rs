use crate::mesh_import::ImportedMaterial;

pub const DEFAULT_ROUGHNESS: f32 = 0.8;
pub const DEFAULT_METALLIC: f32 = 0.0;
pub const FLAT_NORMAL_MAP: &str = "flat_normal_map.png";

/// Surface description for the geometry pass. Texture names are resolved
/// through the texture cache the first time the material is drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: String,
    pub normal_map: String,
    pub roughness: f32,
    pub metallic: f32,
}

/// How a material name is matched
#[derive(Clone, Copy, Debug)]
enum Match {
    Contains(&'static str),
    Exact(&'static str),
}

impl Match {
    fn matches(self, name: &str) -> bool {
        match self {
            Self::Contains(s) => name.contains(s),
            Self::Exact(s) => name == s,
        }
    }
}

/// Known assets ship with broken material info, so their values are set
/// here by material name. The first match wins.
struct Override {
    pattern: Match,
    metallic: Option<f32>,
    roughness: Option<f32>,
    diffuse: Option<&'static str>,
    normal_map: Option<&'static str>,
}

const OVERRIDES: [Override; 5] = [
    // skeleton equipment
    Override {
        pattern: Match::Contains("equipment"),
        metallic: Some(0.8),
        roughness: Some(0.5),
        diffuse: None,
        normal_map: None,
    },
    // trap spike
    Override {
        pattern: Match::Contains("Spike"),
        metallic: Some(0.8),
        roughness: Some(0.3),
        diffuse: None,
        normal_map: Some("Spiketrap_normal_map.tga"),
    },
    // trap body
    Override {
        pattern: Match::Contains("Body"),
        metallic: Some(0.3),
        roughness: Some(0.7),
        diffuse: None,
        normal_map: Some("Spiketrap_normal_map.tga"),
    },
    // treasure
    Override {
        pattern: Match::Exact("lambert6"),
        metallic: Some(0.8),
        roughness: Some(0.3),
        diffuse: None,
        normal_map: None,
    },
    Override {
        pattern: Match::Exact("Barrel1"),
        metallic: None,
        roughness: None,
        diffuse: Some("Barrel2_A.png"),
        normal_map: Some("Barrel2_N.png"),
    },
];

impl Material {
    /// Builds a material from imported data. Returns `None` when there is
    /// no diffuse texture from either the asset or an override, in which
    /// case the mesh draws without binding material textures.
    #[must_use]
    pub fn from_import(imported: &ImportedMaterial) -> Option<Self> {
        let mut material = Self {
            name: imported.name.clone(),
            diffuse: String::new(),
            normal_map: FLAT_NORMAL_MAP.to_string(),
            roughness: DEFAULT_ROUGHNESS,
            metallic: DEFAULT_METALLIC,
        };
        let o = OVERRIDES.iter().find(|o| o.pattern.matches(&imported.name));
        if let Some(o) = o {
            material.metallic = o.metallic.unwrap_or(material.metallic);
            material.roughness = o.roughness.unwrap_or(material.roughness);
            if let Some(n) = o.normal_map {
                material.normal_map = n.to_string();
            }
        }
        material.diffuse = o
            .and_then(|o| o.diffuse)
            .map(ToString::to_string)
            .or_else(|| imported.diffuse.clone())?;
        Some(material)
    }
}
