//! Uniform and sampler names shared with the GLSL sources. These must match
//! the declarations in `shaders/` exactly.

pub const U_MODEL: &str = "uModel";
pub const U_VIEW: &str = "uView";
pub const U_INVERSE_VIEW: &str = "uInverseView";
pub const U_PROJECTION: &str = "uProjection";
pub const U_MVP: &str = "uMVP";
pub const U_BONES: &str = "uBones";
pub const U_ROUGHNESS: &str = "uRoughness";
pub const U_METALLIC: &str = "uMetallic";
pub const U_DIFFUSE: &str = "uDiffuse";
pub const U_NORMAL_MAP: &str = "uNormalMap";

// Shadow pass
pub const U_SHADOW_MATRICES: &str = "uShadowMatrices";
pub const U_LIGHT_POS: &str = "uLightPos";
pub const U_FAR_PLANE: &str = "uFarPlane";

// SSAO
pub const U_SAMPLES: &str = "uSamples";
pub const U_NOISE_SCALE: &str = "uNoiseScale";
pub const U_NOISE: &str = "uNoise";
pub const U_SSAO_INPUT: &str = "uSsaoInput";

// G-buffer samplers
pub const G_POSITION: &str = "gPosition";
pub const G_NORMAL: &str = "gNormal";
pub const G_ALBEDO_SPEC: &str = "gAlbedoSpec";

// Lighting
pub const U_LIGHT_POSITIONS: &str = "uLightPositions";
pub const U_LIGHT_COLORS: &str = "uLightColors";
pub const U_LIGHT_LINEAR: &str = "uLightLinear";
pub const U_LIGHT_QUADRATIC: &str = "uLightQuadratic";
pub const U_LIGHT_INTENSITY: &str = "uLightIntensity";
pub const U_LIGHT_COUNT: &str = "uLightCount";
pub const U_VIEW_POS: &str = "uViewPos";
pub const U_SHADOW_LIGHT_POS: &str = "uShadowLightPos";
pub const U_SHADOW_ENABLED: &str = "uShadowEnabled";
pub const U_SSAO: &str = "uSsao";
pub const U_SHADOW_MAP: &str = "uShadowMap";

// Forward pass
pub const U_BILLBOARD_WIDTH: &str = "uBillboardWidth";
pub const U_BILLBOARD_HEIGHT: &str = "uBillboardHeight";
pub const U_TEXTURE: &str = "uTexture";

// Bloom and tone mapping
pub const U_HORIZONTAL: &str = "uHorizontal";
pub const U_IMAGE: &str = "uImage";
pub const U_EXPOSURE: &str = "uExposure";
pub const U_BLOOM_ENABLED: &str = "uBloomEnabled";
pub const U_SCENE: &str = "uScene";
pub const U_BLOOM: &str = "uBloom";

// Overlay
pub const U_TEXT_COLOR: &str = "uTextColor";
pub const U_GLYPHS: &str = "uGlyphs";
