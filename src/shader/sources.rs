//! The fixed set of programs used by the frame graph and the stages each is
//! built from
macro_rules! stage {
    ($stage:ident, $file:literal) => {
        StageSource {
            stage: Stage::$stage,
            name: $file,
            code: StageCode::Spirv(include_bytes!(concat!(
                env!("OUT_DIR"),
                "/",
                $file,
                ".spv"
            ))),
        }
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgramId {
    GeometryPass,
    DepthMap,
    Ssao,
    SsaoBlur,
    LightingPass,
    Billboard,
    GaussianBlur,
    HdrBlend,
    TextOverlay,
    Gui,
    Minimap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Geometry,
    Fragment,
}

#[derive(Clone, Copy, Debug)]
pub enum StageCode {
    /// SPIR-V compiled by the build script
    Spirv(&'static [u8]),
    /// The shared full screen quad vertex shader, which the Vulkan backend
    /// compiles with `vulkano_shaders`
    FullscreenQuad,
}

#[derive(Clone, Copy, Debug)]
pub struct StageSource {
    pub stage: Stage,
    pub name: &'static str,
    pub code: StageCode,
}

impl StageSource {
    /// The module uniforms are reflected from. The shared quad stage only
    /// reads its vertex input, so it has none.
    #[must_use]
    pub const fn spirv(&self) -> Option<&'static [u8]> {
        match self.code {
            StageCode::Spirv(bytes) => Some(bytes),
            StageCode::FullscreenQuad => None,
        }
    }
}

const QUAD_VERT: StageSource = StageSource {
    stage: Stage::Vertex,
    name: "quad.vert",
    code: StageCode::FullscreenQuad,
};
const OVERLAY_VERT: StageSource = stage!(Vertex, "overlay.vert");

const GEOMETRY_PASS: &[StageSource] = &[
    stage!(Vertex, "geometry.vert"),
    stage!(Fragment, "geometry.frag"),
];
const DEPTH_MAP: &[StageSource] = &[
    stage!(Vertex, "depth_map.vert"),
    stage!(Geometry, "depth_map.geom"),
    stage!(Fragment, "depth_map.frag"),
];
const SSAO: &[StageSource] = &[QUAD_VERT, stage!(Fragment, "ssao.frag")];
const SSAO_BLUR: &[StageSource] =
    &[QUAD_VERT, stage!(Fragment, "ssao_blur.frag")];
const LIGHTING_PASS: &[StageSource] =
    &[QUAD_VERT, stage!(Fragment, "lighting.frag")];
const BILLBOARD: &[StageSource] = &[
    stage!(Vertex, "billboard.vert"),
    stage!(Geometry, "billboard.geom"),
    stage!(Fragment, "billboard.frag"),
];
const GAUSSIAN_BLUR: &[StageSource] =
    &[QUAD_VERT, stage!(Fragment, "gaussian_blur.frag")];
const HDR_BLEND: &[StageSource] =
    &[QUAD_VERT, stage!(Fragment, "hdr_blend.frag")];
const TEXT_OVERLAY: &[StageSource] =
    &[OVERLAY_VERT, stage!(Fragment, "text.frag")];
const GUI: &[StageSource] = &[OVERLAY_VERT, stage!(Fragment, "gui.frag")];
const MINIMAP: &[StageSource] =
    &[OVERLAY_VERT, stage!(Fragment, "minimap.frag")];

impl ProgramId {
    pub const ALL: [Self; 11] = [
        Self::GeometryPass,
        Self::DepthMap,
        Self::Ssao,
        Self::SsaoBlur,
        Self::LightingPass,
        Self::Billboard,
        Self::GaussianBlur,
        Self::HdrBlend,
        Self::TextOverlay,
        Self::Gui,
        Self::Minimap,
    ];

    #[must_use]
    pub const fn stages(self) -> &'static [StageSource] {
        match self {
            Self::GeometryPass => GEOMETRY_PASS,
            Self::DepthMap => DEPTH_MAP,
            Self::Ssao => SSAO,
            Self::SsaoBlur => SSAO_BLUR,
            Self::LightingPass => LIGHTING_PASS,
            Self::Billboard => BILLBOARD,
            Self::GaussianBlur => GAUSSIAN_BLUR,
            Self::HdrBlend => HDR_BLEND,
            Self::TextOverlay => TEXT_OVERLAY,
            Self::Gui => GUI,
            Self::Minimap => MINIMAP,
        }
    }

    /// Index into per-program arrays
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GeometryPass => "GeometryPass",
            Self::DepthMap => "DepthMap",
            Self::Ssao => "Ssao",
            Self::SsaoBlur => "SsaoBlur",
            Self::LightingPass => "LightingPass",
            Self::Billboard => "Billboard",
            Self::GaussianBlur => "GaussianBlur",
            Self::HdrBlend => "HdrBlend",
            Self::TextOverlay => "TextOverlay",
            Self::Gui => "Gui",
            Self::Minimap => "Minimap",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_program_ends_in_a_fragment_stage() {
        for (i, id) in ProgramId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
            let stages = id.stages();
            assert_eq!(stages[0].stage, Stage::Vertex, "{}", id.name());
            assert_eq!(
                stages.last().map(|s| s.stage),
                Some(Stage::Fragment),
                "{}",
                id.name()
            );
        }
    }
}
