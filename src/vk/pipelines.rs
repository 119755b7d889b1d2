//! One graphics pipeline per program, built from the SPIR-V compiled by the
//! build script
use super::{targets::TargetFormats, util};
use crate::{
    shader::{ProgramId, StageCode, StageSource},
    um_error::UmError,
    vertex::{OverlayVertex, PointVertex, QuadVertex, Vertex},
};
use std::sync::Arc;
use vulkano::{
    device::Device,
    format::Format,
    pipeline::{
        graphics::{
            color_blend::{ColorBlendAttachmentState, ColorBlendState},
            depth_stencil::{CompareOp, DepthState, DepthStencilState},
            input_assembly::{InputAssemblyState, PrimitiveTopology},
            multisample::MultisampleState,
            rasterization::RasterizationState,
            subpass::PipelineRenderingCreateInfo,
            vertex_input::{
                Vertex as _, VertexBufferDescription, VertexDefinition,
            },
            viewport::ViewportState,
            GraphicsPipelineCreateInfo,
        },
        layout::PipelineDescriptorSetLayoutCreateInfo,
        DynamicState, GraphicsPipeline, PipelineLayout,
        PipelineShaderStageCreateInfo,
    },
    shader::{spirv::bytes_to_words, ShaderModule, ShaderModuleCreateInfo},
};

mod quad_vs {
    vulkano_shaders::shader! {
        ty: "vertex",
        path: "shaders/quad.vert",
    }
}

/// What a program draws into and how
struct Output {
    colour_formats: Vec<Format>,
    depth: Option<DepthState>,
    depth_format: Option<Format>,
    blend: bool,
}

impl Output {
    fn for_program(id: ProgramId, formats: &TargetFormats) -> Self {
        let colour = |colour_formats| Self {
            colour_formats,
            depth: None,
            depth_format: None,
            blend: false,
        };
        match id {
            ProgramId::GeometryPass => Self {
                depth: Some(DepthState::simple()),
                depth_format: Some(formats.depth),
                ..colour(vec![formats.hdr, formats.hdr, formats.albedo])
            },
            ProgramId::DepthMap => Self {
                depth: Some(DepthState::simple()),
                depth_format: Some(formats.depth),
                ..colour(Vec::new())
            },
            ProgramId::Ssao | ProgramId::SsaoBlur => {
                colour(vec![formats.single])
            }
            ProgramId::LightingPass => colour(vec![formats.hdr, formats.hdr]),
            // Tested against the copied depth but never written
            ProgramId::Billboard => Self {
                depth: Some(DepthState {
                    write_enable: false,
                    compare_op: CompareOp::Less,
                }),
                depth_format: Some(formats.depth),
                blend: true,
                ..colour(vec![formats.hdr, formats.hdr])
            },
            ProgramId::GaussianBlur => colour(vec![formats.hdr]),
            ProgramId::HdrBlend => colour(vec![formats.swapchain]),
            ProgramId::TextOverlay | ProgramId::Gui | ProgramId::Minimap => {
                Self {
                    blend: true,
                    ..colour(vec![formats.swapchain])
                }
            }
        }
    }
}

fn vertex_buffer(id: ProgramId) -> VertexBufferDescription {
    match id {
        ProgramId::GeometryPass | ProgramId::DepthMap => Vertex::per_vertex(),
        ProgramId::Billboard => PointVertex::per_vertex(),
        ProgramId::TextOverlay | ProgramId::Gui | ProgramId::Minimap => {
            OverlayVertex::per_vertex()
        }
        _ => QuadVertex::per_vertex(),
    }
}

const fn topology(id: ProgramId) -> PrimitiveTopology {
    match id {
        ProgramId::Billboard => PrimitiveTopology::PointList,
        ProgramId::GeometryPass
        | ProgramId::DepthMap
        | ProgramId::TextOverlay
        | ProgramId::Gui
        | ProgramId::Minimap => PrimitiveTopology::TriangleList,
        _ => PrimitiveTopology::TriangleStrip,
    }
}

fn load_stage(
    device: &Arc<Device>,
    source: &StageSource,
) -> Result<PipelineShaderStageCreateInfo, UmError> {
    let module = match source.code {
        StageCode::Spirv(bytes) => {
            let words = bytes_to_words(bytes).map_err(|_| {
                UmError::resource(
                    format!("{} is not valid SPIR-V", source.name),
                    "load_stage",
                )
            })?;
            // The words come from shaderc in the build script
            unsafe {
                ShaderModule::new(
                    device.clone(),
                    ShaderModuleCreateInfo::new(&words),
                )?
            }
        }
        StageCode::FullscreenQuad => quad_vs::load(device.clone())?,
    };
    let entry = module.entry_point("main").ok_or_else(|| {
        UmError::resource(
            format!("{} has no main entry point", source.name),
            "load_stage",
        )
    })?;
    Ok(PipelineShaderStageCreateInfo::new(entry))
}

/// # Errors
/// May return `UmError`
pub fn create(
    device: &Arc<Device>,
    id: ProgramId,
    formats: &TargetFormats,
) -> Result<Arc<GraphicsPipeline>, UmError> {
    let stages = id
        .stages()
        .iter()
        .map(|s| load_stage(device, s))
        .collect::<Result<Vec<_>, _>>()?;
    let vertex_input_state = vertex_buffer(id)
        .definition(&stages[0].entry_point.info().input_interface)?;

    let layout = PipelineLayout::new(
        device.clone(),
        PipelineDescriptorSetLayoutCreateInfo::from_stages(&stages)
            .into_pipeline_layout_create_info(device.clone())?,
    )?;

    let output = Output::for_program(id, formats);
    let attachment = if output.blend {
        util::alpha_blend()
    } else {
        ColorBlendAttachmentState::default()
    };
    let attachment_count = u32::try_from(output.colour_formats.len())
        .map_err(|_| {
            UmError::render_engine("too many attachments", "pipelines::create")
        })?;
    let subpass = PipelineRenderingCreateInfo {
        color_attachment_formats: output
            .colour_formats
            .iter()
            .map(|f| Some(*f))
            .collect(),
        depth_attachment_format: output.depth_format,
        ..PipelineRenderingCreateInfo::default()
    };

    Ok(GraphicsPipeline::new(
        device.clone(),
        None,
        GraphicsPipelineCreateInfo {
            stages: stages.into_iter().collect(),
            vertex_input_state: Some(vertex_input_state),
            input_assembly_state: Some(InputAssemblyState {
                topology: topology(id),
                ..InputAssemblyState::default()
            }),
            viewport_state: Some(ViewportState::default()),
            rasterization_state: Some(RasterizationState::default()),
            multisample_state: Some(MultisampleState::default()),
            depth_stencil_state: output.depth.map(|depth| {
                DepthStencilState {
                    depth: Some(depth),
                    ..DepthStencilState::default()
                }
            }),
            color_blend_state: Some(ColorBlendState::with_attachment_states(
                attachment_count,
                attachment,
            )),
            dynamic_state: std::iter::once(DynamicState::Viewport).collect(),
            subpass: Some(subpass.into()),
            ..GraphicsPipelineCreateInfo::layout(layout)
        },
    )?)
}
