//! Format selection, swapchain creation and command buffer helpers
use super::window::VkWindow;
use crate::um_error::UmError;
use std::sync::Arc;
use vulkano::{
    command_buffer::{
        allocator::StandardCommandBufferAllocator, AutoCommandBufferBuilder,
        CommandBufferUsage, PrimaryAutoCommandBuffer,
        PrimaryCommandBufferAbstract,
    },
    device::{physical::PhysicalDevice, Queue},
    format::{Format, FormatFeatures},
    image::{view::ImageView, Image, ImageUsage},
    pipeline::graphics::{
        color_blend::{
            AttachmentBlend, BlendFactor, BlendOp, ColorBlendAttachmentState,
        },
        viewport::Viewport,
    },
    swapchain::{
        ColorSpace, PresentMode, Surface, SurfaceInfo, Swapchain,
        SwapchainCreateInfo,
    },
    sync::GpuFuture,
};

/// Selects the first candidate usable as a depth attachment
///
/// # Errors
/// May return `UmError`
pub fn find_depth_format(
    physical: &PhysicalDevice,
    candidates: &[Format],
) -> Result<Format, UmError> {
    for candidate in candidates {
        if physical
            .format_properties(*candidate)?
            .optimal_tiling_features
            .intersects(FormatFeatures::DEPTH_STENCIL_ATTACHMENT)
        {
            return Ok(*candidate);
        }
    }
    Err(UmError::render_engine(
        "no supported depth format",
        "find_depth_format",
    ))
}

/// Selects the first candidate usable both as a colour attachment and a
/// linearly filtered texture
///
/// # Errors
/// May return `UmError`
pub fn find_colour_format(
    physical: &PhysicalDevice,
    candidates: &[Format],
) -> Result<Format, UmError> {
    for candidate in candidates {
        let features =
            physical.format_properties(*candidate)?.optimal_tiling_features;
        if features.intersects(FormatFeatures::COLOR_ATTACHMENT)
            && features.intersects(FormatFeatures::SAMPLED_IMAGE_FILTER_LINEAR)
        {
            return Ok(*candidate);
        }
    }
    Err(UmError::render_engine(
        format!("none of {candidates:?} is a usable colour format"),
        "find_colour_format",
    ))
}

/// Selects the first candidate the surface can present in sRGB
///
/// # Errors
/// May return `UmError`
pub fn find_swapchain_format(
    physical: &PhysicalDevice,
    surface: &Surface,
    candidates: &[Format],
) -> Result<Format, UmError> {
    let formats =
        physical.surface_formats(surface, SurfaceInfo::default())?;
    candidates
        .iter()
        .find(|c| {
            formats
                .iter()
                .any(|f| f.0 == **c && f.1 == ColorSpace::SrgbNonLinear)
        })
        .copied()
        .ok_or_else(|| {
            UmError::render_engine(
                "no supported swapchain format",
                "find_swapchain_format",
            )
        })
}

/// Fifo is the only mode Vulkan guarantees, so it is also the fallback
#[must_use]
pub fn choose_present_mode(window: &VkWindow, vsync: bool) -> PresentMode {
    if vsync {
        return PresentMode::Fifo;
    }
    window
        .physical()
        .surface_present_modes(window.surface(), SurfaceInfo::default())
        .map_or(PresentMode::Fifo, |mut modes| {
            modes
                .find(|&m| m == PresentMode::Immediate)
                .unwrap_or(PresentMode::Fifo)
        })
}

/// # Errors
/// May return `UmError`
pub fn create_swapchain(
    window: &VkWindow,
    format: Format,
    present_mode: PresentMode,
) -> Result<(Arc<Swapchain>, Vec<Arc<Image>>), UmError> {
    let surface_caps = window.surface_caps()?;
    let min_image_count = surface_caps
        .max_image_count
        .map_or(surface_caps.min_image_count + 1, |max| {
            (surface_caps.min_image_count + 1).min(max)
        });
    Ok(Swapchain::new(
        window.device().clone(),
        window.surface().clone(),
        SwapchainCreateInfo {
            min_image_count,
            image_format: format,
            image_extent: window.dimensions(),
            image_color_space: ColorSpace::SrgbNonLinear,
            present_mode,
            image_usage: ImageUsage::COLOR_ATTACHMENT,
            ..Default::default()
        },
    )?)
}

/// # Errors
/// May return `UmError`
pub fn create_image_views(
    images: &[Arc<Image>],
) -> Result<Vec<Arc<ImageView>>, UmError> {
    let mut ret = Vec::with_capacity(images.len());
    for image in images {
        ret.push(ImageView::new_default(image.clone())?);
    }
    Ok(ret)
}

/// # Errors
/// May return `UmError`
pub fn create_primary_cbb(
    cmd_allocator: &StandardCommandBufferAllocator,
    queue: &Queue,
) -> Result<AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>, UmError> {
    Ok(AutoCommandBufferBuilder::primary(
        cmd_allocator,
        queue.queue_family_index(),
        CommandBufferUsage::OneTimeSubmit,
    )?)
}

/// Builds and submits a command buffer, then blocks until the GPU is done.
/// Used for uploads outside the frame.
///
/// # Errors
/// May return `UmError`
pub fn submit_and_wait(
    cbb: AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
    queue: Arc<Queue>,
) -> Result<(), UmError> {
    cbb.build()?
        .execute(queue)?
        .then_signal_fence_and_flush()?
        .wait(None)?;
    Ok(())
}

/// Standard non-premultiplied alpha blending
#[must_use]
pub fn alpha_blend() -> ColorBlendAttachmentState {
    ColorBlendAttachmentState {
        blend: Some(AttachmentBlend {
            src_color_blend_factor: BlendFactor::SrcAlpha,
            dst_color_blend_factor: BlendFactor::OneMinusSrcAlpha,
            color_blend_op: BlendOp::Add,
            src_alpha_blend_factor: BlendFactor::One,
            dst_alpha_blend_factor: BlendFactor::Zero,
            alpha_blend_op: BlendOp::Add,
        }),
        ..Default::default()
    }
}

#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn viewport(dimensions: [u32; 2]) -> Viewport {
    Viewport {
        offset: [0.0, 0.0],
        extent: [dimensions[0] as f32, dimensions[1] as f32],
        depth_range: 0.0..=1.0,
    }
}
