use crate::{
    renderer::Target,
    types::SHADOW_SIZE,
    um_error::UmError,
};
use std::sync::Arc;
use vulkano::{
    format::Format,
    image::{
        view::{ImageView, ImageViewCreateInfo, ImageViewType},
        Image, ImageCreateFlags, ImageCreateInfo, ImageUsage,
    },
    memory::allocator::{AllocationCreateInfo, MemoryAllocator},
};

/// Formats of everything the frame graph renders into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetFormats {
    /// Positions, normals and every HDR buffer
    pub hdr: Format,
    pub albedo: Format,
    /// Ambient occlusion factor
    pub single: Format,
    pub depth: Format,
    pub swapchain: Format,
}

/// Size dependent render targets, rebuilt on resize
pub struct RenderTargets {
    pub g_position: Arc<ImageView>,
    pub g_normal: Arc<ImageView>,
    pub g_albedo_spec: Arc<ImageView>,
    pub depth: Arc<ImageView>,
    pub ssao: Arc<ImageView>,
    pub ssao_blur: Arc<ImageView>,
    pub hdr: Arc<ImageView>,
    pub bright: Arc<ImageView>,
    pub ping_pong: [Arc<ImageView>; 2],
    /// Receives a copy of `depth` so billboards are hidden behind walls
    pub forward_depth: Arc<ImageView>,
}

impl RenderTargets {
    /// # Errors
    /// May return `UmError`
    pub fn new(
        allocator: &Arc<dyn MemoryAllocator>,
        dimensions: [u32; 2],
        formats: &TargetFormats,
    ) -> Result<Self, UmError> {
        let colour = |format| create_colour(allocator, dimensions, format);
        let depth_usage = ImageUsage::DEPTH_STENCIL_ATTACHMENT;
        Ok(Self {
            g_position: colour(formats.hdr)?,
            g_normal: colour(formats.hdr)?,
            g_albedo_spec: colour(formats.albedo)?,
            depth: create_depth(
                allocator,
                dimensions,
                formats.depth,
                depth_usage | ImageUsage::TRANSFER_SRC,
            )?,
            ssao: colour(formats.single)?,
            ssao_blur: colour(formats.single)?,
            hdr: colour(formats.hdr)?,
            bright: colour(formats.hdr)?,
            ping_pong: [colour(formats.hdr)?, colour(formats.hdr)?],
            forward_depth: create_depth(
                allocator,
                dimensions,
                formats.depth,
                depth_usage | ImageUsage::TRANSFER_DST,
            )?,
        })
    }

    /// The view a later pass samples for `target`. The shadow cube is not
    /// size dependent so lives in `ShadowCube`.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn view(&self, target: Target) -> Result<&Arc<ImageView>, UmError> {
        Ok(match target {
            Target::GPosition => &self.g_position,
            Target::GNormal => &self.g_normal,
            Target::GAlbedoSpec => &self.g_albedo_spec,
            Target::Ssao => &self.ssao,
            Target::SsaoBlur => &self.ssao_blur,
            Target::Hdr => &self.hdr,
            Target::Bright => &self.bright,
            Target::PingPong(n) => self.ping_pong.get(n).ok_or_else(|| {
                UmError::invalid_parameter(
                    format!("no ping-pong target {n}"),
                    "RenderTargets::view",
                )
            })?,
            Target::ShadowCube => {
                return Err(UmError::invalid_parameter(
                    "shadow cube is not a screen target",
                    "RenderTargets::view",
                ))
            }
        })
    }
}

/// One depth image with six layers. The shadow pass renders it as a 2D
/// array, selecting the face with `gl_Layer`, and lighting samples it as a
/// cube.
pub struct ShadowCube {
    pub layers: Arc<ImageView>,
    pub cube: Arc<ImageView>,
}

impl ShadowCube {
    /// # Errors
    /// May return `UmError`
    pub fn new(
        allocator: &Arc<dyn MemoryAllocator>,
        format: Format,
    ) -> Result<Self, UmError> {
        let image = Image::new(
            allocator.clone(),
            ImageCreateInfo {
                flags: ImageCreateFlags::CUBE_COMPATIBLE,
                format,
                extent: [SHADOW_SIZE, SHADOW_SIZE, 1],
                array_layers: 6,
                usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT
                    | ImageUsage::SAMPLED,
                ..Default::default()
            },
            AllocationCreateInfo::default(),
        )?;
        let layers = ImageView::new(
            image.clone(),
            ImageViewCreateInfo {
                view_type: ImageViewType::Dim2dArray,
                ..ImageViewCreateInfo::from_image(&image)
            },
        )?;
        let cube_info = ImageViewCreateInfo {
            view_type: ImageViewType::Cube,
            ..ImageViewCreateInfo::from_image(&image)
        };
        let cube = ImageView::new(image, cube_info)?;
        Ok(Self { layers, cube })
    }
}

fn create_colour(
    allocator: &Arc<dyn MemoryAllocator>,
    dimensions: [u32; 2],
    format: Format,
) -> Result<Arc<ImageView>, UmError> {
    let image = Image::new(
        allocator.clone(),
        ImageCreateInfo {
            format,
            extent: [dimensions[0], dimensions[1], 1],
            usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED,
            ..Default::default()
        },
        AllocationCreateInfo::default(),
    )?;
    Ok(ImageView::new_default(image)?)
}

fn create_depth(
    allocator: &Arc<dyn MemoryAllocator>,
    dimensions: [u32; 2],
    format: Format,
    usage: ImageUsage,
) -> Result<Arc<ImageView>, UmError> {
    let image = Image::new(
        allocator.clone(),
        ImageCreateInfo {
            format,
            extent: [dimensions[0], dimensions[1], 1],
            usage,
            ..Default::default()
        },
        AllocationCreateInfo::default(),
    )?;
    Ok(ImageView::new_default(image)?)
}
