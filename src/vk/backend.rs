use super::{
    frame_control::FrameControl,
    memory::Memory,
    pipelines,
    targets::{RenderTargets, ShadowCube, TargetFormats},
    util,
    window::VkWindow,
};
use crate::{
    renderer::{DrawCall, Geometry, Pass, RenderBackend, Target, TextureRef},
    shader::{ProgramId, UniformTable},
    texture::{TextureData, TextureFormat},
    types::{MeshHandle, TextureId, SHADOW_SIZE},
    um_error::UmError,
    vertex::{
        OverlayVertex, PointVertex, QuadVertex, Vertex, FULLSCREEN_QUAD,
    },
};
use log::{debug, error, info, trace};
use std::{sync::Arc, time::Instant};
use vulkano::{
    buffer::{
        Buffer, BufferContents, BufferCreateInfo, BufferUsage, Subbuffer,
    },
    command_buffer::{
        AutoCommandBufferBuilder, CopyBufferToImageInfo, CopyImageInfo,
        PrimaryAutoCommandBuffer, RenderingAttachmentInfo, RenderingInfo,
    },
    descriptor_set::{PersistentDescriptorSet, WriteDescriptorSet},
    format::Format,
    image::{
        sampler::{Filter, Sampler, SamplerAddressMode, SamplerCreateInfo},
        view::ImageView,
        Image, ImageCreateInfo, ImageUsage,
    },
    memory::allocator::{
        AllocationCreateInfo, MemoryAllocator, MemoryTypeFilter,
    },
    pipeline::{GraphicsPipeline, Pipeline, PipelineBindPoint},
    render_pass::{AttachmentLoadOp, AttachmentStoreOp},
    swapchain::{
        acquire_next_image, Swapchain, SwapchainAcquireFuture,
        SwapchainCreateInfo, SwapchainPresentInfo,
    },
    sync::GpuFuture,
    DeviceSize, Validated, VulkanError,
};
use winit::window::Window;

struct GpuMesh {
    vertices: Subbuffer<[Vertex]>,
    indices: Subbuffer<[u32]>,
    index_count: u32,
}

struct Program {
    pipeline: Arc<GraphicsPipeline>,
    /// Programs without a uniform block have nothing at binding 0
    has_block: bool,
}

/// Vertex input of one draw, resolved before recording
enum Bound {
    Indexed(Subbuffer<[Vertex]>, Subbuffer<[u32]>, u32),
    Points(Subbuffer<[PointVertex]>),
    Strip(Subbuffer<[QuadVertex]>),
    List(Subbuffer<[OverlayVertex]>, u32),
}

/// A frame between `begin_frame` and `end_frame`
struct Frame {
    cbb: AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
    image_index: u32,
    acquire_future: SwapchainAcquireFuture,
    started: Instant,
}

/// `RenderBackend` on vulkano with dynamic rendering
pub struct VkBackend {
    window: VkWindow,
    memory: Memory,
    formats: TargetFormats,
    swapchain: Arc<Swapchain>,
    swapchain_views: Vec<Arc<ImageView>>,
    targets: RenderTargets,
    shadow: ShadowCube,
    programs: Vec<Option<Program>>,
    meshes: Vec<GpuMesh>,
    textures: Vec<Arc<ImageView>>,
    quad: Subbuffer<[QuadVertex]>,
    /// Repeating, for textures loaded from files
    texture_sampler: Arc<Sampler>,
    /// Clamped, for render targets
    target_sampler: Arc<Sampler>,
    dimensions: [u32; 2],
    recreate_swapchain: bool,
    frame_control: FrameControl,
    frame: Option<Frame>,
}

impl VkBackend {
    /// Creates the swapchain, every render target and the samplers.
    /// Pipelines are created later through `load_program`.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn new(window: VkWindow, vsync: bool) -> Result<Self, UmError> {
        let memory = Memory::new(window.device());
        let physical = window.physical().clone();

        // The swapchain is sRGB so tone mapped output can stay linear
        let swapchain_format = util::find_swapchain_format(
            &physical,
            window.surface(),
            &[Format::B8G8R8A8_SRGB, Format::R8G8B8A8_SRGB],
        )?;
        let (swapchain, images) = util::create_swapchain(
            &window,
            swapchain_format,
            util::choose_present_mode(&window, vsync),
        )?;
        let swapchain_views = util::create_image_views(&images)?;

        let formats = TargetFormats {
            hdr: util::find_colour_format(
                &physical,
                &[Format::R16G16B16A16_SFLOAT, Format::R32G32B32A32_SFLOAT],
            )?,
            albedo: util::find_colour_format(
                &physical,
                &[Format::R8G8B8A8_UNORM, Format::B8G8R8A8_UNORM],
            )?,
            single: util::find_colour_format(
                &physical,
                &[Format::R16_SFLOAT, Format::R32_SFLOAT],
            )?,
            depth: util::find_depth_format(
                &physical,
                &[Format::D32_SFLOAT, Format::D16_UNORM],
            )?,
            swapchain: swapchain_format,
        };
        debug!("Render target formats {formats:?}");

        let allocator: Arc<dyn MemoryAllocator> =
            memory.memory_allocator.clone();
        let dimensions = window.dimensions();
        let targets = RenderTargets::new(&allocator, dimensions, &formats)?;
        let shadow = ShadowCube::new(&allocator, formats.depth)?;
        let quad = Buffer::from_iter(
            allocator,
            BufferCreateInfo {
                usage: BufferUsage::VERTEX_BUFFER,
                ..Default::default()
            },
            AllocationCreateInfo {
                memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                    | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                ..Default::default()
            },
            FULLSCREEN_QUAD,
        )?;

        let sampler = |address_mode| {
            Sampler::new(
                window.device().clone(),
                SamplerCreateInfo {
                    mag_filter: Filter::Linear,
                    min_filter: Filter::Linear,
                    address_mode: [address_mode; 3],
                    ..Default::default()
                },
            )
        };
        let texture_sampler = sampler(SamplerAddressMode::Repeat)?;
        let target_sampler = sampler(SamplerAddressMode::ClampToEdge)?;

        info!(
            "Vulkan backend ready at {}x{}",
            dimensions[0], dimensions[1]
        );
        Ok(Self {
            window,
            memory,
            formats,
            swapchain,
            swapchain_views,
            targets,
            shadow,
            programs: ProgramId::ALL.iter().map(|_| None).collect(),
            meshes: Vec::new(),
            textures: Vec::new(),
            quad,
            texture_sampler,
            target_sampler,
            dimensions,
            recreate_swapchain: false,
            frame_control: FrameControl::default(),
            frame: None,
        })
    }

    #[must_use]
    pub const fn window(&self) -> &Arc<Window> {
        self.window.window()
    }

    #[must_use]
    pub const fn formats(&self) -> &TargetFormats {
        &self.formats
    }

    /// Frames submitted so far
    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.frame_control.frame_count()
    }

    fn allocator(&self) -> Arc<dyn MemoryAllocator> {
        self.memory.memory_allocator.clone()
    }

    fn frame_mut(
        &mut self,
        source: &'static str,
    ) -> Result<&mut Frame, UmError> {
        self.frame
            .as_mut()
            .ok_or_else(|| UmError::invalid_state("no frame started", source))
    }

    fn recreate(&mut self) -> Result<(), UmError> {
        let (swapchain, images) =
            self.swapchain.recreate(SwapchainCreateInfo {
                image_extent: self.window.dimensions(),
                ..self.swapchain.create_info()
            })?;
        self.swapchain = swapchain;
        self.swapchain_views = util::create_image_views(&images)?;
        self.recreate_swapchain = false;
        debug!("Swapchain recreated");
        Ok(())
    }

    fn upload<T, I>(
        &self,
        usage: BufferUsage,
        data: I,
    ) -> Result<Subbuffer<[T]>, UmError>
    where
        T: BufferContents,
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        Ok(Buffer::from_iter(
            self.allocator(),
            BufferCreateInfo {
                usage,
                ..Default::default()
            },
            AllocationCreateInfo {
                memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                    | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                ..Default::default()
            },
            data,
        )?)
    }

    /// Per draw vertices from the frame arena
    fn transient<T: BufferContents + Copy>(
        &self,
        data: &[T],
    ) -> Result<Subbuffer<[T]>, UmError> {
        let len = DeviceSize::try_from(data.len()).map_err(|_| {
            UmError::invalid_parameter("too many vertices", "transient")
        })?;
        let buffer = self.memory.vertex_allocator.allocate_slice::<T>(len)?;
        buffer.write()?.copy_from_slice(data);
        Ok(buffer)
    }

    fn sampled_view(
        &self,
        texture: TextureRef,
    ) -> Result<(Arc<ImageView>, Arc<Sampler>), UmError> {
        Ok(match texture {
            TextureRef::Texture(id) => (
                self.textures
                    .get(id.0)
                    .ok_or_else(|| {
                        UmError::invalid_parameter(
                            format!("unknown texture {}", id.0),
                            "VkBackend::draw",
                        )
                    })?
                    .clone(),
                self.texture_sampler.clone(),
            ),
            TextureRef::Target(Target::ShadowCube) => {
                (self.shadow.cube.clone(), self.target_sampler.clone())
            }
            TextureRef::Target(t) => {
                (self.targets.view(t)?.clone(), self.target_sampler.clone())
            }
        })
    }

    fn descriptor_set(
        &self,
        program: &Program,
        call: &DrawCall,
    ) -> Result<Option<Arc<PersistentDescriptorSet>>, UmError> {
        let Some(layout) = program.pipeline.layout().set_layouts().first()
        else {
            return Ok(None);
        };
        let mut writes = Vec::with_capacity(call.textures.len() + 1);
        if program.has_block {
            let len = DeviceSize::try_from(call.uniforms.len()).map_err(
                |_| UmError::invalid_parameter("block too large", "draw"),
            )?;
            let block =
                self.memory.uniform_allocator.allocate_slice::<u8>(len)?;
            block.write()?.copy_from_slice(call.uniforms);
            writes.push(WriteDescriptorSet::buffer(0, block));
        }
        for (binding, texture) in call.textures {
            let (view, sampler) = self.sampled_view(*texture)?;
            writes.push(WriteDescriptorSet::image_view_sampler(
                *binding, view, sampler,
            ));
        }
        Ok(Some(PersistentDescriptorSet::new(
            &self.memory.set_allocator,
            layout.clone(),
            writes,
            [],
        )?))
    }

    fn rendering_info(&self, pass: Pass) -> Result<RenderingInfo, UmError> {
        let t = &self.targets;
        let swapchain = self
            .swapchain_views
            .get(self.frame.as_ref().map_or(0, |f| f.image_index as usize))
            .ok_or_else(|| {
                UmError::invalid_state("no swapchain image", "begin_pass")
            })?;
        let (colours, depth) = match pass {
            Pass::Shadow => {
                let layers = &self.shadow.layers;
                return Ok(RenderingInfo {
                    depth_attachment: Some(depth_info(layers, false)),
                    layer_count: 6,
                    ..Default::default()
                })
            }
            Pass::Geometry => (
                vec![
                    colour_info(&t.g_position, false),
                    colour_info(&t.g_normal, false),
                    colour_info(&t.g_albedo_spec, false),
                ],
                Some(depth_info(&t.depth, false)),
            ),
            Pass::Ssao => (vec![colour_info(&t.ssao, false)], None),
            Pass::SsaoBlur => (vec![colour_info(&t.ssao_blur, false)], None),
            Pass::Lighting => (
                vec![
                    colour_info(&t.hdr, false),
                    colour_info(&t.bright, false),
                ],
                None,
            ),
            Pass::Forward => (
                vec![colour_info(&t.hdr, true), colour_info(&t.bright, true)],
                Some(depth_info(&t.forward_depth, true)),
            ),
            Pass::Blur(n) => (
                vec![colour_info(t.view(Target::PingPong(n))?, false)],
                None,
            ),
            Pass::Composite => (vec![colour_info(swapchain, false)], None),
            Pass::Overlay => (vec![colour_info(swapchain, true)], None),
        };
        Ok(RenderingInfo {
            color_attachments: colours.into_iter().map(Some).collect(),
            depth_attachment: depth,
            ..Default::default()
        })
    }
}

/// Clears unless `load`, which keeps what an earlier pass wrote
fn colour_info(view: &Arc<ImageView>, load: bool) -> RenderingAttachmentInfo {
    RenderingAttachmentInfo {
        load_op: if load {
            AttachmentLoadOp::Load
        } else {
            AttachmentLoadOp::Clear
        },
        store_op: AttachmentStoreOp::Store,
        clear_value: (!load).then_some([0.0f32, 0.0, 0.0, 1.0].into()),
        ..RenderingAttachmentInfo::image_view(view.clone())
    }
}

fn depth_info(view: &Arc<ImageView>, load: bool) -> RenderingAttachmentInfo {
    RenderingAttachmentInfo {
        load_op: if load {
            AttachmentLoadOp::Load
        } else {
            AttachmentLoadOp::Clear
        },
        store_op: AttachmentStoreOp::Store,
        clear_value: (!load).then_some(1f32.into()),
        ..RenderingAttachmentInfo::image_view(view.clone())
    }
}

const fn vk_format(format: TextureFormat) -> Format {
    match format {
        TextureFormat::Rgba8Srgb => Format::R8G8B8A8_SRGB,
        TextureFormat::Rgba8Unorm => Format::R8G8B8A8_UNORM,
        TextureFormat::Rgba32Float => Format::R32G32B32A32_SFLOAT,
    }
}

impl RenderBackend for VkBackend {
    fn load_program(
        &mut self,
        id: ProgramId,
        table: &UniformTable,
    ) -> Result<(), UmError> {
        let pipeline =
            pipelines::create(self.window.device(), id, &self.formats)?;
        self.programs[id.index()] = Some(Program {
            pipeline,
            has_block: table.block_size() > 0,
        });
        debug!("Pipeline created for {}", id.name());
        Ok(())
    }

    fn create_mesh(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<MeshHandle, UmError> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(UmError::invalid_parameter(
                "empty mesh",
                "VkBackend::create_mesh",
            ));
        }
        let index_count = u32::try_from(indices.len()).map_err(|_| {
            UmError::invalid_parameter(
                "too many indices",
                "VkBackend::create_mesh",
            )
        })?;
        let mesh = GpuMesh {
            vertices: self
                .upload(BufferUsage::VERTEX_BUFFER, vertices.iter().copied())?,
            indices: self
                .upload(BufferUsage::INDEX_BUFFER, indices.iter().copied())?,
            index_count,
        };
        self.meshes.push(mesh);
        Ok(MeshHandle(self.meshes.len() - 1))
    }

    fn create_texture(
        &mut self,
        data: &TextureData,
    ) -> Result<TextureId, UmError> {
        if !data.is_consistent() || data.width == 0 || data.height == 0 {
            return Err(UmError::invalid_parameter(
                format!(
                    "{} bytes for a {}x{} {:?} texture",
                    data.pixels.len(),
                    data.width,
                    data.height,
                    data.format
                ),
                "VkBackend::create_texture",
            ));
        }
        let staging = Buffer::from_iter(
            self.allocator(),
            BufferCreateInfo {
                usage: BufferUsage::TRANSFER_SRC,
                ..Default::default()
            },
            AllocationCreateInfo {
                memory_type_filter: MemoryTypeFilter::PREFER_HOST
                    | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                ..Default::default()
            },
            data.pixels.iter().copied(),
        )?;
        let image = Image::new(
            self.allocator(),
            ImageCreateInfo {
                format: vk_format(data.format),
                extent: [data.width, data.height, 1],
                usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
                ..Default::default()
            },
            AllocationCreateInfo::default(),
        )?;
        let mut cbb = util::create_primary_cbb(
            &self.memory.command_buffer_allocator,
            self.window.graphics_queue(),
        )?;
        cbb.copy_buffer_to_image(CopyBufferToImageInfo::buffer_image(
            staging,
            image.clone(),
        ))?;
        util::submit_and_wait(cbb, self.window.graphics_queue().clone())?;
        self.textures.push(ImageView::new_default(image)?);
        Ok(TextureId(self.textures.len() - 1))
    }

    fn begin_frame(&mut self) -> Result<(), UmError> {
        // Minimised
        let dimensions = self.window.dimensions();
        if dimensions.contains(&0) {
            return Err(UmError::SwapchainOutOfDate);
        }
        self.frame_control.cleanup_finished();
        if dimensions != self.dimensions {
            self.resize(dimensions)?;
        }
        if self.recreate_swapchain {
            self.recreate()?;
        }

        let (image_index, suboptimal, acquire_future) =
            match acquire_next_image(self.swapchain.clone(), None) {
                Ok(r) => r,
                Err(Validated::Error(VulkanError::OutOfDate)) => {
                    debug!("acquire_next_image says swapchain is out of date");
                    self.recreate_swapchain = true;
                    return Err(UmError::SwapchainOutOfDate);
                }
                Err(e) => return Err(e.into()),
            };
        if suboptimal {
            debug!("recreate_swapchain for suboptimal");
            self.recreate_swapchain = true;
        }

        let cbb = util::create_primary_cbb(
            &self.memory.command_buffer_allocator,
            self.window.graphics_queue(),
        )?;
        self.frame = Some(Frame {
            cbb,
            image_index,
            acquire_future,
            started: Instant::now(),
        });
        Ok(())
    }

    fn begin_pass(&mut self, pass: Pass) -> Result<(), UmError> {
        let info = self.rendering_info(pass)?;
        let extent = if pass == Pass::Shadow {
            [SHADOW_SIZE, SHADOW_SIZE]
        } else {
            self.dimensions
        };
        let viewports = std::iter::once(util::viewport(extent)).collect();
        let frame = self.frame_mut("VkBackend::begin_pass")?;
        frame.cbb.begin_rendering(info)?.set_viewport(0, viewports)?;
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), UmError> {
        let program = self
            .programs
            .get(call.program.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                UmError::invalid_state(
                    format!("{} was never loaded", call.program.name()),
                    "VkBackend::draw",
                )
            })?;
        let pipeline = program.pipeline.clone();
        let set = self.descriptor_set(program, call)?;

        // Vertex data first, the command buffer borrow comes last
        let bound = match &call.geometry {
            Geometry::Mesh(handle) => {
                let mesh = self.meshes.get(handle.0).ok_or_else(|| {
                    UmError::invalid_parameter(
                        format!("unknown mesh {}", handle.0),
                        "VkBackend::draw",
                    )
                })?;
                Bound::Indexed(
                    mesh.vertices.clone(),
                    mesh.indices.clone(),
                    mesh.index_count,
                )
            }
            Geometry::Point(position) => Bound::Points(
                self.transient(&[PointVertex {
                    position: *position,
                }])?,
            ),
            Geometry::FullscreenQuad => Bound::Strip(self.quad.clone()),
            Geometry::Quads(vertices) => {
                let count = u32::try_from(vertices.len()).map_err(|_| {
                    UmError::invalid_parameter(
                        "too many vertices",
                        "VkBackend::draw",
                    )
                })?;
                Bound::List(self.transient(vertices)?, count)
            }
        };

        let cbb = &mut self.frame_mut("VkBackend::draw")?.cbb;
        cbb.bind_pipeline_graphics(pipeline.clone())?;
        if let Some(set) = set {
            cbb.bind_descriptor_sets(
                PipelineBindPoint::Graphics,
                pipeline.layout().clone(),
                0,
                set,
            )?;
        }
        match bound {
            Bound::Indexed(vertices, indices, count) => {
                cbb.bind_vertex_buffers(0, vertices)?
                    .bind_index_buffer(indices)?
                    .draw_indexed(count, 1, 0, 0, 0)?;
            }
            Bound::Points(points) => {
                cbb.bind_vertex_buffers(0, points)?.draw(1, 1, 0, 0)?;
            }
            Bound::Strip(quad) => {
                let count = u32::try_from(FULLSCREEN_QUAD.len()).unwrap_or(4);
                cbb.bind_vertex_buffers(0, quad)?.draw(count, 1, 0, 0)?;
            }
            Bound::List(vertices, count) => {
                cbb.bind_vertex_buffers(0, vertices)?.draw(count, 1, 0, 0)?;
            }
        }
        Ok(())
    }

    fn end_pass(&mut self) -> Result<(), UmError> {
        self.frame_mut("VkBackend::end_pass")?.cbb.end_rendering()?;
        Ok(())
    }

    fn copy_depth(&mut self) -> Result<(), UmError> {
        let info = CopyImageInfo::images(
            self.targets.depth.image().clone(),
            self.targets.forward_depth.image().clone(),
        );
        self.frame_mut("VkBackend::copy_depth")?.cbb.copy_image(info)?;
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), UmError> {
        let Some(frame) = self.frame.take() else {
            return Err(UmError::invalid_state(
                "no frame started",
                "VkBackend::end_frame",
            ));
        };
        let command_buffer = frame.cbb.build()?;
        let queue = self.window.graphics_queue().clone();
        let previous = self.frame_control.take().unwrap_or_else(|| {
            vulkano::sync::now(self.window.device().clone()).boxed()
        });
        let after = previous
            .join(frame.acquire_future)
            .then_execute(queue.clone(), command_buffer)?
            .then_swapchain_present(
                queue,
                SwapchainPresentInfo::swapchain_image_index(
                    self.swapchain.clone(),
                    frame.image_index,
                ),
            )
            .then_signal_fence_and_flush();

        let fence = match after {
            Ok(future) => Some(future.boxed()),
            Err(Validated::Error(VulkanError::OutOfDate)) => {
                debug!("present says swapchain is out of date");
                self.recreate_swapchain = true;
                None
            }
            Err(e) => {
                error!("Could not flush frame: {e:?}");
                self.frame_control.update(None);
                return Err(e.into());
            }
        };
        self.frame_control.update(fence);
        trace!("frame recorded and submitted in {:?}", frame.started.elapsed());
        Ok(())
    }

    fn resize(&mut self, dimensions: [u32; 2]) -> Result<(), UmError> {
        if dimensions.contains(&0) || dimensions == self.dimensions {
            return Ok(());
        }
        self.targets =
            RenderTargets::new(&self.allocator(), dimensions, &self.formats)?;
        self.dimensions = dimensions;
        self.recreate_swapchain = true;
        debug!("Render targets resized to {}x{}", dimensions[0], dimensions[1]);
        Ok(())
    }

    fn dimensions(&self) -> [u32; 2] {
        self.dimensions
    }
}
