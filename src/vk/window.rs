use super::validation::DebugMessenger;
use crate::um_error::UmError;
use log::info;
use std::sync::Arc;
use vulkano::{
    device::{
        physical::{PhysicalDevice, PhysicalDeviceType},
        Device, DeviceCreateInfo, DeviceExtensions, Features, Queue,
        QueueCreateInfo, QueueFlags,
    },
    instance::{Instance, InstanceCreateFlags, InstanceCreateInfo},
    swapchain::{Surface, SurfaceCapabilities, SurfaceInfo},
    Validated, VulkanError, VulkanLibrary,
};
use winit::{
    dpi::PhysicalSize,
    event_loop::EventLoop,
    window::{Fullscreen, Window, WindowBuilder},
};

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// How the window is created
#[derive(Clone, Debug)]
pub struct WindowProperties {
    pub dimensions: [u32; 2],
    pub title: String,
    pub fullscreen: bool,
}

impl Default for WindowProperties {
    fn default() -> Self {
        Self {
            dimensions: [800, 600],
            title: "umbra".to_string(),
            fullscreen: false,
        }
    }
}

/// The winit window and the Vulkan objects tied to it
pub struct VkWindow {
    window: Arc<Window>,
    surface: Arc<Surface>,
    physical: Arc<PhysicalDevice>,
    device: Arc<Device>,
    graphics_queue: Arc<Queue>,
    _messenger: Option<DebugMessenger>,
}

impl VkWindow {
    /// Creates the window, a Vulkan 1.3 instance and a device with the
    /// features the frame graph needs. Validation layers are enabled in
    /// debug builds when installed.
    ///
    /// # Errors
    /// May return `UmError`
    pub fn new(
        properties: &WindowProperties,
        event_loop: &EventLoop<()>,
    ) -> Result<Self, UmError> {
        let library = VulkanLibrary::new()?;
        let debug_layers = cfg!(debug_assertions)
            && library
                .layer_properties()?
                .any(|l| l.name() == VALIDATION_LAYER);
        let enabled_extensions = vulkano::instance::InstanceExtensions {
            ext_debug_utils: debug_layers
                && library.supported_extensions().ext_debug_utils,
            ..Surface::required_extensions(event_loop)
        };
        let enabled_layers = if debug_layers {
            vec![VALIDATION_LAYER.to_string()]
        } else {
            Vec::new()
        };
        let instance = Instance::new(
            library,
            InstanceCreateInfo {
                flags: InstanceCreateFlags::ENUMERATE_PORTABILITY,
                enabled_extensions,
                enabled_layers,
                ..Default::default()
            },
        )?;
        let messenger = DebugMessenger::try_new(&instance);

        let mut builder = WindowBuilder::new()
            .with_title(properties.title.clone())
            .with_inner_size(PhysicalSize::new(
                properties.dimensions[0],
                properties.dimensions[1],
            ));
        if properties.fullscreen {
            builder =
                builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = Arc::new(builder.build(event_loop)?);
        let surface = Surface::from_window(instance.clone(), window.clone())?;

        let device_extensions = DeviceExtensions {
            khr_swapchain: true,
            ..DeviceExtensions::empty()
        };
        let (physical, queue_family_index) =
            select_physical(&instance, &surface, &device_extensions)?;
        info!(
            "Using device: {} (type: {:?})",
            physical.properties().device_name,
            physical.properties().device_type,
        );

        let (device, mut queues) = Device::new(
            physical.clone(),
            DeviceCreateInfo {
                enabled_extensions: device_extensions,
                enabled_features: Features {
                    dynamic_rendering: true,
                    synchronization2: true,
                    // Cube shadow and billboard expansion
                    geometry_shader: true,
                    ..Features::empty()
                },
                queue_create_infos: vec![QueueCreateInfo {
                    queue_family_index,
                    ..Default::default()
                }],
                ..Default::default()
            },
        )?;
        info!("Using Vulkan version : {}", device.api_version());
        let graphics_queue = queues.next().ok_or_else(|| {
            UmError::render_engine("no graphics queue", "VkWindow::new")
        })?;

        Ok(Self {
            window,
            surface,
            physical,
            device,
            graphics_queue,
            _messenger: messenger,
        })
    }

    #[must_use]
    pub const fn window(&self) -> &Arc<Window> {
        &self.window
    }

    #[must_use]
    pub const fn surface(&self) -> &Arc<Surface> {
        &self.surface
    }

    #[must_use]
    pub const fn physical(&self) -> &Arc<PhysicalDevice> {
        &self.physical
    }

    #[must_use]
    pub const fn device(&self) -> &Arc<Device> {
        &self.device
    }

    #[must_use]
    pub const fn graphics_queue(&self) -> &Arc<Queue> {
        &self.graphics_queue
    }

    /// # Errors
    /// May return `Validated<VulkanError>`
    pub fn surface_caps(
        &self,
    ) -> Result<SurfaceCapabilities, Validated<VulkanError>> {
        self.physical
            .surface_capabilities(&self.surface, SurfaceInfo::default())
    }

    #[must_use]
    pub fn dimensions(&self) -> [u32; 2] {
        self.window.inner_size().into()
    }
}

/// Picks the device most likely to be fast that supports everything needed,
/// along with a queue family that can both draw and present
fn select_physical(
    instance: &Arc<Instance>,
    surface: &Surface,
    extensions: &DeviceExtensions,
) -> Result<(Arc<PhysicalDevice>, u32), UmError> {
    instance
        .enumerate_physical_devices()?
        .filter(|p| p.api_version() >= vulkano::Version::V1_3)
        .filter(|p| p.supported_extensions().contains(extensions))
        .filter(|p| p.supported_features().geometry_shader)
        .filter_map(|p| {
            p.queue_family_properties()
                .iter()
                .enumerate()
                .position(|(i, q)| {
                    q.queue_flags.intersects(QueueFlags::GRAPHICS)
                        && u32::try_from(i).map_or(false, |i| {
                            p.surface_support(i, surface).unwrap_or(false)
                        })
                })
                .and_then(|i| u32::try_from(i).ok())
                .map(|i| (p, i))
        })
        .min_by_key(|(p, _)| match p.properties().device_type {
            PhysicalDeviceType::DiscreteGpu => 0,
            PhysicalDeviceType::IntegratedGpu => 1,
            PhysicalDeviceType::VirtualGpu => 2,
            PhysicalDeviceType::Cpu => 3,
            _ => 4,
        })
        .ok_or_else(|| {
            UmError::render_engine(
                "no Vulkan 1.3 device with geometry shaders found",
                "VkWindow::new",
            )
        })
}
