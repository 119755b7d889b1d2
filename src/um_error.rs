use std::{error, fmt, panic::Location};
use vulkano::{
    buffer::AllocateBufferError, command_buffer::CommandBufferExecError,
    image::AllocateImageError, library::LoadingError,
    memory::allocator::MemoryAllocatorError,
    pipeline::layout::IntoPipelineLayoutCreateInfoError, sync::HostAccessError,
    Validated, ValidationError, VulkanError,
};
use winit::error::OsError;

/// Error categories with stable numeric codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FileNotFound = 1,
    SystemError = 2,
    ResourceError = 3,
    RenderEngineError = 4,
    InvalidState = 5,
    InvalidParameter = 6,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FileNotFound => "FileNotFound",
            Self::SystemError => "SystemError",
            Self::ResourceError => "ResourceError",
            Self::RenderEngineError => "RenderEngineError",
            Self::InvalidState => "InvalidState",
            Self::InvalidParameter => "InvalidParameter",
        }
    }
}

/// Where an error was raised: a description, the operation that raised it
/// and the caller location
#[derive(Debug)]
pub struct ErrorSite {
    pub descr: String,
    pub source: &'static str,
    pub location: &'static Location<'static>,
}

impl fmt::Display for ErrorSite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} in {} at {}:{}",
            self.descr,
            self.source,
            self.location.file(),
            self.location.line()
        )
    }
}

/// Unified error type
///
/// The first group of variants is the crate's own taxonomy. They are built
/// with the `#[track_caller]` constructors so the report names the file and
/// line of the failing call.
///
/// The second group wraps errors from other crates. Some vulkano error types
/// are very large so are boxed. Vulkano's `Validated` wrapper converts
/// directly, with the validation half becoming `VkValidationError`, so
/// validation failures propagate instead of panicking.
#[derive(Debug)]
pub enum UmError {
    FileNotFound(ErrorSite),
    SystemError(ErrorSite),
    ResourceError(ErrorSite),
    RenderEngineError(ErrorSite),
    InvalidState(ErrorSite),
    InvalidParameter(ErrorSite),
    NoSuchAnimation {
        model: String,
        clip: String,
        location: &'static Location<'static>,
    },
    SwapchainOutOfDate,
    WinitOsError(OsError),
    SerdeYamlError(Box<serde_yaml::Error>),
    StdIoError(std::io::Error),
    ImageImageError(Box<image::error::ImageError>),
    GltfError(Box<gltf::Error>),
    ImportError(crate::mesh_import::ImportError),
    VkVulkanError(VulkanError),
    VkValidationError(Box<ValidationError>),
    VkLoadingError(Box<LoadingError>),
    VkCommandBufferExecError(Box<CommandBufferExecError>),
    VkMemoryAllocatorError(MemoryAllocatorError),
    VkAllocateBufferError(AllocateBufferError),
    VkAllocateImageError(AllocateImageError),
    VkHostAccessError(HostAccessError),
    VkIntoPipelineLayoutCreateInfoError(IntoPipelineLayoutCreateInfoError),
}

fn site(
    descr: impl Into<String>,
    source: &'static str,
    location: &'static Location<'static>,
) -> ErrorSite {
    ErrorSite {
        descr: descr.into(),
        source,
        location,
    }
}

impl UmError {
    #[track_caller]
    pub fn file_not_found(
        descr: impl Into<String>,
        source: &'static str,
    ) -> Self {
        Self::FileNotFound(site(descr, source, Location::caller()))
    }

    #[track_caller]
    pub fn system(descr: impl Into<String>, source: &'static str) -> Self {
        Self::SystemError(site(descr, source, Location::caller()))
    }

    #[track_caller]
    pub fn resource(descr: impl Into<String>, source: &'static str) -> Self {
        Self::ResourceError(site(descr, source, Location::caller()))
    }

    #[track_caller]
    pub fn render_engine(
        descr: impl Into<String>,
        source: &'static str,
    ) -> Self {
        Self::RenderEngineError(site(descr, source, Location::caller()))
    }

    #[track_caller]
    pub fn invalid_state(
        descr: impl Into<String>,
        source: &'static str,
    ) -> Self {
        Self::InvalidState(site(descr, source, Location::caller()))
    }

    #[track_caller]
    pub fn invalid_parameter(
        descr: impl Into<String>,
        source: &'static str,
    ) -> Self {
        Self::InvalidParameter(site(descr, source, Location::caller()))
    }

    #[track_caller]
    pub fn no_such_animation(
        model: impl Into<String>,
        clip: impl Into<String>,
    ) -> Self {
        Self::NoSuchAnimation {
            model: model.into(),
            clip: clip.into(),
            location: Location::caller(),
        }
    }

    /// Taxonomy category. Wrapped I/O errors count as missing files when
    /// that is what they are; other wrapped errors map to the category of
    /// the layer that produced them.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::SystemError(_) | Self::WinitOsError(_) => {
                ErrorKind::SystemError
            }
            Self::StdIoError(e) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ErrorKind::FileNotFound
                } else {
                    ErrorKind::SystemError
                }
            }
            Self::ResourceError(_)
            | Self::SerdeYamlError(_)
            | Self::ImageImageError(_)
            | Self::GltfError(_)
            | Self::ImportError(_) => ErrorKind::ResourceError,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::InvalidParameter(_) | Self::NoSuchAnimation { .. } => {
                ErrorKind::InvalidParameter
            }
            _ => ErrorKind::RenderEngineError,
        }
    }
}

impl error::Error for UmError {}

impl fmt::Display for UmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::FileNotFound(s)
            | Self::SystemError(s)
            | Self::ResourceError(s)
            | Self::RenderEngineError(s)
            | Self::InvalidState(s)
            | Self::InvalidParameter(s) => {
                write!(f, "{}: {s}", self.kind().name())
            }
            Self::NoSuchAnimation {
                model,
                clip,
                location,
            } => write!(
                f,
                "InvalidParameter: no such animation '{clip}' for model \
                 '{model}' in start_animation at {}:{}",
                location.file(),
                location.line()
            ),
            Self::SwapchainOutOfDate => {
                write!(f, "swapchain out of date, try recreating")
            }
            Self::WinitOsError(e) => write!(f, "OsError {e}"),
            Self::SerdeYamlError(e) => write!(f, "serde_yaml::Error: {e}"),
            Self::StdIoError(e) => write!(f, "std::io::Error: {e}"),
            Self::ImageImageError(e) => {
                write!(f, "image crate ImageError: {e}")
            }
            Self::GltfError(e) => write!(f, "gltf Error: {e}"),
            Self::ImportError(e) => write!(f, "import error: {e}"),
            Self::VkVulkanError(e) => write!(f, "vulkano VulkanError: {e}"),
            Self::VkValidationError(e) => {
                write!(f, "vulkano ValidationError: {e}")
            }
            Self::VkLoadingError(e) => write!(f, "vulkano LoadingError: {e}"),
            Self::VkCommandBufferExecError(e) => {
                write!(f, "vulkano CommandBufferExecError: {e}")
            }
            Self::VkMemoryAllocatorError(e) => {
                write!(f, "vulkano MemoryAllocatorError: {e}")
            }
            Self::VkAllocateBufferError(e) => {
                write!(f, "vulkano AllocateBufferError: {e}")
            }
            Self::VkAllocateImageError(e) => {
                write!(f, "vulkano AllocateImageError: {e}")
            }
            Self::VkHostAccessError(e) => {
                write!(f, "vulkano HostAccessError: {e}")
            }
            Self::VkIntoPipelineLayoutCreateInfoError(e) => {
                write!(f, "vulkano IntoPipelineLayoutCreateInfoError: {e}")
            }
        }
    }
}

impl From<serde_yaml::Error> for UmError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::SerdeYamlError(Box::new(e))
    }
}

impl From<std::io::Error> for UmError {
    fn from(e: std::io::Error) -> Self {
        Self::StdIoError(e)
    }
}

impl From<image::error::ImageError> for UmError {
    fn from(e: image::error::ImageError) -> Self {
        Self::ImageImageError(Box::new(e))
    }
}

impl From<gltf::Error> for UmError {
    fn from(e: gltf::Error) -> Self {
        Self::GltfError(Box::new(e))
    }
}

impl From<crate::mesh_import::ImportError> for UmError {
    fn from(e: crate::mesh_import::ImportError) -> Self {
        Self::ImportError(e)
    }
}

impl From<OsError> for UmError {
    fn from(e: OsError) -> Self {
        Self::WinitOsError(e)
    }
}

impl<E> From<Validated<E>> for UmError
where
    Self: From<E>,
{
    fn from(e: Validated<E>) -> Self {
        match e {
            Validated::Error(e) => e.into(),
            Validated::ValidationError(v) => Self::VkValidationError(v),
        }
    }
}

impl From<Box<ValidationError>> for UmError {
    fn from(e: Box<ValidationError>) -> Self {
        Self::VkValidationError(e)
    }
}

impl From<LoadingError> for UmError {
    fn from(e: LoadingError) -> Self {
        Self::VkLoadingError(Box::new(e))
    }
}

impl From<VulkanError> for UmError {
    fn from(e: VulkanError) -> Self {
        Self::VkVulkanError(e)
    }
}

impl From<CommandBufferExecError> for UmError {
    fn from(e: CommandBufferExecError) -> Self {
        Self::VkCommandBufferExecError(Box::new(e))
    }
}

impl From<MemoryAllocatorError> for UmError {
    fn from(e: MemoryAllocatorError) -> Self {
        Self::VkMemoryAllocatorError(e)
    }
}

impl From<AllocateBufferError> for UmError {
    fn from(e: AllocateBufferError) -> Self {
        Self::VkAllocateBufferError(e)
    }
}

impl From<HostAccessError> for UmError {
    fn from(e: HostAccessError) -> Self {
        Self::VkHostAccessError(e)
    }
}

impl From<AllocateImageError> for UmError {
    fn from(e: AllocateImageError) -> Self {
        Self::VkAllocateImageError(e)
    }
}

impl From<IntoPipelineLayoutCreateInfoError> for UmError {
    fn from(e: IntoPipelineLayoutCreateInfoError) -> Self {
        Self::VkIntoPipelineLayoutCreateInfoError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_kind_source_and_location() {
        let e = UmError::resource("bad texture", "load_texture");
        let text = e.to_string();
        let prefix = "ResourceError: bad texture in load_texture at ";
        assert!(text.starts_with(prefix));
        assert!(text.contains("um_error.rs:"));
        assert_eq!(e.kind().code(), 3);
    }

    #[test]
    fn no_such_animation_is_invalid_parameter() {
        let e = UmError::no_such_animation("knight", "dance");
        assert_eq!(e.kind(), ErrorKind::InvalidParameter);
        let text = e.to_string();
        assert!(text.contains("'dance'"));
        assert!(text.contains("'knight'"));
    }

    #[test]
    fn missing_io_file_maps_to_file_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(UmError::from(io).kind(), ErrorKind::FileNotFound);
    }
}
