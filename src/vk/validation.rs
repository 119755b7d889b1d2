use log::{debug, error, info, warn};
use std::{
    ffi::CStr,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};
use vulkano::{
    instance::{
        debug::{DebugUtilsMessageSeverity, DebugUtilsMessageType},
        Instance,
    },
    VulkanError, VulkanObject,
};

/// Routes validation layer messages into the `log` facade. Messages are only
/// delivered while this is alive.
#[must_use]
pub struct DebugMessenger {
    handle: ash::vk::DebugUtilsMessengerEXT,
    instance: Arc<Instance>,
}

impl DebugMessenger {
    /// Returns `None` when the instance was created without
    /// `ext_debug_utils`, in which case there is nothing to route
    pub fn try_new(instance: &Arc<Instance>) -> Option<Self> {
        if !instance.enabled_extensions().ext_debug_utils {
            return None;
        }
        match unsafe { Self::new_unchecked(instance.clone()) } {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("Could not create debug messenger: {e}");
                None
            }
        }
    }

    // Goes through ash directly so the callback never touches the optional
    // label and object pointers in the callback data, some of which may be
    // null
    unsafe fn new_unchecked(
        instance: Arc<Instance>,
    ) -> Result<Self, VulkanError> {
        let message_severity = DebugUtilsMessageSeverity::ERROR
            | DebugUtilsMessageSeverity::WARNING
            | DebugUtilsMessageSeverity::INFO
            | DebugUtilsMessageSeverity::VERBOSE;
        let message_type = DebugUtilsMessageType::GENERAL
            | DebugUtilsMessageType::VALIDATION
            | DebugUtilsMessageType::PERFORMANCE;

        let create_info_vk = ash::vk::DebugUtilsMessengerCreateInfoEXT {
            flags: ash::vk::DebugUtilsMessengerCreateFlagsEXT::empty(),
            message_severity: message_severity.into(),
            message_type: message_type.into(),
            pfn_user_callback: Some(log_callback),
            p_user_data: std::ptr::null_mut(),
            ..Default::default()
        };

        let handle = {
            let fns = instance.fns();
            let mut output = std::mem::MaybeUninit::uninit();
            (fns.ext_debug_utils.create_debug_utils_messenger_ext)(
                instance.handle(),
                &create_info_vk,
                std::ptr::null(),
                output.as_mut_ptr(),
            )
            .result()
            .map_err(VulkanError::from)?;
            output.assume_init()
        };

        Ok(Self { handle, instance })
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        unsafe {
            let fns = self.instance.fns();
            (fns.ext_debug_utils.destroy_debug_utils_messenger_ext)(
                self.instance.handle(),
                self.handle,
                std::ptr::null(),
            );
        }
    }
}

unsafe extern "system" fn log_callback(
    message_severity_vk: ash::vk::DebugUtilsMessageSeverityFlagsEXT,
    message_types_vk: ash::vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data_vk: *const ash::vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data_vk: *mut std::ffi::c_void,
) -> ash::vk::Bool32 {
    // Unwinding across the FFI boundary is undefined
    let _ = catch_unwind(AssertUnwindSafe(move || {
        let data = &*callback_data_vk;
        let name = data
            .p_message_id_name
            .as_ref()
            .map_or("unknown", |p| {
                CStr::from_ptr(p).to_str().unwrap_or("unknown")
            });
        let message = data.p_message.as_ref().map_or("(no message)", |p| {
            CStr::from_ptr(p).to_str().unwrap_or("(no message)")
        });
        let ty: DebugUtilsMessageType = message_types_vk.into();
        let msg_type = if ty.intersects(DebugUtilsMessageType::GENERAL) {
            "general"
        } else if ty.intersects(DebugUtilsMessageType::VALIDATION) {
            "validation"
        } else {
            "performance"
        };
        let severity: DebugUtilsMessageSeverity = message_severity_vk.into();
        if severity.intersects(DebugUtilsMessageSeverity::ERROR) {
            error!("{name} {msg_type}: {message}");
        } else if severity.intersects(DebugUtilsMessageSeverity::WARNING) {
            warn!("{name} {msg_type}: {message}");
        } else if severity.intersects(DebugUtilsMessageSeverity::INFO) {
            info!("{name} {msg_type}: {message}");
        } else {
            debug!("{name} {msg_type}: {message}");
        }
    }));

    ash::vk::FALSE
}
