// Vulkan context - explicit dispatch state
//
// Responsibilities:
// - Load the Vulkan library
// - Instance creation with platform surface extensions
// - Optional validation layers + debug messenger
// - Surface extension loader shared by every surface query
//
// Built once at startup and passed by reference to every driver call.

use std::ffi::{c_char, CStr, CString};

use ash::{vk, Entry};
use raw_window_handle::RawDisplayHandle;

use super::error::{SetupError, SetupResult};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Loaded entry points, instance and instance-level extension loaders
pub struct VulkanContext {
    pub surface_loader: ash::khr::surface::Instance,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    pub instance: ash::Instance,
    pub entry: Entry,
}

impl VulkanContext {
    /// Create the Vulkan context
    ///
    /// # Arguments
    /// * `app_name` - Application name reported to the driver
    /// * `display` - Display the window lives on, selects surface extensions
    /// * `enable_validation` - Enable Vulkan validation layers (debug only)
    pub fn new(
        app_name: &str,
        display: RawDisplayHandle,
        enable_validation: bool,
    ) -> SetupResult<Self> {
        log::info!("Creating Vulkan instance: {}", app_name);

        let entry = unsafe { Entry::load() }?;

        let required = ash_window::enumerate_required_extensions(display).map_err(|result| {
            SetupError::Enumeration {
                what: "required surface extensions",
                result,
            }
        })?;

        let instance = Self::create_instance(&entry, app_name, required, enable_validation)?;

        // The messenger is optional: losing it only costs diagnostics.
        let debug_utils = if enable_validation {
            match Self::setup_debug_messenger(&entry, &instance) {
                Ok(debug_utils) => Some(debug_utils),
                Err(e) => {
                    log::warn!("{}. Continuing without validation output.", e);
                    None
                }
            }
        } else {
            None
        };

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        Ok(Self {
            surface_loader,
            debug_utils,
            instance,
            entry,
        })
    }

    fn create_instance(
        entry: &Entry,
        app_name: &str,
        required_extensions: &[*const c_char],
        enable_validation: bool,
    ) -> SetupResult<ash::Instance> {
        // Interior NULs cannot be passed to the driver, drop them.
        let app_name_cstr = CString::new(app_name.replace('\0', "")).unwrap_or_default();
        let engine_name = c"vk-scaffold";

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        let extensions = instance_extensions(required_extensions, enable_validation);
        for &name in &extensions {
            log::debug!("Instance extension: {:?}", unsafe { CStr::from_ptr(name) });
        }

        let layer_names = if enable_validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names);

        unsafe { entry.create_instance(&create_info, None) }.map_err(|e| {
            log::error!("Unable to create Vulkan instance - Error {}", e);
            SetupError::InstanceCreation(e)
        })
    }

    fn setup_debug_messenger(
        entry: &Entry,
        instance: &ash::Instance,
    ) -> SetupResult<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
            .map_err(SetupError::DebugMessenger)?;

        Ok((debug_utils, messenger))
    }

    pub fn has_debug_messenger(&self) -> bool {
        self.debug_utils.is_some()
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan instance...");

        unsafe {
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Platform surface extensions, plus debug utils when validating
fn instance_extensions(required: &[*const c_char], enable_validation: bool) -> Vec<*const c_char> {
    let mut extensions = required.to_vec();
    if enable_validation {
        extensions.push(ash::ext::debug_utils::NAME.as_ptr());
    }
    extensions
}

fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
    match severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::Level::Error,
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::Level::Warn,
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => log::Level::Info,
        _ => log::Level::Debug,
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message);

    log::log!(
        target: "vulkan",
        severity_level(message_severity),
        "[{:?}] {}",
        message_type,
        message.to_string_lossy()
    );

    vk::FALSE
}
