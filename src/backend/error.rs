// Setup errors
//
// Every required resource (instance, surface, device, swapchain) fails fast
// with one of these. Optional choices never reach this type, they log and
// fall back instead.

use ash::vk;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Failed to load Vulkan library: {0}")]
    Loader(#[from] ash::LoadingError),

    #[error("Failed to create window: {0}")]
    Window(String),

    #[error("Window handle unavailable: {0}")]
    WindowHandle(String),

    #[error("Failed to create Vulkan instance: {0}")]
    InstanceCreation(vk::Result),

    #[error("Failed to create debug messenger: {0}")]
    DebugMessenger(vk::Result),

    #[error("Failed to create window surface: {0}")]
    SurfaceCreation(vk::Result),

    #[error("Failed to enumerate {what}: {result}")]
    Enumeration { what: &'static str, result: vk::Result },

    #[error("No suitable GPU found")]
    NoSuitableDevice,

    #[error(
        "Incomplete queue families (graphics: {}, present: {})",
        describe(.graphics),
        describe(.present)
    )]
    IncompleteQueueFamilies {
        graphics: Option<u32>,
        present: Option<u32>,
    },

    #[error("Failed to create logical device: {0}")]
    DeviceCreation(vk::Result),

    #[error("Surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("Failed to create swapchain: {0}")]
    SwapchainCreation(vk::Result),
}

fn describe(index: &Option<u32>) -> String {
    match index {
        Some(index) => index.to_string(),
        None => "unassigned".to_string(),
    }
}

pub type SetupResult<T> = Result<T, SetupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_families_names_missing_roles() {
        let err = SetupError::IncompleteQueueFamilies {
            graphics: Some(0),
            present: None,
        };
        assert_eq!(
            err.to_string(),
            "Incomplete queue families (graphics: 0, present: unassigned)"
        );
    }

    #[test]
    fn vulkan_results_are_displayed() {
        let err = SetupError::DeviceCreation(vk::Result::ERROR_INITIALIZATION_FAILED);
        assert!(err.to_string().starts_with("Failed to create logical device"));
    }
}
