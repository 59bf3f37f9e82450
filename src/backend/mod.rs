// Backend module - Vulkan setup layer
//
// Design: Thin wrapper around ash, every driver call goes through an
// explicit VulkanContext
// Flow: context -> surface -> GPU pick -> device -> swapchain

pub mod context;
pub mod device;
pub mod error;
pub mod queue_family;
pub mod surface;
pub mod swapchain;

pub use context::VulkanContext;
pub use device::Device;
pub use error::{SetupError, SetupResult};
pub use surface::Surface;
pub use swapchain::Swapchain;
