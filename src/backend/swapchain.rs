// Swapchain - Window presentation
//
// Builds the chain of images presented to the window from the probed
// surface support and the device's queue families.

use ash::vk;

use super::device::Device;
use super::error::{SetupError, SetupResult};
use super::surface::{SurfaceSupport, SwapchainConfig};
use super::VulkanContext;

pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    pub swapchain_loader: ash::khr::swapchain::Device,
    /// Owned by the swapchain, never destroyed individually
    pub images: Vec<vk::Image>,
    pub config: SwapchainConfig,
}

impl Swapchain {
    /// Create the swapchain for `surface`
    ///
    /// # Arguments
    /// * `framebuffer` - Window size in pixels, used only when the surface
    ///   does not dictate the extent
    pub fn new(
        ctx: &VulkanContext,
        device: &Device,
        surface: vk::SurfaceKHR,
        framebuffer: vk::Extent2D,
    ) -> SetupResult<Self> {
        let support = SurfaceSupport::probe(ctx, device.physical_device, surface);
        let config = support.select(framebuffer)?;

        log::info!(
            "Creating swapchain: {}x{}, {} images, {:?}, {:?}",
            config.extent.width,
            config.extent.height,
            config.image_count,
            config.format.format,
            config.present_mode
        );

        let families = device.families().unique();
        let create_info = swapchain_create_info(surface, &config, &families);

        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &device.device);

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| {
                log::error!("Unable to create swapchain - Error {}", e);
                SetupError::SwapchainCreation(e)
            })?;

        let images = unsafe { swapchain_loader.get_swapchain_images(swapchain) }
            .unwrap_or_else(|e| {
                log::warn!("Unable to retrieve swapchain images - Error {}", e);
                Vec::new()
            });

        log::info!("Created swapchain with {} images", images.len());

        Ok(Self {
            swapchain,
            swapchain_loader,
            images,
            config,
        })
    }

    pub fn format(&self) -> vk::Format {
        self.config.format.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.config.extent
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        log::info!("Destroying swapchain...");
        unsafe { self.swapchain_loader.destroy_swapchain(self.swapchain, None) };
    }
}

/// EXCLUSIVE when one family touches the images, CONCURRENT otherwise
pub fn image_sharing_mode(families: &[u32]) -> vk::SharingMode {
    if families.len() == 1 {
        vk::SharingMode::EXCLUSIVE
    } else {
        vk::SharingMode::CONCURRENT
    }
}

/// `families` is the deduplicated list from the device's queue families
pub fn swapchain_create_info<'a>(
    surface: vk::SurfaceKHR,
    config: &SwapchainConfig,
    families: &'a [u32],
) -> vk::SwapchainCreateInfoKHR<'a> {
    let sharing_mode = image_sharing_mode(families);

    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(config.image_count)
        .image_format(config.format.format)
        .image_color_space(config.format.color_space)
        .image_extent(config.extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(sharing_mode)
        .pre_transform(vk::SurfaceTransformFlagsKHR::IDENTITY)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(config.present_mode)
        .clipped(true);

    if sharing_mode == vk::SharingMode::CONCURRENT {
        create_info.queue_family_indices(families)
    } else {
        create_info
    }
}
