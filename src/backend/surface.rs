// Surface - window connection and what it supports
//
// Owns the VkSurfaceKHR for the window, probes a physical device for the
// capabilities/formats/present modes it offers on that surface, and picks
// the swapchain settings from that probe.

use ash::prelude::VkResult;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;

use super::error::{SetupError, SetupResult};
use super::VulkanContext;

/// Sentinel `current_extent.width`: the window decides the size
const EXTENT_FROM_WINDOW: u32 = u32::MAX;

const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Window surface with automatic cleanup
pub struct Surface {
    pub handle: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl Surface {
    pub fn new(ctx: &VulkanContext, window: &Window) -> SetupResult<Self> {
        let display_handle = window
            .display_handle()
            .map_err(|e| SetupError::WindowHandle(e.to_string()))?
            .as_raw();
        let window_handle = window
            .window_handle()
            .map_err(|e| SetupError::WindowHandle(e.to_string()))?
            .as_raw();

        let handle = unsafe {
            ash_window::create_surface(&ctx.entry, &ctx.instance, display_handle, window_handle, None)
        }
        .map_err(|e| {
            log::error!("Unable to create window surface - Error {}", e);
            SetupError::SurfaceCreation(e)
        })?;

        Ok(Self {
            handle,
            loader: ctx.surface_loader.clone(),
        })
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        log::info!("Destroying surface...");
        unsafe { self.loader.destroy_surface(self.handle, None) };
    }
}

/// Snapshot of what one physical device supports on one surface
#[derive(Debug, Clone, Default)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// Settings chosen for one swapchain creation
#[derive(Debug, Clone, Copy)]
pub struct SwapchainConfig {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
}

impl SurfaceSupport {
    /// Query the three surface properties. A failed query is logged and
    /// leaves its field empty; the others are still queried.
    pub fn probe(
        ctx: &VulkanContext,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Self {
        let loader = &ctx.surface_loader;
        unsafe {
            Self::from_queries(
                loader.get_physical_device_surface_capabilities(physical_device, surface),
                loader.get_physical_device_surface_formats(physical_device, surface),
                loader.get_physical_device_surface_present_modes(physical_device, surface),
            )
        }
    }

    pub fn from_queries(
        capabilities: VkResult<vk::SurfaceCapabilitiesKHR>,
        formats: VkResult<Vec<vk::SurfaceFormatKHR>>,
        present_modes: VkResult<Vec<vk::PresentModeKHR>>,
    ) -> Self {
        let capabilities = capabilities.unwrap_or_else(|e| {
            log::error!("Unable to retrieve surface capabilities - Error {}", e);
            vk::SurfaceCapabilitiesKHR::default()
        });
        let formats = formats.unwrap_or_else(|e| {
            log::error!("Unable to retrieve surface formats - Error {}", e);
            Vec::new()
        });
        let present_modes = present_modes.unwrap_or_else(|e| {
            log::error!("Unable to retrieve surface present modes - Error {}", e);
            Vec::new()
        });

        Self {
            capabilities,
            formats,
            present_modes,
        }
    }

    /// At least one format and one present mode to build a swapchain from
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }

    /// 8-bit BGRA sRGB if offered anywhere, else the first format.
    /// `None` only when the format query failed.
    pub fn best_format(&self) -> Option<vk::SurfaceFormatKHR> {
        if let Some(&format) = self.formats.iter().find(|f| {
            f.format == PREFERRED_FORMAT.format && f.color_space == PREFERRED_FORMAT.color_space
        }) {
            return Some(format);
        }

        let fallback = *self.formats.first()?;
        log::warn!(
            "Unable to find sRGB surface format and color space. Falling back to {:?} format and {:?} color space",
            fallback.format,
            fallback.color_space
        );
        Some(fallback)
    }

    /// MAILBOX if offered, else FIFO which every implementation supports
    pub fn best_present_mode(&self) -> vk::PresentModeKHR {
        if self.present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
            return vk::PresentModeKHR::MAILBOX;
        }

        log::warn!(
            "Unable to find {:?} present mode. Falling back to {:?}",
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::FIFO
        );
        vk::PresentModeKHR::FIFO
    }

    /// Image size. `framebuffer` is only used when the surface leaves the
    /// choice to us.
    pub fn extent(&self, framebuffer: vk::Extent2D) -> vk::Extent2D {
        let caps = &self.capabilities;
        if caps.current_extent.width != EXTENT_FROM_WINDOW {
            return caps.current_extent;
        }

        vk::Extent2D {
            width: framebuffer
                .width
                .max(caps.min_image_extent.width)
                .min(caps.max_image_extent.width),
            height: framebuffer
                .height
                .max(caps.min_image_extent.height)
                .min(caps.max_image_extent.height),
        }
    }

    /// One image above the minimum, capped by the maximum (0 = no maximum)
    pub fn image_count(&self) -> u32 {
        let caps = &self.capabilities;
        let desired = caps.min_image_count.saturating_add(1);
        if caps.max_image_count > 0 {
            desired.min(caps.max_image_count)
        } else {
            desired
        }
    }

    pub fn select(&self, framebuffer: vk::Extent2D) -> SetupResult<SwapchainConfig> {
        let format = self.best_format().ok_or(SetupError::NoSurfaceFormat)?;

        Ok(SwapchainConfig {
            format,
            present_mode: self.best_present_mode(),
            extent: self.extent(framebuffer),
            image_count: self.image_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn with_formats(formats: Vec<vk::SurfaceFormatKHR>) -> SurfaceSupport {
        SurfaceSupport {
            formats,
            ..Default::default()
        }
    }

    fn with_modes(present_modes: Vec<vk::PresentModeKHR>) -> SurfaceSupport {
        SurfaceSupport {
            present_modes,
            ..Default::default()
        }
    }

    fn with_image_counts(min_image_count: u32, max_image_count: u32) -> SurfaceSupport {
        SurfaceSupport {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count,
                max_image_count,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn with_extents(current: vk::Extent2D, min: vk::Extent2D, max: vk::Extent2D) -> SurfaceSupport {
        SurfaceSupport {
            capabilities: vk::SurfaceCapabilitiesKHR {
                current_extent: current,
                min_image_extent: min,
                max_image_extent: max,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    fn pair(format: Option<vk::SurfaceFormatKHR>) -> Option<(vk::Format, vk::ColorSpaceKHR)> {
        format.map(|f| (f.format, f.color_space))
    }

    const PREFERRED: (vk::Format, vk::ColorSpaceKHR) =
        (vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR);

    #[test]
    fn probe_keeps_successful_queries() {
        let support = SurfaceSupport::from_queries(
            Err(vk::Result::ERROR_SURFACE_LOST_KHR),
            Ok(vec![PREFERRED_FORMAT]),
            Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY),
        );

        assert_eq!(support.capabilities.min_image_count, 0);
        assert_eq!(support.capabilities.current_extent, extent(0, 0));
        assert_eq!(support.formats.len(), 1);
        assert_eq!(pair(support.formats.first().copied()), Some(PREFERRED));
        assert!(support.present_modes.is_empty());
        assert!(!support.is_adequate());
    }

    #[test]
    fn adequate_needs_formats_and_modes() {
        let support = SurfaceSupport::from_queries(
            Ok(vk::SurfaceCapabilitiesKHR::default()),
            Ok(vec![PREFERRED_FORMAT]),
            Ok(vec![vk::PresentModeKHR::FIFO]),
        );
        assert!(support.is_adequate());
        assert!(!with_formats(vec![PREFERRED_FORMAT]).is_adequate());
        assert!(!with_modes(vec![vk::PresentModeKHR::FIFO]).is_adequate());
    }

    #[test]
    fn preferred_format_wins_regardless_of_position() {
        let support = with_formats(vec![
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            PREFERRED_FORMAT,
        ]);
        assert_eq!(pair(support.best_format()), Some(PREFERRED));
    }

    #[test]
    fn format_falls_back_to_first_entry() {
        let first = format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR);
        let support = with_formats(vec![
            first,
            // Right format, wrong color space
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
        ]);
        assert_eq!(
            pair(support.best_format()),
            Some((vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR))
        );
    }

    #[test]
    fn no_formats_selects_nothing() {
        let support = SurfaceSupport::default();
        assert!(support.best_format().is_none());
        assert!(matches!(
            support.select(extent(800, 600)),
            Err(SetupError::NoSurfaceFormat)
        ));
    }

    #[test]
    fn mailbox_preferred_when_present() {
        let support = with_modes(vec![
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
        ]);
        assert_eq!(support.best_present_mode(), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn present_mode_falls_back_to_fifo() {
        let support = with_modes(vec![
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::FIFO_RELAXED,
            vk::PresentModeKHR::FIFO,
        ]);
        assert_eq!(support.best_present_mode(), vk::PresentModeKHR::FIFO);

        // Even if the query failed
        assert_eq!(
            SurfaceSupport::default().best_present_mode(),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn fixed_current_extent_ignores_window() {
        let support = with_extents(extent(1024, 768), extent(1, 1), extent(4096, 4096));
        assert_eq!(support.extent(extent(800, 600)), extent(1024, 768));
    }

    #[test]
    fn sentinel_extent_clamps_framebuffer() {
        let support = with_extents(
            extent(u32::MAX, u32::MAX),
            extent(200, 100),
            extent(1920, 1080),
        );

        assert_eq!(support.extent(extent(800, 600)), extent(800, 600));
        assert_eq!(support.extent(extent(50, 5000)), extent(200, 1080));
        assert_eq!(support.extent(extent(3000, 0)), extent(1920, 100));
    }

    #[test]
    fn unbounded_max_adds_one_image() {
        // Scenario A
        assert_eq!(with_image_counts(2, 0).image_count(), 3);
        assert_eq!(with_image_counts(1, 0).image_count(), 2);
    }

    #[test]
    fn bounded_max_caps_image_count() {
        // Scenario B
        assert_eq!(with_image_counts(2, 2).image_count(), 2);
        assert_eq!(with_image_counts(2, 8).image_count(), 3);
        assert_eq!(with_image_counts(3, 3).image_count(), 3);
    }

    #[test]
    fn image_count_never_drops_below_minimum() {
        assert_eq!(with_image_counts(u32::MAX, 0).image_count(), u32::MAX);
        assert_eq!(with_image_counts(u32::MAX, u32::MAX).image_count(), u32::MAX);
    }

    #[test]
    fn select_combines_every_choice() {
        let support = SurfaceSupport {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 0,
                current_extent: extent(u32::MAX, u32::MAX),
                min_image_extent: extent(1, 1),
                max_image_extent: extent(2048, 2048),
                ..Default::default()
            },
            formats: vec![PREFERRED_FORMAT],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };

        let config = support.select(extent(1280, 720)).unwrap();
        assert_eq!(pair(Some(config.format)), Some(PREFERRED));
        assert_eq!(config.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(config.extent, extent(1280, 720));
        assert_eq!(config.image_count, 3);
    }
}
