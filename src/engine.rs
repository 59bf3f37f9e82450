// =============================================================================
// ENGINE - window + Vulkan setup, owned in one place
// =============================================================================
//
// SETUP FLOW (runs once, on the first `resumed` event):
// 1. Window
// 2. Vulkan context (instance, debug messenger)
// 3. Surface
// 4. GPU pick + queue families
// 5. Logical device
// 6. Swapchain + images
//
// TEARDOWN is the reverse: swapchain, device, surface, debug messenger,
// instance, window. Field order below encodes it.
//
// =============================================================================

use anyhow::Result;
use ash::vk;
use raw_window_handle::HasDisplayHandle;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::backend::{self, Device, SetupError, SetupResult, Surface, Swapchain, VulkanContext};
use crate::config::Config;

/// What the engine is asked to open
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    pub enable_validation: bool,
}

/// Every Vulkan object the engine owns.
///
/// IMPORTANT: Field order matters for Drop! Fields are destroyed top to
/// bottom, which is the reverse of creation.
struct VulkanState {
    swapchain: Swapchain,
    device: Device,
    surface: Surface,
    context: VulkanContext,
}

impl VulkanState {
    fn new(settings: &EngineSettings, window: &Window) -> SetupResult<Self> {
        let display = window
            .display_handle()
            .map_err(|e| SetupError::WindowHandle(e.to_string()))?
            .as_raw();

        let context = VulkanContext::new(&settings.title, display, settings.enable_validation)?;
        let surface = Surface::new(&context, window)?;

        let choice = backend::device::pick_physical_device(&context, surface.handle)?;
        let device = Device::new(&context, choice.physical_device, choice.families)?;

        let size = window.inner_size();
        let framebuffer = vk::Extent2D {
            width: size.width,
            height: size.height,
        };
        let swapchain = Swapchain::new(&context, &device, surface.handle, framebuffer)?;

        Ok(Self {
            swapchain,
            device,
            surface,
            context,
        })
    }
}

pub struct Engine {
    settings: EngineSettings,
    vulkan: Option<VulkanState>,
    window: Option<Window>,
    /// First setup error, returned from `run`
    failure: Option<SetupError>,
}

impl Engine {
    pub fn new(title: &str, width: u32, height: u32) -> Self {
        Self::with_settings(EngineSettings {
            title: title.to_string(),
            width,
            height,
            resizable: false,
            enable_validation: cfg!(debug_assertions),
        })
    }

    pub fn from_config(config: &Config) -> Self {
        let mut engine = Self::new(&config.window.title, config.window.width, config.window.height);
        engine.settings.resizable = config.window.resizable;
        engine.settings.enable_validation = config.validation_enabled();
        engine
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        Self {
            settings,
            vulkan: None,
            window: None,
            failure: None,
        }
    }

    /// Block until the window is closed, polling events every iteration.
    /// Returns the setup error if the engine never became ready.
    pub fn run(&mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.run_app(self)?;

        match self.failure.take() {
            Some(e) => Err(anyhow::Error::new(e).context("Engine setup failed")),
            None => {
                if !self.is_ready() {
                    log::warn!("Event loop exited before the engine was set up");
                }
                Ok(())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.vulkan.is_some()
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> SetupResult<()> {
        log::info!(
            "Creating window: {}x{} ({})",
            self.settings.width,
            self.settings.height,
            self.settings.title
        );

        let attributes = Window::default_attributes()
            .with_title(self.settings.title.clone())
            .with_inner_size(LogicalSize::new(self.settings.width, self.settings.height))
            .with_resizable(self.settings.resizable);
        let window = event_loop.create_window(attributes).map_err(|e| {
            log::error!("winit - {}", e);
            SetupError::Window(e.to_string())
        })?;

        // Stored before Vulkan setup so a partial setup never outlives it
        let window = self.window.insert(window);
        let vulkan = VulkanState::new(&self.settings, window)?;

        log::info!(
            "Engine ready: surface {:?}, {} swapchain images ({}x{}, {:?}), queues graphics={:?} present={:?}, validation output {}",
            vulkan.surface.handle,
            vulkan.swapchain.images.len(),
            vulkan.swapchain.extent().width,
            vulkan.swapchain.extent().height,
            vulkan.swapchain.format(),
            vulkan.device.graphics_queue,
            vulkan.device.present_queue,
            if vulkan.context.has_debug_messenger() { "on" } else { "off" }
        );

        self.vulkan = Some(vulkan);
        Ok(())
    }
}

impl ApplicationHandler for Engine {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        event_loop.set_control_flow(ControlFlow::Poll);

        if let Err(e) = self.init(event_loop) {
            log::error!("Setup failed: {}", e);
            self.failure = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let WindowEvent::CloseRequested = event {
            log::info!("Close requested, shutting down");
            event_loop.exit();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Vulkan objects must go before the window they present to
        self.vulkan = None;
        self.window = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_from_config_keeps_every_setting() {
        let mut config = Config::default();
        config.window.title = "Configured".to_string();
        config.window.width = 1024;
        config.window.height = 768;
        config.window.resizable = true;
        config.debug.validation_layers = false;

        let engine = Engine::from_config(&config);
        assert_eq!(engine.settings.title, "Configured");
        assert_eq!(engine.settings.width, 1024);
        assert_eq!(engine.settings.height, 768);
        assert!(engine.settings.resizable);
        assert!(!engine.settings.enable_validation);
        assert!(!engine.is_ready());
    }

    #[test]
    fn engine_is_not_ready_before_running() {
        let engine = Engine::new("Scaffold", 800, 600);
        assert!(!engine.is_ready());
        assert_eq!(engine.settings.title, "Scaffold");
    }
}
